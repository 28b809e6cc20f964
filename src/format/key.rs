//! Canonical variant identity
//!
//! A [`FormatKey`] is a base format name plus the retina, blurred and
//! watermarked modifiers. It is a value: built once, never mutated.
//!
//! # Adjusted format
//!
//! ```text
//! base + (blurred ? blurred.format : watermarked ? watermarked.format : "") + (retina ? retina.format : "")
//! ```
//!
//! Decoding strips suffixes in the reverse order: retina, then blurred,
//! then watermarked, each at most once.

use serde::{Deserialize, Serialize};

use crate::config::Suffixes;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatKey {
    base: String,
    retina: bool,
    blurred: bool,
    watermarked: bool,
}

impl FormatKey {
    /// A plain key for `base` with every modifier off
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            retina: false,
            blurred: false,
            watermarked: false,
        }
    }

    pub fn with_retina(mut self, retina: bool) -> Self {
        self.retina = retina;
        self
    }

    pub fn with_blurred(mut self, blurred: bool) -> Self {
        self.blurred = blurred;
        self
    }

    pub fn with_watermarked(mut self, watermarked: bool) -> Self {
        self.watermarked = watermarked;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_retina(&self) -> bool {
        self.retina
    }

    pub fn is_blurred(&self) -> bool {
        self.blurred
    }

    pub fn is_watermarked(&self) -> bool {
        self.watermarked
    }

    /// Public, URL-safe format string; also an input of the signature
    pub fn adjusted(&self, suffixes: &Suffixes) -> String {
        let mut adjusted = self.base.clone();
        adjusted.push_str(self.modifier_suffix(&suffixes.blurred.format, &suffixes.watermarked.format));
        if self.retina {
            adjusted.push_str(&suffixes.retina.format);
        }
        adjusted
    }

    /// Suffix appended to the base name to form the cache folder
    pub fn file_suffix(&self, suffixes: &Suffixes) -> String {
        let mut suffix = self
            .modifier_suffix(&suffixes.blurred.file, &suffixes.watermarked.file)
            .to_string();
        if self.retina {
            suffix.push_str(&suffixes.retina.file);
        }
        suffix
    }

    // Blurred wins over watermarked when both are set
    fn modifier_suffix<'a>(&self, blurred: &'a str, watermarked: &'a str) -> &'a str {
        if self.blurred {
            blurred
        } else if self.watermarked {
            watermarked
        } else {
            ""
        }
    }

    /// Best-effort inverse of [`FormatKey::adjusted`]. Never fails: an
    /// unmatched string decodes to a plain key with that string as base.
    /// Whether the base exists is for the caller to check.
    pub fn parse_adjusted(adjusted: &str, suffixes: &Suffixes) -> Self {
        let mut base = adjusted;
        let retina = strip_suffix(&mut base, &suffixes.retina.format);
        let blurred = strip_suffix(&mut base, &suffixes.blurred.format);
        let watermarked = strip_suffix(&mut base, &suffixes.watermarked.format);

        Self {
            base: base.to_string(),
            retina,
            blurred,
            watermarked,
        }
    }
}

// An empty suffix never matches
fn strip_suffix(value: &mut &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    match value.strip_suffix(suffix) {
        Some(stripped) => {
            *value = stripped;
            true
        }
        None => false,
    }
}
