use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BLURRED_FILE_SUFFIX, DEFAULT_BLURRED_FORMAT_SUFFIX, DEFAULT_RETINA_FILE_SUFFIX,
    DEFAULT_RETINA_FORMAT_SUFFIX, DEFAULT_WATERMARKED_FILE_SUFFIX,
    DEFAULT_WATERMARKED_FORMAT_SUFFIX,
};

/// File type a format's cached variants are written as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Jpg,
    Png,
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Policy for a single named format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FormatConfig {
    /// Used when a URL is built without an explicit format
    #[serde(default)]
    pub default: bool,

    /// Requires a valid signature and unexpired window to be served
    #[serde(default)]
    pub restricted: bool,

    /// Resources may ask for a blurred rendering of this format
    #[serde(default)]
    pub blurred: bool,

    /// Resources may ask for a watermarked rendering of this format
    #[serde(default)]
    pub watermarked: bool,

    /// Cache file type (default: jpg)
    #[serde(default, rename = "type")]
    pub file_type: FileType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

/// Pair of suffixes for one modifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuffixConfig {
    /// Appended to the public adjusted format string
    pub format: String,
    /// Appended to the cache folder name
    pub file: String,
}

impl SuffixConfig {
    fn new(format: &str, file: &str) -> Self {
        Self {
            format: format.to_string(),
            file: file.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suffixes {
    #[serde(default = "default_retina_suffix")]
    pub retina: SuffixConfig,
    #[serde(default = "default_blurred_suffix")]
    pub blurred: SuffixConfig,
    #[serde(default = "default_watermarked_suffix")]
    pub watermarked: SuffixConfig,
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            retina: default_retina_suffix(),
            blurred: default_blurred_suffix(),
            watermarked: default_watermarked_suffix(),
        }
    }
}

impl Suffixes {
    /// URL suffixes in decode order (retina, blurred, watermarked)
    pub fn format_suffixes(&self) -> [&str; 3] {
        [
            &self.retina.format,
            &self.blurred.format,
            &self.watermarked.format,
        ]
    }

    /// Cache folder suffixes in the same order
    pub fn file_suffixes(&self) -> [&str; 3] {
        [&self.retina.file, &self.blurred.file, &self.watermarked.file]
    }
}

fn default_retina_suffix() -> SuffixConfig {
    SuffixConfig::new(DEFAULT_RETINA_FORMAT_SUFFIX, DEFAULT_RETINA_FILE_SUFFIX)
}

fn default_blurred_suffix() -> SuffixConfig {
    SuffixConfig::new(DEFAULT_BLURRED_FORMAT_SUFFIX, DEFAULT_BLURRED_FILE_SUFFIX)
}

fn default_watermarked_suffix() -> SuffixConfig {
    SuffixConfig::new(
        DEFAULT_WATERMARKED_FORMAT_SUFFIX,
        DEFAULT_WATERMARKED_FILE_SUFFIX,
    )
}
