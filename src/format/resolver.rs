//! Format policy derived from configuration
//!
//! The default format and the blur/watermark capable sets are computed once
//! in [`FormatResolver::new`]; afterwards the resolver is read-only and can
//! be shared between concurrent requests.

use std::collections::HashSet;
use std::sync::Arc;

use super::key::FormatKey;
use super::settings::{FormatSettings, GenerationArguments};
use crate::config::{DeliveryConfig, FormatConfig, OverlayConfig, Suffixes};
use crate::constants::FALLBACK_FORMAT_NAME;
use crate::error::DeliveryError;
use crate::resource::Resource;

#[derive(Debug, Clone)]
pub struct FormatResolver {
    config: Arc<DeliveryConfig>,
    default_format: String,
    blurred_formats: HashSet<String>,
    watermarked_formats: HashSet<String>,
}

impl FormatResolver {
    pub fn new(config: Arc<DeliveryConfig>) -> Self {
        let default_format = config
            .formats
            .iter()
            .find(|(_, format)| format.default)
            .map(|(name, _)| name.to_string())
            .unwrap_or_else(|| FALLBACK_FORMAT_NAME.to_string());

        let blurred_formats = config
            .formats
            .iter()
            .filter(|(_, format)| format.blurred)
            .map(|(name, _)| name.to_string())
            .collect();

        let watermarked_formats = config
            .formats
            .iter()
            .filter(|(_, format)| format.watermarked)
            .map(|(name, _)| name.to_string())
            .collect();

        Self {
            config,
            default_format,
            blurred_formats,
            watermarked_formats,
        }
    }

    /// First format flagged default, or `thumb`
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    pub fn blurred_formats(&self) -> &HashSet<String> {
        &self.blurred_formats
    }

    pub fn watermarked_formats(&self) -> &HashSet<String> {
        &self.watermarked_formats
    }

    pub fn suffixes(&self) -> &Suffixes {
        &self.config.suffixes
    }

    pub fn format_config(&self, base: &str) -> Result<&FormatConfig, DeliveryError> {
        self.config
            .formats
            .get(base)
            .ok_or_else(|| DeliveryError::UnknownFormat(base.to_string()))
    }

    pub fn adjusted(&self, key: &FormatKey) -> String {
        key.adjusted(&self.config.suffixes)
    }

    pub fn parse_adjusted(&self, adjusted: &str) -> FormatKey {
        FormatKey::parse_adjusted(adjusted, &self.config.suffixes)
    }

    /// An explicit override wins; otherwise blur-capable formats ask the
    /// resource's policy and all others stay unblurred.
    pub fn resolve_blurred<R: Resource>(
        &self,
        base: &str,
        requested: Option<bool>,
        resource: &R,
        actor: Option<&R::Actor>,
    ) -> bool {
        match requested {
            Some(blurred) => blurred,
            None if self.blurred_formats.contains(base) => resource.use_blurred_format(actor),
            None => false,
        }
    }

    pub fn resolve_watermarked<R: Resource>(
        &self,
        base: &str,
        requested: Option<bool>,
        resource: &R,
        actor: Option<&R::Actor>,
    ) -> bool {
        match requested {
            Some(watermarked) => watermarked,
            None if self.watermarked_formats.contains(base) => {
                resource.use_watermarked_format(actor)
            }
            None => false,
        }
    }

    /// Build the fully resolved key for a resource
    pub fn key_for<R: Resource>(
        &self,
        format: &str,
        resource: &R,
        actor: Option<&R::Actor>,
        retina: bool,
        blurred: Option<bool>,
        watermarked: Option<bool>,
    ) -> FormatKey {
        FormatKey::new(format)
            .with_retina(retina)
            .with_blurred(self.resolve_blurred(format, blurred, resource, actor))
            .with_watermarked(self.resolve_watermarked(format, watermarked, resource, actor))
    }

    /// Blur/overlay parameters for the key's modifier; blurred wins when
    /// both modifiers are set.
    pub fn generation_arguments(&self, key: &FormatKey) -> GenerationArguments {
        let overlay: Option<&OverlayConfig> = if key.is_blurred() {
            Some(&self.config.overlays.blurred)
        } else if key.is_watermarked() {
            Some(&self.config.overlays.watermarked)
        } else {
            None
        };

        let mut arguments = GenerationArguments::plain(key.base(), key.is_retina());
        if let Some(overlay) = overlay {
            arguments.blur = overlay.blur;
            arguments.overlay = overlay.file.clone();
            arguments.overlay_gravity = overlay.gravity;
            arguments.overlay_scale = overlay.scale;
        }
        arguments
    }

    /// Generator settings without resource-specific cropping
    pub fn format_settings(&self, key: &FormatKey) -> Result<FormatSettings, DeliveryError> {
        Ok(FormatSettings {
            config: self.format_config(key.base())?.clone(),
            clip: None,
            focal: None,
            arguments: self.generation_arguments(key),
        })
    }

    /// Generator settings including the resource's clipping for this format,
    /// or its focal point when it has no clipping
    pub fn format_settings_for<R: Resource>(
        &self,
        key: &FormatKey,
        resource: &R,
    ) -> Result<FormatSettings, DeliveryError> {
        let mut settings = self.format_settings(key)?;
        match resource.clipping(key.base()) {
            Some(clip) => settings.clip = Some(clip),
            None => settings.focal = resource.focal_point(),
        }
        Ok(settings)
    }
}
