use serde::{Deserialize, Serialize};

use crate::config::{FormatConfig, Gravity};
use crate::resource::{Clipping, FocalPoint};

/// Modifier-dependent parameters handed to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationArguments {
    /// Base format name
    pub format: String,
    pub retina: bool,
    /// Blur strength, `None` for no blur
    pub blur: Option<u32>,
    /// Overlay image, `None` for no overlay
    pub overlay: Option<String>,
    pub overlay_gravity: Option<Gravity>,
    pub overlay_scale: Option<u32>,
}

impl GenerationArguments {
    /// Arguments of an unmodified variant
    pub fn plain(format: impl Into<String>, retina: bool) -> Self {
        Self {
            format: format.into(),
            retina,
            blur: None,
            overlay: None,
            overlay_gravity: None,
            overlay_scale: None,
        }
    }
}

/// Everything the generator needs to render one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Configured policy and dimensions of the base format
    pub config: FormatConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clipping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal: Option<FocalPoint>,
    pub arguments: GenerationArguments,
}
