//! Capabilities the host application's assets expose to the delivery layer
//!
//! The crate never stores assets itself; it reads ids, file paths and
//! policy decisions through [`Resource`].

use serde::{Deserialize, Serialize};

/// Crop rectangle a resource defines for a specific format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clipping {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Point of interest used when cropping without an explicit clipping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
}

/// An asset that can be delivered in derived formats
///
/// `Actor` is the opaque policy subject (typically the viewing user) handed
/// back to the blur/watermark hooks untouched.
pub trait Resource {
    type Actor: ?Sized;

    /// Identifier embedded in URLs and signatures
    fn id(&self) -> String;

    /// Path of the original, relative to the originals folder
    fn file(&self) -> &str;

    /// Clipping defined for `format`, if any
    fn clipping(&self, _format: &str) -> Option<Clipping> {
        None
    }

    fn focal_point(&self) -> Option<FocalPoint> {
        None
    }

    /// Whether `actor` should get the blurred rendering of a blur-capable format
    fn use_blurred_format(&self, actor: Option<&Self::Actor>) -> bool;

    /// Whether `actor` should get the watermarked rendering of a watermark-capable format
    fn use_watermarked_format(&self, actor: Option<&Self::Actor>) -> bool;
}

/// A resource described entirely by plain values
///
/// Used by the command line, where no host application is around to make
/// policy decisions.
#[derive(Debug, Clone, Default)]
pub struct StaticResource {
    pub id: String,
    pub file: String,
    pub blurred: bool,
    pub watermarked: bool,
    pub focal_point: Option<FocalPoint>,
}

impl StaticResource {
    pub fn new(id: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            ..Default::default()
        }
    }
}

impl Resource for StaticResource {
    type Actor = ();

    fn id(&self) -> String {
        self.id.clone()
    }

    fn file(&self) -> &str {
        &self.file
    }

    fn focal_point(&self) -> Option<FocalPoint> {
        self.focal_point
    }

    fn use_blurred_format(&self, _actor: Option<&()>) -> bool {
        self.blurred
    }

    fn use_watermarked_format(&self, _actor: Option<&()>) -> bool {
        self.watermarked
    }
}
