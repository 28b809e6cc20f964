//! Variant formats
//!
//! - [`FormatKey`]: base format + retina/blurred/watermarked modifiers, and
//!   its adjusted-format encoding
//! - [`FormatResolver`]: default format, modifier policy and generator
//!   arguments derived from configuration

pub mod key;
pub mod resolver;
pub mod settings;

pub use key::FormatKey;
pub use resolver::FormatResolver;
pub use settings::{FormatSettings, GenerationArguments};
