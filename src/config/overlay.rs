use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anchor of an overlay image on the generated variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gravity {
    #[default]
    Center,
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Gravity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::Center => "Center",
            Gravity::North => "North",
            Gravity::South => "South",
            Gravity::East => "East",
            Gravity::West => "West",
            Gravity::NorthEast => "NorthEast",
            Gravity::NorthWest => "NorthWest",
            Gravity::SouthEast => "SouthEast",
            Gravity::SouthWest => "SouthWest",
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gravity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" | "c" => Ok(Gravity::Center),
            "north" | "n" => Ok(Gravity::North),
            "south" | "s" => Ok(Gravity::South),
            "east" | "e" => Ok(Gravity::East),
            "west" | "w" => Ok(Gravity::West),
            "northeast" | "ne" => Ok(Gravity::NorthEast),
            "northwest" | "nw" => Ok(Gravity::NorthWest),
            "southeast" | "se" => Ok(Gravity::SouthEast),
            "southwest" | "sw" => Ok(Gravity::SouthWest),
            _ => Err(format!("unknown gravity: {}", s)),
        }
    }
}

impl TryFrom<String> for Gravity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gravity> for String {
    fn from(value: Gravity) -> Self {
        value.as_str().to_string()
    }
}

/// Blur and overlay parameters applied to one kind of modified variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OverlayConfig {
    /// Blur strength; absent means no blur
    #[serde(default)]
    pub blur: Option<u32>,

    /// Overlay image composited on top of the variant
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub gravity: Option<Gravity>,

    /// Overlay size in percent of the variant
    #[serde(default)]
    pub scale: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Overlays {
    #[serde(default)]
    pub blurred: OverlayConfig,
    #[serde(default)]
    pub watermarked: OverlayConfig,
}
