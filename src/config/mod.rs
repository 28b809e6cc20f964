// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::constants::{
    DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_MEMORY_LIMIT, DEFAULT_ROUTE, DEFAULT_VALID_FOR_SECS,
    FALLBACK_FORMAT_NAME,
};
use crate::router::RouteTemplate;

pub mod format;
pub mod ordered;
pub mod overlay;

pub use format::{FileType, FormatConfig, SuffixConfig, Suffixes};
pub use ordered::OrderedMap;
pub use overlay::{Gravity, OverlayConfig, Overlays};

/// Full delivery configuration, loaded once and treated as read-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub clients: OrderedMap<ClientConfig>,
    pub formats: OrderedMap<FormatConfig>,
    #[serde(default)]
    pub suffixes: Suffixes,
    #[serde(default)]
    pub overlays: Overlays,
    pub folders: Folders,
    pub fallbacks: Fallbacks,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_route() -> String {
    DEFAULT_ROUTE.to_string()
}

fn default_duration() -> u64 {
    DEFAULT_VALID_FOR_SECS
}

fn default_memory_limit() -> String {
    DEFAULT_MEMORY_LIMIT.to_string()
}

fn default_generation_timeout() -> u64 {
    DEFAULT_GENERATION_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Route template with `{format}`, `{id}` and `{file}` placeholders
    #[serde(default = "default_route")]
    pub route: String,

    /// Default validity window of signed URLs in seconds (default: 3600)
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Memory limit forwarded to the generator (default: 512M)
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    /// Upper bound for one generator run in seconds (default: 30)
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            route: default_route(),
            duration: default_duration(),
            memory_limit: default_memory_limit(),
            generation_timeout_secs: default_generation_timeout(),
        }
    }
}

/// A client allowed to mint and present signed URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub secret: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folders {
    /// Root of the original assets
    pub orig: String,
    /// Root of the generated variants
    pub cache: String,
}

/// Images served in place of the requested one on rejection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fallbacks {
    #[serde(rename = "403", alias = "forbidden")]
    pub forbidden: String,
    #[serde(rename = "404", alias = "not_found")]
    pub not_found: String,
    #[serde(rename = "412", alias = "invalid")]
    pub invalid: String,
}

impl Fallbacks {
    pub fn path_for(&self, status: u16) -> Option<&str> {
        match status {
            403 => Some(&self.forbidden),
            404 => Some(&self.not_found),
            412 => Some(&self.invalid),
            _ => None,
        }
    }
}

fn default_generator_command() -> String {
    "kagami-generate".to_string()
}

/// External variant generator invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: default_generator_command(),
            args: Vec::new(),
        }
    }
}

impl DeliveryConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if missing.is_none() {
                    missing = Some(var_name.to_string());
                }
                String::new()
            })
        });

        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.formats.is_empty() {
            return Err("At least one format must be configured".to_string());
        }

        let defaults: Vec<&str> = self
            .formats
            .iter()
            .filter(|(_, format)| format.default)
            .map(|(name, _)| name)
            .collect();
        if defaults.len() > 1 {
            return Err(format!(
                "Only one format may be flagged default, found: {}",
                defaults.join(", ")
            ));
        }
        // 412 fallbacks are rendered in the default format, so it must exist
        if defaults.is_empty() && !self.formats.contains_key(FALLBACK_FORMAT_NAME) {
            return Err(format!(
                "No format is flagged default and no format is named '{}'",
                FALLBACK_FORMAT_NAME
            ));
        }

        for name in self.formats.keys() {
            if name.is_empty() {
                return Err("Format name cannot be empty".to_string());
            }
        }

        validate_suffix_set("format", &self.suffixes.format_suffixes())?;
        validate_suffix_set("file", &self.suffixes.file_suffixes())?;

        // Names ending in a URL suffix decode ambiguously; flag, don't reject
        for name in self.formats.keys() {
            for suffix in self.suffixes.format_suffixes() {
                if name.ends_with(suffix) {
                    tracing::warn!(
                        format = name,
                        suffix = suffix,
                        "Format name ends with a configured URL suffix; adjusted format decoding is ambiguous"
                    );
                }
            }
        }

        let default_clients = self
            .clients
            .iter()
            .filter(|(_, client)| client.default)
            .count();
        if default_clients > 1 {
            tracing::warn!(
                count = default_clients,
                "Multiple clients flagged default; the last one wins"
            );
        }

        for (id, client) in self.clients.iter() {
            if client.secret.is_empty() {
                return Err(format!("Client '{}' has an empty secret", id));
            }
        }

        RouteTemplate::parse(&self.settings.route)?;

        if self.settings.duration == 0 {
            return Err("settings.duration must be greater than zero".to_string());
        }
        if self.settings.generation_timeout_secs == 0 {
            return Err("settings.generation_timeout_secs must be greater than zero".to_string());
        }

        if self.folders.orig.trim().is_empty() || self.folders.cache.trim().is_empty() {
            return Err("folders.orig and folders.cache must both be set".to_string());
        }

        for (status, path) in [
            (403, &self.fallbacks.forbidden),
            (404, &self.fallbacks.not_found),
            (412, &self.fallbacks.invalid),
        ] {
            if path.trim().is_empty() {
                return Err(format!("Fallback for status {} cannot be empty", status));
            }
        }

        if self.generator.command.trim().is_empty() {
            return Err("generator.command cannot be empty".to_string());
        }

        Ok(())
    }

    /// Load, validate and return the configuration in one step
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_suffix_set(kind: &str, suffixes: &[&str; 3]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for suffix in suffixes {
        if suffix.is_empty() {
            return Err(format!("Suffix of kind '{}' cannot be empty", kind));
        }
        if !seen.insert(*suffix) {
            return Err(format!(
                "Duplicate {} suffix '{}' makes variants indistinguishable",
                kind, suffix
            ));
        }
    }
    Ok(())
}
