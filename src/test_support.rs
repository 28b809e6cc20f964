// Shared fixtures for unit tests

use std::path::Path;

use crate::config::DeliveryConfig;

pub const SAMPLE_YAML: &str = r#"
settings:
  route: /media/image/{format}/{id}/{file}
  duration: 600
  generation_timeout_secs: 5
clients:
  web:
    secret: web-secret
    default: true
  partner:
    secret: partner-secret
formats:
  thumb:
    default: true
    restricted: true
    width: 200
    height: 200
  full:
    type: png
    watermarked: true
  preview:
    restricted: true
    blurred: true
    width: 800
folders:
  orig: /srv/media/orig
  cache: /srv/media/cache
fallbacks:
  "403": /srv/media/fallback/403.jpg
  "404": /srv/media/fallback/404.jpg
  "412": /srv/media/fallback/412.jpg
"#;

pub fn sample_config() -> DeliveryConfig {
    DeliveryConfig::from_yaml_with_env(SAMPLE_YAML).expect("sample config parses")
}

/// Sample configuration rooted at `root`, with the orig/cache folders and
/// the three fallback images created on disk
pub fn sample_config_in(root: &Path) -> DeliveryConfig {
    let mut config = sample_config();
    let orig = root.join("orig");
    let cache = root.join("cache");
    let fallback = root.join("fallback");
    for dir in [&orig, &cache, &fallback] {
        std::fs::create_dir_all(dir).expect("create test folder");
    }

    config.folders.orig = orig.display().to_string();
    config.folders.cache = cache.display().to_string();
    config.fallbacks.forbidden = fallback.join("403.jpg").display().to_string();
    config.fallbacks.not_found = fallback.join("404.jpg").display().to_string();
    config.fallbacks.invalid = fallback.join("412.jpg").display().to_string();
    for status in ["403", "404", "412"] {
        std::fs::write(fallback.join(format!("{}.jpg", status)), status.as_bytes())
            .expect("write fallback image");
    }
    config
}
