// Loading configuration files from disk

use super::test_harness::DeliveryTestHarness;
use kagami::config::FileType;
use kagami::DeliveryConfig;

#[test]
fn test_harness_config_loads_with_env_secret() {
    let harness = DeliveryTestHarness::new();
    let config = &harness.config;

    assert_eq!(config.clients.get("web").unwrap().secret, "web-secret");
    assert_eq!(config.settings.duration, 600);
    assert_eq!(config.formats.get("full").unwrap().file_type, FileType::Png);
    assert_eq!(
        config.formats.keys().collect::<Vec<_>>(),
        vec!["thumb", "full", "preview"]
    );
}

#[test]
fn test_unset_env_var_is_rejected() {
    let yaml = r#"
clients:
  web:
    secret: ${KAGAMI_IT_NEVER_SET}
formats:
  thumb: {}
folders:
  orig: /srv/orig
  cache: /srv/cache
fallbacks:
  "403": /srv/403.jpg
  "404": /srv/404.jpg
  "412": /srv/412.jpg
"#;
    let err = DeliveryConfig::from_yaml_with_env(yaml).unwrap_err();
    assert!(err.contains("KAGAMI_IT_NEVER_SET"));
}

#[test]
fn test_missing_file_is_rejected() {
    let harness = DeliveryTestHarness::new();
    let err = DeliveryConfig::load(harness.dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_two_default_formats_are_rejected() {
    let yaml = r#"
formats:
  thumb:
    default: true
  full:
    default: true
folders:
  orig: /srv/orig
  cache: /srv/cache
fallbacks:
  "403": /srv/403.jpg
  "404": /srv/404.jpg
  "412": /srv/412.jpg
"#;
    let config = DeliveryConfig::from_yaml_with_env(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("thumb, full"));
}
