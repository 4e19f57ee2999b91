use hookwire_extension::{ConfigError, DatabaseConfig, EnvironmentConfig, ExtensionConfig};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
name = "network-service"

[database]
retry_tx_count = 3
retry_tx_interval_ms = 250

[[extensions]]
id = "network-quota"
url = "file://network_quota"
path = "^/v2.0/networks"

[[extensions]]
id = "audit"
code_type = "javascript"
url = "audit.js"
"#;

#[test]
fn load_from_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hookwire.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = EnvironmentConfig::load_from(&path).unwrap();

    assert_eq!(config.name, "network-service");
    assert_eq!(config.database.db_options().retry_tx_count, 3);
    assert_eq!(
        config.database.db_options().retry_tx_interval,
        Duration::from_millis(250)
    );
    assert_eq!(
        config.extensions,
        vec![
            ExtensionConfig::new("network-quota", "file://network_quota", "^/v2.0/networks"),
            ExtensionConfig {
                id: "audit".into(),
                code_type: "javascript".into(),
                url: "audit.js".into(),
                path: String::new(),
            },
        ]
    );
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    let config = EnvironmentConfig::load_from(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.name, "default");
    assert!(config.extensions.is_empty());
    assert_eq!(config.database, DatabaseConfig::default());
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = EnvironmentConfig::from_toml_str("name = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_path_pattern_is_rejected_on_load() {
    let err = EnvironmentConfig::from_toml_str(
        r#"
[[extensions]]
id = "broken"
url = "broken"
path = "(unclosed"
"#,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidPattern { ref id, .. } if id == "broken"));
}

#[test]
fn path_matching() {
    let scoped = ExtensionConfig::new("networks", "networks", "^/v2.0/networks");
    assert!(scoped.matches("/v2.0/networks/n1"));
    assert!(!scoped.matches("/v2.0/ports"));

    let everywhere = ExtensionConfig::new("all", "all", "");
    assert!(everywhere.matches("/anything"));

    let broken = ExtensionConfig::new("broken", "broken", "[");
    assert!(!broken.matches("/v2.0/networks"));
}
