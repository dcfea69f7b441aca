use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.output.format, OutputFormat::Json);
    assert!(config.output.pretty);

    let logging = config.logging.as_ref().unwrap();
    let default = &logging["default"];
    assert_eq!(default.console_level, "warn");
    assert!(default.file.is_empty());
}

#[test]
fn test_yaml_serialization() {
    let config = AppConfig::default();
    let yaml = config.to_yaml().expect("Failed to serialize to YAML");

    assert!(yaml.contains("logging:"));
    assert!(yaml.contains("output:"));
    assert!(yaml.contains("format: json"));
}

#[test]
fn test_layered_loading_yaml_only() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("modfile.yaml");

    let yaml_content = r#"
output:
  format: yaml
  pretty: false

logging:
  default:
    console_level: info
    file: logs/modfile.log
    file_level: debug
  modfile:
    console_level: trace
"#;

    fs::write(&config_path, yaml_content).expect("Failed to write config file");

    let config = AppConfig::load_layered(&config_path).expect("Failed to load config");

    assert_eq!(config.output.format, OutputFormat::Yaml);
    assert!(!config.output.pretty);

    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging.len(), 2);
    assert_eq!(logging["default"].file, "logs/modfile.log");
    assert_eq!(logging["modfile"].console_level, "trace");
    assert!(logging["modfile"].file.is_empty());
}

#[test]
fn test_missing_sections_keep_defaults() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("empty.yaml");
    fs::write(&config_path, "output:\n  format: yaml\n").expect("Failed to write config file");

    let config = AppConfig::load_layered(&config_path).expect("Failed to load config");

    assert!(config.logging.is_none());
    assert!(config.output.pretty);
}

#[test]
fn test_unknown_fields_rejected() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.yaml");
    fs::write(&config_path, "server:\n  port: 1\n").expect("Failed to write config file");

    assert!(AppConfig::load_layered(&config_path).is_err());
}

#[test]
fn test_load_or_default_without_path() {
    let config = AppConfig::load_or_default(None::<&str>).expect("defaults always load");
    assert!(config.logging.is_some());
}

#[test]
fn test_cli_overrides() {
    let mut config = AppConfig::default();

    let args = CliArgs {
        format: Some(OutputFormat::Yaml),
        verbose: 2, // Should set logging to trace
        ..Default::default()
    };

    config.apply_cli_overrides(&args);

    assert_eq!(config.output.format, OutputFormat::Yaml);
    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "trace");
}

#[test]
fn test_cli_overrides_without_logging_section() {
    let mut config = AppConfig {
        logging: None,
        output: OutputConfig::default(),
    };

    config.apply_cli_overrides(&CliArgs {
        verbose: 1,
        ..Default::default()
    });

    let logging = config.logging.as_ref().unwrap();
    assert_eq!(logging["default"].console_level, "debug");
    assert_eq!(config.output.format, OutputFormat::Json);
}

#[test]
fn test_output_format_parsing() {
    assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    assert!("toml".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::Json.to_string(), "json");
}
