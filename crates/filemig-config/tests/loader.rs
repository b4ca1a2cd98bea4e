use std::fs;
use std::path::PathBuf;

use filemig_config::{
    BackendConfig, ConfigError, ConfigFormat, load_config, parse_config, resolve_env_refs,
    validate_config,
};

fn sample(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

fn fake_env(name: &str) -> Option<String> {
    Some(format!("value-of-{name}"))
}

#[test]
fn load_config_reads_and_validates_yaml_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("migration.yml");
    fs::write(
        &path,
        "source: {kind: memory}\n\
         destination:\n  kind: filesystem\n  absolute_path: /var/lib/filemig\n\
         paths: {source: '{item}', destination: 'copied/{item}'}\n\
         max_concurrency: 4\n",
    )?;

    let config = load_config(&path)?;
    assert_eq!(config.source, BackendConfig::Memory);
    assert_eq!(config.destination.kind(), "filesystem");
    assert_eq!(config.paths.destination, "copied/{item}");
    assert_eq!(config.max_concurrency, Some(4));
    Ok(())
}

#[test]
fn load_config_rejects_invalid_documents() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("migration.json");
    fs::write(
        &path,
        r#"{"source": {"kind": "filesystem", "absolute_path": "relative"},
            "destination": {"kind": "memory"},
            "paths": {"source": "{item}", "destination": "{item}"}}"#,
    )?;

    let err = load_config(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidField {
            section: "source",
            field: "absolute_path",
            ..
        }
    ));
    Ok(())
}

#[test]
fn load_config_reports_missing_file_and_unknown_extension() {
    let missing = load_config(&PathBuf::from("/definitely/missing/migration.yaml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));

    let unknown = load_config(&PathBuf::from("migration.ini")).unwrap_err();
    assert!(matches!(unknown, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn shipped_samples_parse_and_validate() -> anyhow::Result<()> {
    for name in ["filesystem.sample.yaml", "object-storage.sample.yaml"] {
        let raw = fs::read_to_string(sample(name))?;
        let mut config = parse_config(&raw, ConfigFormat::Yaml)?;
        resolve_env_refs(&mut config, fake_env)?;
        validate_config(&config)?;
    }

    let raw = fs::read_to_string(sample("object-storage.sample.yaml"))?;
    let mut config = parse_config(&raw, ConfigFormat::Yaml)?;
    resolve_env_refs(&mut config, fake_env)?;
    let BackendConfig::ObjectStorage(destination) = config.destination else {
        anyhow::bail!("expected object storage destination");
    };
    assert_eq!(destination.access_key_id, "value-of-AWS_ACCESS_KEY_ID");
    assert_eq!(destination.bucket, "some-bucket-name");
    Ok(())
}

#[test]
fn load_config_expands_fields_but_ignores_comment_references() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("migration.yaml");
    fs::write(
        &path,
        "# exported by ops, see ${FILEMIG_TEST_NEVER_SET_91C2}\n\
         source: {kind: memory}\n\
         destination:\n  kind: object_storage\n  access_key_id: AKID\n\
         \x20 secret_access_key: ${PATH}\n  bucket: b\n\
         paths: {source: '{item}', destination: '{item}'}\n",
    )?;

    let config = load_config(&path)?;
    let BackendConfig::ObjectStorage(destination) = config.destination else {
        anyhow::bail!("expected object storage destination");
    };
    assert_eq!(destination.secret_access_key, std::env::var("PATH")?);
    Ok(())
}
