use assert_matches::assert_matches;

use seqvault::config::{Config, ConfigLoader, EnvOverrides, NcbiSection, StoreSection};
use seqvault::error::SeqvaultError;

#[test]
fn file_values_apply_with_env_precedence() {
    let config = Config {
        schema_version: Some(1),
        ncbi: NcbiSection {
            email: Some("lab@example.org".to_string()),
            api_key: Some("from-file".to_string()),
            tool: Some("lab-pipeline".to_string()),
            max_retries: Some(5),
            timeout_secs: None,
        },
        store: StoreSection {
            path: Some("/data/sequences.json".to_string()),
        },
    };
    let env = EnvOverrides {
        ncbi_api_key: Some("from-env".to_string()),
        ..EnvOverrides::default()
    };

    let resolved = ConfigLoader::resolve_config(config, env).unwrap();

    assert_eq!(resolved.ncbi.email.as_deref(), Some("lab@example.org"));
    assert_eq!(resolved.ncbi.api_key.as_deref(), Some("from-env"));
    assert_eq!(resolved.ncbi.tool, "lab-pipeline");
    assert_eq!(resolved.ncbi.max_retries, 5);
    assert_eq!(resolved.ncbi.timeout_secs, 30);
    assert_eq!(resolved.store_path.as_str(), "/data/sequences.json");
}

#[test]
fn parse_partial_json() {
    let config: Config = serde_json::from_str(r#"{ "ncbi": { "email": "a@b.c" } }"#).unwrap();
    assert_eq!(config.ncbi.email.as_deref(), Some("a@b.c"));
    assert!(config.store.path.is_none());
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(SeqvaultError::ConfigRead(_))
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("seqvault.json");
    std::fs::write(&path, "{ \"ncbi\": 3 }").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(SeqvaultError::ConfigParse(_))
    );
}

#[test]
fn unknown_schema_version_in_file_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("seqvault.json");
    std::fs::write(&path, r#"{ "schema_version": 7 }"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(SeqvaultError::UnsupportedConfigVersion(7))
    );
}
