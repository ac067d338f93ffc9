//! Storage config and credential tests for yc-storage-config.
// crates/yc-storage-config/tests/storage_validation.rs
// =============================================================================
// Module: Storage Config Validation Tests
// Description: Validate endpoint defaults, TLS policy, and credential lookup.
// Purpose: Ensure storage settings default to Yandex Cloud and fail closed.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use yc_storage_config::ConfigError;
use yc_storage_config::DEFAULT_ACCESS_KEY_ENV;
use yc_storage_config::DEFAULT_SECRET_KEY_ENV;
use yc_storage_config::DEFAULT_STORAGE_ENDPOINT;
use yc_storage_config::DEFAULT_STORAGE_REGION;
use yc_storage_config::StorageConfig;
use yc_storage_config::StorageCredentials;
use yc_storage_config::StorageMcpConfig;

type TestResult = Result<(), String>;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: BTreeMap<String, String> =
        vars.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |name: &str| map.get(name).cloned()
}

#[test]
fn defaults_point_at_yandex_cloud() -> TestResult {
    let config = StorageConfig::default();
    if config.endpoint != DEFAULT_STORAGE_ENDPOINT || config.region != DEFAULT_STORAGE_REGION {
        return Err("default endpoint/region mismatch".to_string());
    }
    if !config.force_path_style {
        return Err("path-style addressing must default on".to_string());
    }
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn endpoint_requires_scheme() -> TestResult {
    let config = StorageConfig {
        endpoint: "storage.yandexcloud.net".to_string(),
        ..StorageConfig::default()
    };
    match config.validate() {
        Err(err) if err.to_string().contains("must include http:// or https://") => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn plain_http_requires_opt_in() -> TestResult {
    let mut config = StorageConfig {
        endpoint: "http://localhost:9000".to_string(),
        ..StorageConfig::default()
    };
    if config.validate().is_ok() {
        return Err("http endpoint accepted without allow_http".to_string());
    }
    config.allow_http = true;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn env_names_must_be_identifiers() -> TestResult {
    let config = StorageConfig {
        access_key_env: "BAD-NAME".to_string(),
        ..StorageConfig::default()
    };
    match config.validate() {
        Err(ConfigError::Invalid(message)) if message.contains("storage.access_key_env") => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn credentials_resolve_from_lookup() -> TestResult {
    let lookup =
        lookup_from(&[(DEFAULT_ACCESS_KEY_ENV, "key-id"), (DEFAULT_SECRET_KEY_ENV, "secret")]);
    let credentials = StorageCredentials::from_lookup(&StorageConfig::default(), lookup)
        .map_err(|err| err.to_string())?;
    if credentials.access_key_id != "key-id" || credentials.secret_access_key != "secret" {
        return Err("credential values mismatch".to_string());
    }
    if format!("{credentials:?}").contains("secret\"") {
        return Err("secret leaked through Debug".to_string());
    }
    Ok(())
}

#[test]
fn missing_secret_is_rejected() -> TestResult {
    let lookup = lookup_from(&[(DEFAULT_ACCESS_KEY_ENV, "key-id")]);
    match StorageCredentials::from_lookup(&StorageConfig::default(), lookup) {
        Err(err) if err.to_string().contains(DEFAULT_SECRET_KEY_ENV) => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn empty_access_key_is_rejected() -> TestResult {
    let lookup = lookup_from(&[(DEFAULT_ACCESS_KEY_ENV, " "), (DEFAULT_SECRET_KEY_ENV, "secret")]);
    match StorageCredentials::from_lookup(&StorageConfig::default(), lookup) {
        Err(err) if err.to_string().contains("is empty") => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn custom_env_names_are_honored() -> TestResult {
    let config = StorageConfig {
        access_key_env: "MY_KEY".to_string(),
        secret_key_env: "MY_SECRET".to_string(),
        ..StorageConfig::default()
    };
    let lookup = lookup_from(&[("MY_KEY", "a"), ("MY_SECRET", "b")]);
    let credentials =
        StorageCredentials::from_lookup(&config, lookup).map_err(|err| err.to_string())?;
    if credentials.access_key_id != "a" {
        return Err("custom env name ignored".to_string());
    }
    Ok(())
}

#[test]
fn load_reads_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[storage]\nregion = \"ru-central2\"\n").map_err(|err| err.to_string())?;
    let config = StorageMcpConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.storage.region != "ru-central2" {
        return Err("region override not applied".to_string());
    }
    if config.storage.endpoint != DEFAULT_STORAGE_ENDPOINT {
        return Err("endpoint default lost".to_string());
    }
    Ok(())
}

#[test]
fn load_fails_for_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match StorageMcpConfig::load(Some(Path::new(&path))) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = "#".repeat(1024 * 1024 + 1);
    std::fs::write(&path, padding).map_err(|err| err.to_string())?;
    match StorageMcpConfig::load(Some(&path)) {
        Err(err) if err.to_string().contains("exceeds size limit") => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}
