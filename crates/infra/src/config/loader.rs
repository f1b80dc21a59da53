//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment, if one exists
//! 2. Loads from environment variables when `PHOTOX_API_BASE_URL` is set
//! 3. Otherwise probes for a config file (JSON or TOML)
//! 4. Falls back to [`ClientConfig::default`] when no file exists
//!
//! ## Environment Variables
//! - `PHOTOX_API_BASE_URL`: Base URL including the API prefix
//! - `PHOTOX_API_TIMEOUT_SECS`: Request timeout in seconds (optional)
//!
//! ## File Locations
//! `photox.toml`, `photox.json`, `config.toml` and `config.json`, looked up
//! in the working directory and then up to two parent directories.

use std::path::{Path, PathBuf};

use photox_domain::{ClientConfig, PhotoxError, Result};

const BASE_URL_VAR: &str = "PHOTOX_API_BASE_URL";
const TIMEOUT_VAR: &str = "PHOTOX_API_TIMEOUT_SECS";
const CONFIG_FILE_NAMES: [&str; 4] = ["photox.toml", "photox.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// The file and default fallbacks apply only while `PHOTOX_API_BASE_URL` is
/// unset or blank. Once it is set, the environment is authoritative.
///
/// # Errors
/// Returns `PhotoxError::Config` if a variable or the located file holds an
/// invalid value. A missing file is not an error.
pub fn load() -> Result<ClientConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(error = %err, "Could not load .env file"),
    }

    resolve(|key| std::env::var(key).ok(), probe_config_paths)
}

fn resolve<F, L>(lookup: F, locate: L) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
    L: FnOnce() -> Option<PathBuf>,
{
    let base_url_set = lookup(BASE_URL_VAR).is_some_and(|value| !value.trim().is_empty());
    if base_url_set {
        let config = load_from_lookup(lookup)?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("{BASE_URL_VAR} not set, trying config file");
    match locate() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No config file found, using defaults");
            Ok(ClientConfig::default())
        }
    }
}

/// Load configuration from the process environment
///
/// # Errors
/// Returns `PhotoxError::Config` if `PHOTOX_API_BASE_URL` is missing or the
/// timeout is not a positive integer.
pub fn load_from_env() -> Result<ClientConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup
///
/// # Errors
/// Same as [`load_from_env`].
pub fn load_from_lookup<F>(lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = lookup(BASE_URL_VAR)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            PhotoxError::Config(format!("Missing required environment variable: {BASE_URL_VAR}"))
        })?;

    let timeout_secs = match lookup(TIMEOUT_VAR) {
        Some(raw) => parse_timeout(&raw)?,
        None => ClientConfig::default().timeout_secs,
    };

    let config = ClientConfig { base_url: base_url.trim().to_string(), timeout_secs };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `PhotoxError::Config` if the file is missing, unreadable or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PhotoxError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            PhotoxError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| PhotoxError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| PhotoxError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| PhotoxError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(PhotoxError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the working directory and its parents for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    probe_from(&cwd)
}

fn probe_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .take(3)
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn parse_timeout(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        Ok(_) => Err(PhotoxError::Config("Timeout must be at least one second".into())),
        Err(e) => Err(PhotoxError::Config(format!("Invalid timeout: {e}"))),
    }
}

fn validate(config: &ClientConfig) -> Result<()> {
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(PhotoxError::Config(format!(
            "Base URL must be http(s): {}",
            config.base_url
        )));
    }
    if config.timeout_secs == 0 {
        return Err(PhotoxError::Config("Timeout must be at least one second".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_load_from_lookup_all_vars_set() {
        let config = load_from_lookup(lookup_from(&[
            (BASE_URL_VAR, "https://photox.example/api/v1"),
            (TIMEOUT_VAR, "12"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://photox.example/api/v1");
        assert_eq!(config.timeout_secs, 12);
    }

    #[test]
    fn test_load_from_lookup_defaults_timeout() {
        let config =
            load_from_lookup(lookup_from(&[(BASE_URL_VAR, "http://localhost:9000/api/v1")]))
                .unwrap();
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_lookup_missing_base_url() {
        let err = load_from_lookup(lookup_from(&[(TIMEOUT_VAR, "5")])).unwrap_err();
        assert!(matches!(err, PhotoxError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_lookup_invalid_timeout() {
        for raw in ["soon", "0", "-3"] {
            let result = load_from_lookup(lookup_from(&[
                (BASE_URL_VAR, "http://localhost:8000/api/v1"),
                (TIMEOUT_VAR, raw),
            ]));
            assert!(result.is_err(), "timeout {raw:?} should be rejected");
        }
    }

    #[test]
    fn test_load_from_lookup_rejects_non_http_url() {
        let err = load_from_lookup(lookup_from(&[(BASE_URL_VAR, "ftp://photox.example")]))
            .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_resolve_keeps_env_errors_when_base_url_set() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("photox.toml");
        std::fs::write(&file, "base_url = \"https://file.example/api/v1\"\n").unwrap();

        let err = resolve(
            lookup_from(&[(BASE_URL_VAR, "https://env.example/api/v1"), (TIMEOUT_VAR, "abc")]),
            || Some(file),
        )
        .unwrap_err();

        assert!(matches!(err, PhotoxError::Config(_)));
        assert!(err.to_string().contains("Invalid timeout"));
    }

    #[test]
    fn test_resolve_uses_file_when_base_url_unset() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("photox.toml");
        std::fs::write(&file, "base_url = \"https://file.example/api/v1\"\n").unwrap();

        let config = resolve(lookup_from(&[(TIMEOUT_VAR, "abc")]), || Some(file)).unwrap();

        assert_eq!(config.base_url, "https://file.example/api/v1");
    }

    #[test]
    fn test_resolve_blank_base_url_falls_back_to_defaults() {
        let config = resolve(lookup_from(&[(BASE_URL_VAR, "  ")]), || None).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_from_file_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photox.toml");
        std::fs::write(&path, "base_url = \"https://photox.example/api/v1\"\ntimeout_secs = 8\n")
            .unwrap();

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.base_url, "https://photox.example/api/v1");
        assert_eq!(config.timeout_secs, 8);
    }

    #[test]
    fn test_load_from_file_json_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "timeout_secs": 45 }"#).unwrap();

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.base_url, ClientConfig::default().base_url);
        assert_eq!(config.timeout_secs, 45);
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/photox.toml")));
        assert!(matches!(result, Err(PhotoxError::Config(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photox.json");
        std::fs::write(&path, r#"{ "base_url": "#).unwrap();

        let err = load_from_file(Some(path)).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON format"));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("base_url: x", Path::new("photox.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_probe_prefers_nearest_directory() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("app");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(root.path().join("config.toml"), "").unwrap();
        std::fs::write(nested.join("photox.json"), "{}").unwrap();

        assert_eq!(probe_from(&nested), Some(nested.join("photox.json")));
        assert_eq!(probe_from(root.path()), Some(root.path().join("config.toml")));
    }

    #[test]
    fn test_probe_finds_nothing_in_empty_tree() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(probe_from(&nested), None);
    }
}
