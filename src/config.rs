use crate::error::ConfigError;
use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV: &str = "TASKDECK_API_URL";

const APP_DIR: &str = "taskdeck";

// Raw file contents; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_url: Option<String>,
    page_size: Option<usize>,
    search_debounce_ms: Option<u64>,
    otp_signup: Option<bool>,
    session_file: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub page_size: usize,
    pub search_debounce: Duration,
    pub otp_signup: bool,
    pub session_file: PathBuf,
    pub log_dir: PathBuf,
}

pub fn default_config_path() -> PathBuf {
    base_dir(dirs::config_dir()).join("config.toml")
}

fn base_dir(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

impl Config {
    /// Reads the config file (a missing file means defaults), then applies
    /// `TASKDECK_API_URL` and finally the command-line URL override.
    pub fn load(path: Option<&Path>, api_url_override: Option<&str>) -> Result<Config, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let raw = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<RawConfig>(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let env_url = env::var(API_URL_ENV).ok();
        let api_url = api_url_override
            .map(str::to_string)
            .or(env_url)
            .or(raw.api_url.clone());

        Config::from_raw(raw, api_url)
    }

    fn from_raw(raw: RawConfig, api_url: Option<String>) -> Result<Config, ConfigError> {
        let api_url = api_url.unwrap_or_else(|| "http://localhost:8080".to_string());
        let api_url = Url::parse(&api_url).map_err(|err| ConfigError::Invalid {
            key: "api_url",
            reason: err.to_string(),
        })?;
        if !matches!(api_url.scheme(), "http" | "https") || api_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "api_url",
                reason: format!("{} is not an http(s) base URL", api_url),
            });
        }

        let page_size = raw.page_size.unwrap_or(5);
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            api_url,
            page_size,
            search_debounce: Duration::from_millis(raw.search_debounce_ms.unwrap_or(800)),
            otp_signup: raw.otp_signup.unwrap_or(true),
            session_file: raw
                .session_file
                .unwrap_or_else(|| base_dir(dirs::config_dir()).join("session.toml")),
            log_dir: raw
                .log_dir
                .unwrap_or_else(|| base_dir(dirs::data_dir()).join("logs")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(
            Some(&dir.path().join("absent.toml")),
            Some("http://localhost:8080"),
        )
        .unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.search_debounce, Duration::from_millis(800));
        assert!(config.otp_signup);
        assert!(config.session_file.ends_with("taskdeck/session.toml"));
    }

    #[test]
    fn test_file_values_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
page_size = 10
search_debounce_ms = 250
otp_signup = false
session_file = "/tmp/jar.toml"
"#,
        );
        let config = Config::load(Some(&path), Some("https://tasks.example.com/")).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_debounce, Duration::from_millis(250));
        assert!(!config.otp_signup);
        assert_eq!(config.session_file, PathBuf::from("/tmp/jar.toml"));
        assert_eq!(config.api_url.as_str(), "https://tasks.example.com/");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "page_size = 0\n");
        let err = Config::load(Some(&path), Some("http://localhost:8080")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "page_size", .. }));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let err = Config::from_raw(RawConfig::default(), Some("ftp://files".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "api_url", .. }));
    }

    #[test]
    fn test_bad_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "page_size = [\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)));
    }
}
