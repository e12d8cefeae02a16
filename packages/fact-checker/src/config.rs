//! Configuration resolution.
//!
//! Every setting is resolved once, at process entry, from three layers:
//! command-line flags, environment variables, and (for the API key only) a
//! key file. Resolution reads from an explicit [`Environment`] snapshot, so
//! the same snapshot always resolves to the same [`Configuration`].
//!
//! | Setting  | Flag            | Env var             | Key file | Default                     |
//! |----------|-----------------|---------------------|----------|-----------------------------|
//! | API key  | `--api-key`     | `PPLX_API_KEY`      | yes      | (required)                  |
//! | Model    | `--model`       | `PPLX_MODEL`        |          | `sonar-pro`                 |
//! | Base URL | `--base-url`    | `PPLX_BASE_URL`     |          | `https://api.perplexity.ai` |
//! | Timeout  | `--timeout`     | `PPLX_TIMEOUT_SECS` |          | HTTP client default         |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::credentials::{ApiKey, KeySource};
use crate::error::{FactCheckError, Result};
use crate::prompt::SearchFilter;

pub const API_KEY_ENV: &str = sonar_client::API_KEY_ENV;
pub const BASE_URL_ENV: &str = "PPLX_BASE_URL";
pub const MODEL_ENV: &str = "PPLX_MODEL";
pub const TIMEOUT_ENV: &str = "PPLX_TIMEOUT_SECS";

/// Key file names, checked in this order within each directory.
pub const KEY_FILE_NAMES: [&str; 4] = ["pplx_api_key", ".pplx_api_key", "PPLX_API_KEY", ".PPLX_API_KEY"];

/// Snapshot of the process environment that configuration is resolved from.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    /// Directory of the running executable
    script_dir: Option<PathBuf>,
    /// Current working directory
    cwd: Option<PathBuf>,
}

impl Environment {
    /// Empty environment: no variables, no key-file directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the real process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
            script_dir: std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf)),
            cwd: std::env::current_dir().ok(),
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Non-blank value of an environment variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Candidate key files: script directory first, then working directory.
    pub fn key_file_candidates(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<&PathBuf> = Vec::new();
        for dir in [&self.script_dir, &self.cwd].into_iter().flatten() {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        dirs.into_iter()
            .flat_map(|dir| KEY_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .collect()
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub prompt_file: Option<PathBuf>,
    pub structured_output: bool,
    pub search_domains: Vec<String>,
    pub search_recency: Option<String>,
}

/// Resolved, immutable configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    pub structured_output: bool,
    pub prompt_file: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub search: SearchFilter,
}

impl Configuration {
    /// Resolve configuration from flags and an environment snapshot.
    pub fn resolve(overrides: &ConfigOverrides, env: &Environment) -> Result<Self> {
        let api_key = resolve_api_key(overrides.api_key.as_deref(), env)?;

        let model = first_non_blank(overrides.model.as_deref(), env.var(MODEL_ENV))
            .unwrap_or(sonar_client::DEFAULT_MODEL)
            .to_string();

        let base_url = first_non_blank(overrides.base_url.as_deref(), env.var(BASE_URL_ENV))
            .unwrap_or(sonar_client::DEFAULT_BASE_URL)
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            FactCheckError::Configuration(format!("invalid base URL '{}': {}", base_url, e))
        })?;

        let timeout = match overrides.timeout_secs {
            Some(secs) => Some(secs),
            None => env
                .var(TIMEOUT_ENV)
                .map(|v| {
                    v.parse::<u64>().map_err(|_| {
                        FactCheckError::Configuration(format!(
                            "{} must be a whole number of seconds, got '{}'",
                            TIMEOUT_ENV, v
                        ))
                    })
                })
                .transpose()?,
        };
        if timeout == Some(0) {
            return Err(FactCheckError::Configuration(
                "timeout must be at least one second".into(),
            ));
        }

        debug!(model = %model, base_url = %base_url, "Configuration resolved");

        Ok(Self {
            api_key,
            base_url,
            model,
            structured_output: overrides.structured_output,
            prompt_file: overrides.prompt_file.clone(),
            timeout: timeout.map(Duration::from_secs),
            search: SearchFilter {
                domains: overrides
                    .search_domains
                    .iter()
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect(),
                recency: overrides.search_recency.clone(),
            },
        })
    }
}

fn first_non_blank<'a>(flag: Option<&'a str>, env: Option<&'a str>) -> Option<&'a str> {
    flag.map(str::trim).filter(|v| !v.is_empty()).or(env)
}

fn resolve_api_key(flag: Option<&str>, env: &Environment) -> Result<ApiKey> {
    let candidates = env.key_file_candidates();
    let found = if let Some(key) = flag.map(str::trim).filter(|k| !k.is_empty()) {
        Some(ApiKey::new(key, KeySource::Flag))
    } else if let Some(key) = env.var(API_KEY_ENV) {
        Some(ApiKey::new(key, KeySource::Env(API_KEY_ENV)))
    } else {
        read_key_file(&candidates)
    };

    if let Some(key) = found {
        debug!(source = %key.source(), "API key resolved");
        return Ok(key);
    }

    let mut checked = vec![
        KeySource::Flag.to_string(),
        KeySource::Env(API_KEY_ENV).to_string(),
    ];
    checked.extend(candidates.iter().map(|p| p.display().to_string()));

    Err(FactCheckError::Configuration(format!(
        "API key not found. Checked: {}",
        checked.join(", ")
    )))
}

fn read_key_file(candidates: &[PathBuf]) -> Option<ApiKey> {
    candidates.iter().find_map(|path| {
        // Unreadable files are skipped like missing ones
        let contents = std::fs::read_to_string(path).ok()?;
        let key = contents.trim();
        (!key.is_empty()).then(|| ApiKey::new(key, KeySource::File(path.clone())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(config: &Configuration) -> &str {
        config.api_key.expose()
    }

    #[test]
    fn test_flag_beats_env_and_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pplx_api_key"), "from-file\n").unwrap();
        let env = Environment::new()
            .with_var(API_KEY_ENV, "from-env")
            .with_cwd(dir.path());
        let overrides = ConfigOverrides {
            api_key: Some("from-flag".into()),
            ..Default::default()
        };

        let config = Configuration::resolve(&overrides, &env).unwrap();
        assert_eq!(key_of(&config), "from-flag");
    }

    #[test]
    fn test_env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pplx_api_key"), "from-file").unwrap();
        let env = Environment::new()
            .with_var(API_KEY_ENV, "from-env")
            .with_cwd(dir.path());

        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(key_of(&config), "from-env");
        assert_eq!(config.api_key.source(), &KeySource::Env(API_KEY_ENV));
    }

    #[test]
    fn test_blank_flag_and_env_fall_through_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".PPLX_API_KEY"), "  from-file  \n").unwrap();
        let env = Environment::new()
            .with_var(API_KEY_ENV, "   ")
            .with_cwd(dir.path());
        let overrides = ConfigOverrides {
            api_key: Some(String::new()),
            ..Default::default()
        };

        let config = Configuration::resolve(&overrides, &env).unwrap();
        assert_eq!(key_of(&config), "from-file");
        assert_eq!(
            config.api_key.source(),
            &KeySource::File(dir.path().join(".PPLX_API_KEY"))
        );
    }

    #[test]
    fn test_script_dir_beats_cwd() {
        let script = tempfile::tempdir().unwrap();
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(script.path().join(".pplx_api_key"), "script-key").unwrap();
        std::fs::write(cwd.path().join("pplx_api_key"), "cwd-key").unwrap();
        let env = Environment::new()
            .with_script_dir(script.path())
            .with_cwd(cwd.path());

        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(key_of(&config), "script-key");
    }

    #[test]
    fn test_empty_key_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".pplx_api_key"), "\n").unwrap();
        std::fs::write(dir.path().join("PPLX_API_KEY"), "second").unwrap();
        let env = Environment::new().with_cwd(dir.path());

        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(key_of(&config), "second");
    }

    #[test]
    fn test_missing_key_names_every_location() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new().with_cwd(dir.path());

        let err = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap_err();
        let msg = err.to_string();

        assert!(matches!(err, FactCheckError::Configuration(_)));
        assert!(msg.contains("--api-key"));
        assert!(msg.contains(API_KEY_ENV));
        for name in KEY_FILE_NAMES {
            assert!(msg.contains(name), "message should mention {}: {}", name, msg);
        }
    }

    #[test]
    fn test_same_dir_checked_once() {
        let env = Environment::new().with_script_dir("/opt/tool").with_cwd("/opt/tool");
        assert_eq!(env.key_file_candidates().len(), KEY_FILE_NAMES.len());
    }

    #[test]
    fn test_defaults() {
        let env = Environment::new().with_var(API_KEY_ENV, "k");
        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();

        assert_eq!(config.model, "sonar-pro");
        assert_eq!(config.base_url, "https://api.perplexity.ai");
        assert!(!config.structured_output);
        assert!(config.timeout.is_none());
        assert!(config.prompt_file.is_none());
        assert_eq!(config.search, SearchFilter::default());
    }

    #[test]
    fn test_model_and_base_url_precedence() {
        let env = Environment::new()
            .with_var(API_KEY_ENV, "k")
            .with_var(MODEL_ENV, "sonar-reasoning")
            .with_var(BASE_URL_ENV, "https://env.example");

        let from_env = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(from_env.model, "sonar-reasoning");
        assert_eq!(from_env.base_url, "https://env.example");

        let overrides = ConfigOverrides {
            model: Some("sonar".into()),
            base_url: Some("https://flag.example".into()),
            ..Default::default()
        };
        let from_flag = Configuration::resolve(&overrides, &env).unwrap();
        assert_eq!(from_flag.model, "sonar");
        assert_eq!(from_flag.base_url, "https://flag.example");
    }

    #[test]
    fn test_timeout_from_env_and_invalid_values() {
        let env = Environment::new()
            .with_var(API_KEY_ENV, "k")
            .with_var(TIMEOUT_ENV, "45");
        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(45)));

        let bad = env.clone().with_var(TIMEOUT_ENV, "soon");
        let err = Configuration::resolve(&ConfigOverrides::default(), &bad).unwrap_err();
        assert!(matches!(err, FactCheckError::Configuration(_)));

        let zero = ConfigOverrides {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(Configuration::resolve(&zero, &env).is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let env = Environment::new().with_var(API_KEY_ENV, "k");
        let overrides = ConfigOverrides {
            base_url: Some("not a url".into()),
            ..Default::default()
        };

        let err = Configuration::resolve(&overrides, &env).unwrap_err();
        assert!(matches!(err, FactCheckError::Configuration(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let env = Environment::new().with_var(API_KEY_ENV, "pplx-secret-value");
        let config = Configuration::resolve(&ConfigOverrides::default(), &env).unwrap();

        assert!(!format!("{:?}", config).contains("pplx-secret-value"));
    }
}
