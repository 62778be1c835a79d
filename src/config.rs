//! Configuration for evaltrack.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVALTRACK_HOME, EVALTRACK_DB, EVALTRACK_ORACLE_MODEL,
//!    EVALTRACK_ORACLE_URL); a `.env` file is loaded by the binary first
//! 2. Config file (.evaltrack/config.yaml)
//! 3. Defaults (~/.evaltrack, gpt-4.1-nano)
//!
//! Config file discovery:
//! - Searches current directory and parents for .evaltrack/config.yaml
//! - Paths in config file are relative to the project root (parent of .evaltrack/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{RangePolicy, DEFAULT_RETRY_BUDGET};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DATABASE_FILE: &str = "evaltrack.db";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
    #[serde(default)]
    pub grading: Option<GradingConfig>,
    #[serde(default)]
    pub ingest: Option<IngestConfig>,
}

impl ConfigFile {
    /// Reject values that would make every grading call fail
    fn validate(&self) -> Result<()> {
        if let Some(oracle) = &self.oracle {
            if oracle.timeout_seconds == Some(0) {
                anyhow::bail!("oracle.timeout_seconds must be at least 1");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to project root)
    pub home: Option<String>,
    /// Ledger database file (relative to project root)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
    pub range_policy: Option<RangePolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub id_retry_budget: Option<u32>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Ledger database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub oracle: OracleSettings,
    pub grading: GradingSettings,
    pub ingest: IngestSettings,
}

/// Grading oracle connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSettings {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradingSettings {
    pub range_policy: RangePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub id_retry_budget: u32,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            id_retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".evaltrack").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let file: ConfigFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    file.validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(file)
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine a parsed config file, environment lookups and defaults
fn resolve(
    config_file: Option<(PathBuf, ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: PathBuf,
) -> ResolvedConfig {
    let (config_path, file) = match config_file {
        Some((path, file)) => (Some(path), Some(file)),
        None => (None, None),
    };

    // Project root is the parent of .evaltrack/
    let base_dir = config_path
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let paths = file.as_ref().map(|f| f.paths.clone()).unwrap_or_default();

    let home = env("EVALTRACK_HOME")
        .map(PathBuf::from)
        .or_else(|| paths.home.as_deref().map(|p| resolve_path(&base_dir, p)))
        .unwrap_or(default_home);

    let database = env("EVALTRACK_DB")
        .map(PathBuf::from)
        .or_else(|| paths.database.as_deref().map(|p| resolve_path(&base_dir, p)))
        .unwrap_or_else(|| home.join(DATABASE_FILE));

    let oracle_config = file.as_ref().and_then(|f| f.oracle.clone());
    let defaults = OracleSettings::default();
    let oracle = OracleSettings {
        model: env("EVALTRACK_ORACLE_MODEL")
            .or_else(|| oracle_config.as_ref().and_then(|o| o.model.clone()))
            .unwrap_or(defaults.model),
        base_url: env("EVALTRACK_ORACLE_URL")
            .or_else(|| oracle_config.as_ref().and_then(|o| o.base_url.clone()))
            .unwrap_or(defaults.base_url),
        api_key_env: oracle_config
            .as_ref()
            .and_then(|o| o.api_key_env.clone())
            .unwrap_or(defaults.api_key_env),
        timeout_seconds: oracle_config
            .as_ref()
            .and_then(|o| o.timeout_seconds)
            .unwrap_or(defaults.timeout_seconds),
    };

    let grading = GradingSettings {
        range_policy: file
            .as_ref()
            .and_then(|f| f.grading.as_ref())
            .and_then(|g| g.range_policy)
            .unwrap_or_default(),
    };

    let ingest = IngestSettings {
        id_retry_budget: file
            .as_ref()
            .and_then(|f| f.ingest.as_ref())
            .and_then(|i| i.id_retry_budget)
            .unwrap_or(DEFAULT_RETRY_BUDGET),
    };

    ResolvedConfig {
        home,
        database,
        config_file: config_path,
        oracle,
        grading,
        ingest,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".evaltrack");

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config_file = match find_config_file(&cwd) {
        Some(path) => {
            let file = load_config_file(&path)?;
            Some((path, file))
        }
        None => None,
    };

    Ok(resolve(
        config_file,
        |key| std::env::var(key).ok().filter(|v| !v.is_empty()),
        default_home,
    ))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration, bypassing the cache
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the ledger database path
pub fn database_path() -> Result<PathBuf> {
    Ok(config()?.database.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, no_env, PathBuf::from("/home/user/.evaltrack"));

        assert_eq!(config.home, PathBuf::from("/home/user/.evaltrack"));
        assert_eq!(config.database, PathBuf::from("/home/user/.evaltrack/evaltrack.db"));
        assert!(config.config_file.is_none());
        assert_eq!(config.oracle, OracleSettings::default());
        assert_eq!(config.oracle.timeout(), Duration::from_secs(60));
        assert_eq!(config.grading.range_policy, RangePolicy::Clamp);
        assert_eq!(config.ingest.id_retry_budget, 1000);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let state_dir = temp.path().join(".evaltrack");
        std::fs::create_dir_all(&state_dir).unwrap();

        let config_path = state_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./state
  database: ./state/ledger.db
oracle:
  model: gpt-4o-mini
  api_key_env: GRADER_KEY
  timeout_seconds: 15
grading:
  range_policy: reject
ingest:
  id_retry_budget: 50
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.paths.home, Some("./state".to_string()));

        let config = resolve(Some((config_path.clone(), parsed)), no_env, PathBuf::from("/unused"));
        assert_eq!(config.home, temp.path().join("./state"));
        assert_eq!(config.database, temp.path().join("./state/ledger.db"));
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.oracle.model, "gpt-4o-mini");
        assert_eq!(config.oracle.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.oracle.api_key_env, "GRADER_KEY");
        assert_eq!(config.oracle.timeout_seconds, 15);
        assert_eq!(config.grading.range_policy, RangePolicy::Reject);
        assert_eq!(config.ingest.id_retry_budget, 50);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(
            &config_path,
            "version: \"1.0\"\noracle:\n  timeout_seconds: 0\n",
        )
        .unwrap();

        let err = load_config_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_seconds must be at least 1"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
paths:
  home: /srv/evaltrack
oracle:
  model: from-file
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            ("EVALTRACK_DB", "/tmp/other.db"),
            ("EVALTRACK_ORACLE_MODEL", "from-env"),
            ("EVALTRACK_ORACLE_URL", "http://localhost:8080/v1"),
        ]
        .into_iter()
        .collect();

        let config = resolve(
            Some((PathBuf::from("/project/.evaltrack/config.yaml"), file)),
            |key| env.get(key).map(|v| v.to_string()),
            PathBuf::from("/unused"),
        );

        assert_eq!(config.home, PathBuf::from("/srv/evaltrack"));
        assert_eq!(config.database, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.oracle.model, "from-env");
        assert_eq!(config.oracle.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let state_dir = temp.path().join(".evaltrack");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join("config.yaml"), "version: \"1.0\"\n").unwrap();

        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(state_dir.join("config.yaml")));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
