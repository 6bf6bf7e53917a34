//! Layered roster configuration.
//!
//! # Responsibility
//! - Merge built-in defaults, an optional TOML file and `ROSTER_*`
//!   environment variables into one typed settings value.
//!
//! # Invariants
//! - Built-in defaults always deserialize; [`Settings::defaults`] never
//!   touches the filesystem or environment.
//! - A configured log directory must be absolute (checked at logging init).

use crate::codec::line_codec::LoadPolicy;
use crate::logging::default_log_level;
use crate::repo::roster_repo::{CsvFileRepository, DEFAULT_DATA_FILE};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"
[data]
file         = "students.csv"
on_malformed = "fail"

[logging]
"#;

const ENV_PREFIX: &str = "ROSTER";

#[derive(Debug)]
pub enum ConfigError {
    Source(config::ConfigError),
    InvalidPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "configuration error: {err}"),
            Self::InvalidPolicy(message) => write!(f, "configuration error: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::InvalidPolicy(_) => None,
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(value: config::ConfigError) -> Self {
        Self::Source(value)
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// `[data]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_data_file")]
    pub file: PathBuf,
    /// `fail`, `skip` or `default`; see [`LoadPolicy`].
    #[serde(default = "default_on_malformed")]
    pub on_malformed: String,
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_on_malformed() -> String {
    LoadPolicy::default().as_str().to_string()
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            file: default_data_file(),
            on_malformed: default_on_malformed(),
        }
    }
}

/// `[logging]` section. File logging is off unless `dir` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Settings {
    /// Loads defaults, then `file` (when given, it must exist), then the
    /// environment (`ROSTER_DATA__FILE`, `ROSTER_LOGGING__LEVEL`, ...).
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(file, environment())
    }

    fn load_with_env(file: Option<&Path>, env: config::Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.load_policy()?;
        Ok(settings)
    }

    /// Returns the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    pub fn load_policy(&self) -> Result<LoadPolicy, ConfigError> {
        self.data
            .on_malformed
            .parse()
            .map_err(ConfigError::InvalidPolicy)
    }

    /// Builds the file repository described by `[data]`.
    pub fn repository(&self) -> Result<CsvFileRepository, ConfigError> {
        Ok(CsvFileRepository::with_policy(
            self.data.file.clone(),
            self.load_policy()?,
        ))
    }
}

/// `ROSTER_<SECTION>__<KEY>` variables, e.g. `ROSTER_DATA__ON_MALFORMED`.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::{environment, ConfigError, Settings};
    use crate::codec::line_codec::LoadPolicy;
    use std::path::Path;

    #[test]
    fn defaults_load() {
        let settings = Settings::defaults();
        assert_eq!(settings.data.file, Path::new("students.csv"));
        assert_eq!(settings.load_policy().unwrap(), LoadPolicy::FailFast);
        assert!(settings.logging.dir.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(
            &path,
            "[data]\nfile = \"class.csv\"\non_malformed = \"skip\"\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.data.file, Path::new("class.csv"));
        assert_eq!(settings.load_policy().unwrap(), LoadPolicy::SkipAndWarn);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, "[data]\non_malformed = \"lenient\"\n").unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Source(_)));
    }

    fn fake_env(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        std::fs::write(&path, "[data]\nfile = \"class.csv\"\non_malformed = \"fail\"\n").unwrap();

        let env = fake_env(&[
            ("ROSTER_DATA__ON_MALFORMED", "skip"),
            ("ROSTER_LOGGING__LEVEL", "debug"),
        ]);
        let settings = Settings::load_with_env(Some(&path), env).unwrap();

        assert_eq!(settings.load_policy().unwrap(), LoadPolicy::SkipAndWarn);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.data.file, Path::new("class.csv"));
    }

    #[test]
    fn environment_without_prefix_is_ignored() {
        let env = fake_env(&[("DATA__ON_MALFORMED", "skip"), ("OTHER_DATA__FILE", "x.csv")]);
        let settings = Settings::load_with_env(None, env).unwrap();

        assert_eq!(settings.load_policy().unwrap(), LoadPolicy::FailFast);
        assert_eq!(settings.data.file, Path::new("students.csv"));
    }
}
