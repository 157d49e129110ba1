//! TOML configuration for sessions and the CLI.
//!
//! ```toml
//! [executor]
//! workers = "auto"      # or an integer >= 1
//! max_retries = 0
//! preserve_order = false
//!
//! [store]
//! db_path = ".filechain/registry.db"
//! cas_path = ".filechain/cas"
//!
//! [logging]
//! profile = "development"
//! ```
//!
//! Every section and key is optional. Environment variables override the
//! file: `FILECHAIN_WORKERS`, `FILECHAIN_DB`, `FILECHAIN_CAS`,
//! `FILECHAIN_LOG_PROFILE`.

use filechain_core::errors::{ExError, ExErrorKind};
use filechain_core::logging_facility::Profile;
use filechain_core::{ExecutorConfig, Workers};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_WORKERS: &str = "FILECHAIN_WORKERS";
pub const ENV_DB: &str = "FILECHAIN_DB";
pub const ENV_CAS: &str = "FILECHAIN_CAS";
pub const ENV_LOG_PROFILE: &str = "FILECHAIN_LOG_PROFILE";

fn config_error(message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("load_config")
        .with_message(message)
}

/// `workers` as written: `"auto"` or a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkersSetting {
    Count(i64),
    Named(String),
}

impl Default for WorkersSetting {
    fn default() -> Self {
        WorkersSetting::Named("auto".to_string())
    }
}

impl WorkersSetting {
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => WorkersSetting::Count(n),
            Err(_) => WorkersSetting::Named(s.trim().to_string()),
        }
    }

    /// # Errors
    ///
    /// `Config` for anything other than `"auto"` or a count >= 1.
    pub fn resolve(&self) -> Result<Workers, ExError> {
        match self {
            WorkersSetting::Named(name) if name.eq_ignore_ascii_case("auto") => Ok(Workers::Auto),
            WorkersSetting::Named(name) => Err(config_error(format!(
                "workers must be \"auto\" or an integer >= 1, got \"{}\"",
                name
            ))),
            WorkersSetting::Count(n) if *n >= 1 => usize::try_from(*n)
                .map(Workers::Fixed)
                .map_err(|_| config_error(format!("workers out of range: {}", n))),
            WorkersSetting::Count(n) => Err(config_error(format!(
                "workers must be \"auto\" or an integer >= 1, got {}",
                n
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorSection {
    pub workers: WorkersSetting,
    pub max_retries: u32,
    pub preserve_order: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub db_path: PathBuf,
    pub cas_path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".filechain/registry.db"),
            cas_path: PathBuf::from(".filechain/cas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub profile: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            profile: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilechainConfig {
    pub executor: ExecutorSection,
    pub store: StoreSection,
    pub logging: LoggingSection,
}

impl FilechainConfig {
    /// Load `path` (defaults when `None` or missing), then apply
    /// environment overrides and validate.
    ///
    /// # Errors
    ///
    /// `Config` for unreadable or malformed files and invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ExError> {
        let config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ExError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&text).map_err(|e| config_error(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> Result<Self, ExError> {
        toml::from_str(text).map_err(|e| config_error(e.to_string()))
    }

    /// Apply overrides looked up through `lookup` (normally `std::env::var`).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.executor.workers = WorkersSetting::parse(&workers);
        }
        if let Some(db) = lookup(ENV_DB) {
            self.store.db_path = PathBuf::from(db);
        }
        if let Some(cas) = lookup(ENV_CAS) {
            self.store.cas_path = PathBuf::from(cas);
        }
        if let Some(profile) = lookup(ENV_LOG_PROFILE) {
            self.logging.profile = profile;
        }
        self
    }

    /// # Errors
    ///
    /// `Config` naming the first invalid value.
    pub fn validate(&self) -> Result<(), ExError> {
        self.executor.workers.resolve()?;
        self.log_profile()?;
        Ok(())
    }

    pub fn executor_config(&self) -> Result<ExecutorConfig, ExError> {
        Ok(ExecutorConfig::default()
            .with_workers(self.executor.workers.resolve()?)
            .with_max_retries(self.executor.max_retries)
            .with_preserve_order(self.executor.preserve_order))
    }

    pub fn log_profile(&self) -> Result<Profile, ExError> {
        Profile::parse(&self.logging.profile).ok_or_else(|| {
            config_error(format!(
                "unknown logging profile \"{}\" (expected development, production or test)",
                self.logging.profile
            ))
        })
    }
}
