use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gitcc_bridge::BridgeOptions;
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file name, looked up in the invocation directory
/// and then inside its `.git` directory.
pub const CONFIG_FILE: &str = "gitcc.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (looked for ./{CONFIG_FILE} and ./.git/{CONFIG_FILE})")]
    NotFound,

    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub core: CoreConfig,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    pub git_root: PathBuf,
    pub cc_root: PathBuf,
    #[serde(default)]
    pub remote: Option<String>,
    pub include: String,
    pub branches: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default = "default_coalesce_window")]
    pub coalesce_window: u64,
    #[serde(default)]
    pub ignore: Option<String>,
    #[serde(default = "default_user_domain")]
    pub user_domain: String,
}

impl CoreConfig {
    pub fn include(&self) -> Vec<String> {
        split_list(&self.include)
    }

    pub fn branches(&self) -> Vec<String> {
        split_list(&self.branches)
    }

    pub fn ignore(&self) -> Vec<String> {
        self.ignore.as_deref().map(split_list).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp: String,
    pub sender: String,
    pub recipients: String,
}

impl EmailConfig {
    pub fn recipients(&self) -> Vec<String> {
        split_list(&self.recipients)
    }
}

impl BridgeConfig {
    /// Load from an explicit path or the default lookup locations.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => find_config_file().ok_or(ConfigError::NotFound)?,
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Ini))
            .add_source(config::Environment::with_prefix("GITCC").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Resolve into the engine's constructor options.
    pub fn options(&self) -> BridgeOptions {
        BridgeOptions {
            git_root: self.core.git_root.clone(),
            view_root: self.core.cc_root.clone(),
            remote: self.core.remote.clone(),
            include: self.core.include(),
            branches: self.core.branches(),
            recursive: self.core.recursive,
            coalesce_window_secs: self.core.coalesce_window,
            ignore: self.core.ignore(),
            users: self.users.clone(),
            user_domain: self.core.user_domain.clone(),
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [cwd.join(CONFIG_FILE), cwd.join(".git").join(CONFIG_FILE)]
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Into::into)
        .collect()
}

fn default_recursive() -> bool {
    true
}

fn default_coalesce_window() -> u64 {
    4
}

fn default_user_domain() -> String {
    "localhost".to_string()
}
