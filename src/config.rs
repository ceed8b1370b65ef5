//! Layered configuration for the `pkgman` binary.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file,
//! `PKGMAN_*` environment variables, command line flags.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::manager::{InstallPolicy, TargetSet};
use crate::package::MatchMode;
use crate::runtime::Runtime;

pub const ENV_AVAILABLE: &str = "PKGMAN_AVAILABLE";
pub const ENV_INSTALLED: &str = "PKGMAN_INSTALLED";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Available repositories (directories or archives), in preference order
    pub available: Vec<PathBuf>,
    /// Installed directory repository; defaults to `~/.pkgman`
    pub installed: Option<PathBuf>,
    pub targets: Vec<String>,
    pub policy: InstallPolicy,
    pub match_mode: MatchMode,
}

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub available: Vec<PathBuf>,
    pub installed: Option<PathBuf>,
    pub targets: Vec<String>,
    pub force: bool,
    pub compatible: bool,
}

impl ManagerConfig {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    /// `<config_dir>/pkgman/config.json`
    pub fn default_path<R: Runtime>(runtime: &R) -> Option<PathBuf> {
        runtime
            .config_dir()
            .map(|dir| dir.join("pkgman").join("config.json"))
    }

    /// Load `explicit` (which must exist), else the default file if present.
    pub fn discover<R: Runtime>(runtime: &R, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(runtime, path);
        }
        match Self::default_path(runtime) {
            Some(path) if runtime.exists(&path) => {
                debug!("Using config file {:?}", path);
                Self::load(runtime, &path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn apply_env<R: Runtime>(&mut self, runtime: &R) {
        if let Ok(available) = runtime.env_var(ENV_AVAILABLE)
            && !available.is_empty()
        {
            self.available = std::env::split_paths(&available).collect();
        }
        if let Ok(installed) = runtime.env_var(ENV_INSTALLED)
            && !installed.is_empty()
        {
            self.installed = Some(PathBuf::from(installed));
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if !overrides.available.is_empty() {
            self.available = overrides.available.clone();
        }
        if let Some(installed) = &overrides.installed {
            self.installed = Some(installed.clone());
        }
        if !overrides.targets.is_empty() {
            self.targets = overrides.targets.clone();
        }
        if overrides.force {
            self.policy = InstallPolicy::Force;
        }
        if overrides.compatible {
            self.match_mode = MatchMode::Compatible;
        }
    }

    /// Build the effective configuration from every layer.
    pub fn resolve<R: Runtime>(runtime: &R, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = Self::discover(runtime, overrides.config_file.as_deref())?;
        config.apply_env(runtime);
        config.apply_overrides(overrides);
        debug!("Effective config: {:?}", config);
        Ok(config)
    }

    pub fn installed_root<R: Runtime>(&self, runtime: &R) -> Result<PathBuf> {
        match &self.installed {
            Some(path) => Ok(path.clone()),
            None => {
                let home = runtime
                    .home_dir()
                    .context("Could not find home directory")?;
                Ok(home.join(".pkgman"))
            }
        }
    }

    pub fn target_set(&self) -> TargetSet {
        TargetSet::new(&self.targets)
    }
}
