//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/xtask/xtask.toml`
//! 3. Local config: `<project_root>/.xtask.toml`
//! 4. Environment variables: `XTASK_*` prefix (scalars only)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Settings for the shell executor and the task commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory commands run in (default: the directory of this crate)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    /// Cargo executable (default: $CARGO or "cargo")
    pub cargo: String,
    /// Variables set for every spawned command
    pub env: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        // cargo exports CARGO to build scripts and `cargo run` children
        let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".into());

        Self {
            project_root: None,
            cargo,
            env: BTreeMap::new(),
        }
    }
}

/// Raw settings for intermediate parsing (None = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub project_root: Option<PathBuf>,
    pub cargo: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
}

/// Directory containing this crate's manifest, fixed at compile time.
pub fn default_project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Get the XDG config directory for xtask.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "xtask").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("xtask.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".xtask.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Project root to run commands in.
    pub fn resolved_root(&self, fallback: &Path) -> PathBuf {
        self.project_root
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    fn expand_paths(&mut self) {
        if let Some(root) = &self.project_root {
            self.project_root = Some(PathBuf::from(expand_env_vars(
                root.to_string_lossy().as_ref(),
            )));
        }
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `env`: union, overlay wins per key
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut env = self.env.clone();
        if let Some(extra) = &overlay.env {
            env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self {
            project_root: overlay
                .project_root
                .clone()
                .or_else(|| self.project_root.clone()),
            cargo: overlay.cargo.clone().unwrap_or_else(|| self.cargo.clone()),
            env,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Directory searched for the local `.xtask.toml`
    pub fn load(project_dir: &Path) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        let local_path = local_config_path(project_dir);
        if local_path.exists() {
            debug!("load: local config {}", local_path.display());
            current = current.merge_with(&load_raw_settings(&local_path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply XTASK_* environment variables as explicit overrides.
    ///
    /// The config crate lowercases keys, so the case-sensitive `env` table
    /// can only be set from files.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("XTASK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("project_root") {
            settings.project_root = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("cargo") {
            settings.cargo = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# xtask configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/xtask/xtask.toml
#   Local:  <project_root>/.xtask.toml
#   Env:    XTASK_CARGO, XTASK_PROJECT_ROOT

# Directory commands run in (default: the directory holding x's Cargo.toml)
# project_root = "~/src/myproject"

# Cargo executable
# cargo = "cargo"

# Variables set for every spawned command (merged over the inherited environment)
[env]
# RUSTFLAGS = "-D warnings"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
