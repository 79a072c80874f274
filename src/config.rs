//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/tsolve/tsolve.toml`
//! 3. Local config: `.tsolve.toml` in the directory of the tree file
//! 4. Environment variables: `TSOLVE_*` prefix, `__` between section and key

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::UnlockRule;

/// Upper bound on stored entries before enumeration gives up.
pub const DEFAULT_MAX_CONFIGURATIONS: usize = 500_000_000;
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Enumeration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SolverConfig {
    /// When a prerequisite counts as satisfied
    pub unlock_rule: UnlockRule,
    /// Safety guard on the number of stored entries
    pub max_configurations: usize,
    /// Worker threads; 0 uses the global rayon pool
    pub threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            unlock_rule: UnlockRule::default(),
            max_configurations: DEFAULT_MAX_CONFIGURATIONS,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub page_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Raw solver section; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSolverConfig {
    pub unlock_rule: Option<UnlockRule>,
    pub max_configurations: Option<usize>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub page_size: Option<usize>,
}

/// Raw settings for intermediate parsing of one config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub solver: RawSolverConfig,
    pub output: RawOutputConfig,
}

/// Unified configuration for tsolve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

/// Get the XDG config directory for tsolve.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tsolve").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("tsolve.toml"))
}

/// Get the path to the local config file in a tree directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".tsolve.toml")
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

/// Environment source for `TSOLVE_SECTION__KEY` variables.
pub fn env_source() -> Environment {
    Environment::with_prefix("TSOLVE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Overlay a parsed config file: specified values win.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            solver: SolverConfig {
                unlock_rule: overlay.solver.unlock_rule.unwrap_or(self.solver.unlock_rule),
                max_configurations: overlay
                    .solver
                    .max_configurations
                    .unwrap_or(self.solver.max_configurations),
                threads: overlay.solver.threads.unwrap_or(self.solver.threads),
            },
            output: OutputConfig {
                page_size: overlay.output.page_size.unwrap_or(self.output.page_size),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory searched for a local `.tsolve.toml`, usually
    ///   the directory of the tree file
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current.apply_env(env_source())
    }

    /// Apply environment variables as explicit overrides.
    pub fn apply_env(mut self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("solver.unlock_rule") {
            self.solver.unlock_rule = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Some(val) = optional(config.get::<usize>("solver.max_configurations"))? {
            self.solver.max_configurations = val;
        }
        if let Some(val) = optional(config.get::<usize>("solver.threads"))? {
            self.solver.threads = val;
        }
        if let Some(val) = optional(config.get::<usize>("output.page_size"))? {
            self.output.page_size = val;
        }
        Ok(self)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        format!(
            r#"# tsolve configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/tsolve/tsolve.toml
#   Local:  .tsolve.toml next to the tree file
#   Env:    TSOLVE_<SECTION>__<KEY>, e.g. TSOLVE_SOLVER__THREADS=4

[solver]
# When a prerequisite unlocks its children: "any-rank" or "maxed"
# unlock_rule = "any-rank"

# Stop enumerating after this many stored configurations
# max_configurations = {DEFAULT_MAX_CONFIGURATIONS}

# Worker threads (0 = one per core)
# threads = 0

[output]
# Entries per page
# page_size = {DEFAULT_PAGE_SIZE}
"#
        )
    }
}

/// Missing keys are fine; present but malformed ones are not.
fn optional<T>(result: Result<T, ConfigError>) -> Result<Option<T>, ApplicationError> {
    match result {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_uses_compiled_values() {
        let settings = Settings::default();
        assert_eq!(settings.solver.unlock_rule, UnlockRule::AnyRank);
        assert_eq!(settings.solver.max_configurations, DEFAULT_MAX_CONFIGURATIONS);
        assert_eq!(settings.solver.threads, 0);
        assert_eq!(settings.output.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let raw: RawSettings = toml::from_str("[solver]\nthreads = 3\n").unwrap();

        let merged = Settings::default().merge_with(&raw);

        assert_eq!(merged.solver.threads, 3);
        assert_eq!(merged.solver.unlock_rule, UnlockRule::AnyRank);
        assert_eq!(merged.output.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.solver.threads.is_none());
    }

    #[test]
    fn given_settings_when_serialized_then_round_trips() {
        let mut settings = Settings::default();
        settings.solver.unlock_rule = UnlockRule::Maxed;

        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();

        assert_eq!(parsed, settings);
    }
}
