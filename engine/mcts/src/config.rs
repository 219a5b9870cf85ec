//! Search configuration.
//!
//! Limits and tuning knobs for a search call. Values can be built in code
//! with the builder methods, or loaded from the `[mcts]` table of a TOML
//! file with environment variable overrides.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`MCTS_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults
//!
//! ```text
//! [mcts]
//! duration_ms = 250
//! max_depth = 0          # 0 = unlimited
//! max_iterations = 5000  # 0 = bounded by duration only
//! exploration = 1.4142135623730951
//! max_rollout_moves = 0  # 0 = play until the game ends
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &["config.toml", "../config.toml"];

/// Errors that can occur while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for Monte Carlo Tree Search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Wall clock budget per search in milliseconds. At least one iteration
    /// always runs, even with a zero budget.
    pub duration_ms: u64,

    /// Maximum depth at which nodes are still expanded (0 = unlimited).
    pub max_depth: u32,

    /// Maximum number of iterations per search (0 = bounded by duration only).
    pub max_iterations: u32,

    /// Exploration constant of the UCB1 formula.
    pub exploration: f64,

    /// Rollouts longer than this many moves are scored as a draw
    /// (0 = play until the game ends).
    pub max_rollout_moves: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1_000,
            max_depth: 0,
            max_iterations: 0,
            exploration: std::f64::consts::SQRT_2,
            max_rollout_moves: 0,
        }
    }
}

/// Helper to match the `[mcts]` table of a shared config file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    mcts: SearchConfig,
}

impl SearchConfig {
    /// Create a fast, iteration-bounded config for testing.
    pub fn for_testing() -> Self {
        Self {
            duration_ms: 60_000,
            max_iterations: 200,
            ..Self::default()
        }
    }

    /// Time budget as a Duration.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Builder pattern: set time budget.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Builder pattern: set maximum expansion depth.
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder pattern: set iteration budget.
    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    /// Builder pattern: set UCB1 exploration constant.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set rollout length cap.
    pub fn with_max_rollout_moves(mut self, n: u32) -> Self {
        self.max_rollout_moves = n;
        self
    }

    /// Reject values the search cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_exploration(self.exploration)
    }

    /// Parse the `[mcts]` table from TOML text. Missing keys keep defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        file.mcts.validate()?;
        Ok(file.mcts)
    }
}

/// UCB1 exploration constants must be finite and non-negative.
pub(crate) fn validate_exploration(c: f64) -> Result<(), ConfigError> {
    if !c.is_finite() || c < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "exploration must be a finite non-negative number, got {}",
            c
        )));
    }
    Ok(())
}

/// Load configuration from a specific path, then apply env overrides.
pub fn load_from_path(path: &Path) -> Result<SearchConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = apply_env_overrides(SearchConfig::from_toml_str(&content)?);
    config.validate()?;
    Ok(config)
}

/// Load the search configuration.
///
/// Searches `MCTS_CONFIG` first, then [`CONFIG_SEARCH_PATHS`]. Unreadable or
/// invalid files fall back to defaults with a warning. Environment overrides
/// are applied in every case.
pub fn load_config() -> SearchConfig {
    let explicit = std::env::var("MCTS_CONFIG").ok().map(PathBuf::from);
    if let Some(path) = &explicit {
        if !path.exists() {
            warn!(
                "MCTS_CONFIG={} not found, searching defaults",
                path.display()
            );
        }
    }

    let candidates = explicit
        .into_iter()
        .chain(CONFIG_SEARCH_PATHS.iter().map(PathBuf::from));

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_from_path(&path) {
            Ok(config) => {
                info!("Loaded search config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                return defaults_with_env();
            }
        }
    }

    debug!("No config.toml found, using built-in defaults");
    defaults_with_env()
}

fn defaults_with_env() -> SearchConfig {
    let config = apply_env_overrides(SearchConfig::default());
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("{}, ignoring environment overrides", e);
            SearchConfig::default()
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    ($config:expr, $field:ident, $key:expr) => {
        if let Ok(raw) = std::env::var($key) {
            match raw.parse() {
                Ok(v) => $config.$field = v,
                Err(_) => warn!("Ignoring {}={}: not a valid value", $key, raw),
            }
        }
    };
}

/// Apply environment variable overrides (`MCTS_<KEY>`) to a configuration.
pub fn apply_env_overrides(mut config: SearchConfig) -> SearchConfig {
    env_override!(config, duration_ms, "MCTS_DURATION_MS");
    env_override!(config, max_depth, "MCTS_MAX_DEPTH");
    env_override!(config, max_iterations, "MCTS_MAX_ITERATIONS");
    env_override!(config, exploration, "MCTS_EXPLORATION");
    env_override!(config, max_rollout_moves, "MCTS_MAX_ROLLOUT_MOVES");
    config
}
