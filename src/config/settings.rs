//! Engine settings structs, defaults, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Invalid configuration detected at construction time.
///
/// These are programmer/config errors and are fatal; runtime data problems
/// never surface as a `ConfigError`.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tier2_min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("term lists overlap: {0:?} is both common and generic")]
    OverlappingTerms(String),
}

/// Validate a confidence threshold.
pub fn check_confidence(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ConfidenceOutOfRange(value))
    }
}

// ---------------------------------------------------------------------------
// Built-in term lists
// ---------------------------------------------------------------------------

/// Everyday words that also name entities often enough that a bare match is
/// not proof of an entity reference.  Forces tier ≥ 2.
pub const DEFAULT_COMMON_TERMS: &[&str] = &[
    "bill", "will", "mark", "grace", "joy", "rose", "frank", "jack", "apple", "amazon", "slack",
    "notion", "linear", "signal", "atlas", "phoenix", "mercury", "nova",
];

/// Words so generic they are never corrected automatically.  Forces tier 3.
pub const DEFAULT_GENERIC_TERMS: &[&str] = &[
    "meeting", "update", "call", "project", "team", "sync", "review", "notes", "today",
    "tomorrow", "plan", "status", "work", "thing", "stuff",
];

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Settings for the tiered correction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Confidence (0.0 – 1.0) required before a tier-2 mapping is applied
    /// when the mapping carries no threshold of its own.
    pub tier2_min_confidence: f64,
    /// Adjust replacement casing to the matched text.  Off by default so the
    /// canonical spelling of entity names is written out verbatim.
    pub preserve_case: bool,
    /// Only match whole words.
    pub use_word_boundaries: bool,
    /// Match regardless of case.
    pub case_insensitive: bool,
    /// Group mappings sharing a phonetic form and demote them to tier 2.
    pub detect_collisions: bool,
    /// Let the capitalization of the surrounding text veto undecided
    /// collisions.
    pub use_capitalization_hints: bool,
    /// Terms forced to tier ≥ 2.
    pub common_terms: Vec<String>,
    /// Terms forced to tier 3.
    pub generic_terms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tier2_min_confidence: 0.6,
            preserve_case: false,
            use_word_boundaries: true,
            case_insensitive: true,
            detect_collisions: true,
            use_capitalization_hints: true,
            common_terms: to_strings(DEFAULT_COMMON_TERMS),
            generic_terms: to_strings(DEFAULT_GENERIC_TERMS),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_confidence(self.tier2_min_confidence)?;

        let generic = self.generic_term_set();
        if let Some(term) = self
            .common_term_set()
            .into_iter()
            .find(|t| generic.contains(t))
        {
            return Err(ConfigError::OverlappingTerms(term));
        }
        Ok(())
    }

    /// Lowercased common-term set.
    pub fn common_term_set(&self) -> HashSet<String> {
        normalize_terms(&self.common_terms)
    }

    /// Lowercased generic-term set.
    pub fn generic_term_set(&self) -> HashSet<String> {
        normalize_terms(&self.generic_terms)
    }
}

fn normalize_terms(terms: &[String]) -> HashSet<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Where entity records are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry directories, read in order.
    pub sources: Vec<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sources: vec![AppPaths::new().registry_dir],
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use sounds_like_correct::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.engine.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Correction engine settings.
    pub engine: EngineConfig,
    /// Registry source settings.
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
