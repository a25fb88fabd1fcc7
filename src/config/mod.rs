//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), `EngineConfig` for the
//! correction engine, `RegistryConfig` for entity sources, `AppPaths` for
//! cross-platform directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    check_confidence, AppConfig, ConfigError, EngineConfig, RegistryConfig, DEFAULT_COMMON_TERMS,
    DEFAULT_GENERIC_TERMS,
};
