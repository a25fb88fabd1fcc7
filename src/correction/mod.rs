//! Tiered sounds-like correction engine.
//!
//! This module provides:
//! * [`SoundsLikeDatabase`] — the classified, partitioned mapping catalog.
//! * [`CollisionDetector`] — tier-2 gating and collision resolution.
//! * [`TextReplacer`] — boundary-safe, case-adjusting literal replacement.
//! * [`CorrectionContext`] — process-scoped, load-once owner of the catalog.
//! * [`CorrectionPhase`] — one correction pass over one document.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sounds_like_correct::config::AppConfig;
//! use sounds_like_correct::correction::{Classification, CorrectionContext, CorrectionPhase};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap_or_default();
//!
//!     // Created once per process; the registry is read on first use.
//!     let context = Arc::new(CorrectionContext::from_config(&config).unwrap());
//!     let phase = CorrectionPhase::new(&config.engine).unwrap();
//!
//!     let classification = Classification::for_project("alpha", 0.82);
//!     let outcome = phase
//!         .run(&context, "notes from the protocol sync", &classification)
//!         .await;
//!     println!("{} ({} replacements)", outcome.text, outcome.stats.total_replacements);
//! }
//! ```

pub mod collision;
pub mod context;
pub mod database;
pub mod mapping;
pub mod phase;
pub mod replacer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use collision::{
    CapitalizationHint, CollisionDetector, DecisionContext, DetectorOptions, ReplacementDecision,
};
pub use context::CorrectionContext;
pub use database::{DatabaseOptions, DatabaseSummary, SoundsLikeDatabase, GENERIC_BUCKET};
pub use mapping::{Classification, Collision, CollisionRisk, SoundsLikeMapping, Tier};
pub use phase::{
    AppliedMapping, CorrectionOutcome, CorrectionPhase, LogSink, SimpleReplaceStats, StatsSink,
};
pub use replacer::{
    ReplaceError, ReplacementOccurrence, ReplacementResult, ReplacerOptions, TextReplacer,
};
