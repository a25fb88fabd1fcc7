//! Sounds-like correction of entity names in transcribed text.
//!
//! Speech-to-text output routinely mangles the names of people, projects and
//! domain terms.  This crate reads phonetic variants (`sounds_like`) from an
//! entity registry and rewrites them to the canonical spelling, applying a
//! correction only when it is safe:
//!
//! * tier 1 — unique, uncommon variants; always applied,
//! * tier 2 — common words or variants shared by several entities; applied
//!   only when the upstream classifier names a matching project with enough
//!   confidence,
//! * tier 3 — generic words; never applied.
//!
//! ```text
//! registry ──▶ SoundsLikeDatabase (once) ──▶ CorrectionPhase (per document)
//!                                              ├─ CollisionDetector
//!                                              └─ TextReplacer
//! ```

pub mod config;
pub mod correction;
pub mod registry;
