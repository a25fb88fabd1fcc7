//! One correction pass over one document.
//!
//! # Pass flow
//!
//! ```text
//! CorrectionContext::database()        (memoized load)
//!   └─▶ tier 1: apply every mapping                      [always]
//!   └─▶ tier 2: project bucket ∪ generic bucket          [only with a project]
//!         ├─ should_apply_tier2 filter
//!         ├─ survivors sharing a sounds_like → resolve_collision
//!         └─ apply
//!   └─▶ SimpleReplaceStats → optional StatsSink
//! ```
//!
//! A pass never fails: bad mappings are skipped by the replacer and an
//! unreadable registry yields an empty catalog.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::{ConfigError, EngineConfig};

use super::collision::CollisionDetector;
use super::context::CorrectionContext;
use super::database::SoundsLikeDatabase;
use super::mapping::{Classification, SoundsLikeMapping, Tier};
use super::replacer::{ReplacementResult, ReplacerOptions, TextReplacer};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-mapping detail recorded for a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMapping {
    pub sounds_like: String,
    pub correct_text: String,
    pub tier: u8,
    pub occurrences: usize,
}

/// Statistics for one correction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimpleReplaceStats {
    pub tier1_replacements: usize,
    pub tier2_replacements: usize,
    pub total_replacements: usize,
    pub tier1_mappings_considered: usize,
    pub tier2_mappings_considered: usize,
    pub project_context: Option<String>,
    pub classification_confidence: Option<f64>,
    pub processing_time_ms: f64,
    pub applied_mappings: Vec<AppliedMapping>,
}

/// Result of [`CorrectionPhase::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionOutcome {
    pub text: String,
    pub stats: SimpleReplaceStats,
    pub replacements_made: bool,
}

fn applied_details(result: &ReplacementResult, tier: Tier) -> Vec<AppliedMapping> {
    result
        .applied_mappings
        .iter()
        .map(|m| AppliedMapping {
            sounds_like: m.sounds_like.clone(),
            correct_text: m.correct_text.clone(),
            tier: tier.as_u8(),
            occurrences: result
                .occurrences
                .iter()
                .filter(|o| same_mapping(&o.mapping, m))
                .count(),
        })
        .collect()
}

fn same_mapping(a: &SoundsLikeMapping, b: &SoundsLikeMapping) -> bool {
    a.entity_type == b.entity_type && a.entity_id == b.entity_id && a.sounds_like == b.sounds_like
}

// ---------------------------------------------------------------------------
// StatsSink
// ---------------------------------------------------------------------------

/// Receives the stats of every pass, e.g. for debugging or telemetry.
pub trait StatsSink: Send + Sync {
    fn record(&self, input_len: usize, stats: &SimpleReplaceStats);
}

/// Writes one debug log line per pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl StatsSink for LogSink {
    fn record(&self, input_len: usize, stats: &SimpleReplaceStats) {
        log::debug!(
            "correction: {} replacements (tier1={}, tier2={}) over {} bytes in {:.2} ms, project={:?}",
            stats.total_replacements,
            stats.tier1_replacements,
            stats.tier2_replacements,
            input_len,
            stats.processing_time_ms,
            stats.project_context
        );
    }
}

// ---------------------------------------------------------------------------
// CorrectionPhase
// ---------------------------------------------------------------------------

/// Applies the catalog to documents.
///
/// ```rust
/// use sounds_like_correct::config::EngineConfig;
/// use sounds_like_correct::correction::{
///     Classification, CorrectionPhase, DatabaseOptions, SoundsLikeDatabase,
/// };
/// use sounds_like_correct::registry::RegistryEntity;
///
/// let db = SoundsLikeDatabase::from_entities(
///     vec![RegistryEntity::project("protokoll", "Protokoll", &["protocol"])],
///     DatabaseOptions::default(),
/// );
/// let phase = CorrectionPhase::new(&EngineConfig::default()).unwrap();
/// let out = phase.run_with(&db, "the protocol demo", &Classification::default());
/// assert_eq!(out.text, "the Protokoll demo");
/// ```
pub struct CorrectionPhase {
    replacer: TextReplacer,
    detector: CollisionDetector,
    sink: Option<Arc<dyn StatsSink>>,
}

impl CorrectionPhase {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            replacer: TextReplacer::new(ReplacerOptions {
                preserve_case: config.preserve_case,
                use_word_boundaries: config.use_word_boundaries,
                case_insensitive: config.case_insensitive,
                ..ReplacerOptions::default()
            }),
            detector: CollisionDetector::from_config(config)?,
            sink: None,
        })
    }

    /// Report every pass to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    /// Run one pass, loading the catalog through `context` if needed.
    pub async fn run(
        &self,
        context: &CorrectionContext,
        text: &str,
        classification: &Classification,
    ) -> CorrectionOutcome {
        let db = context.database().await;
        self.run_with(&db, text, classification)
    }

    /// Run one pass against an already-loaded catalog.
    pub fn run_with(
        &self,
        db: &SoundsLikeDatabase,
        text: &str,
        classification: &Classification,
    ) -> CorrectionOutcome {
        let started = Instant::now();
        let mut stats = SimpleReplaceStats {
            project_context: classification.project.clone(),
            classification_confidence: classification.confidence,
            ..SimpleReplaceStats::default()
        };

        // Tier 1
        let tier1 = db.get_tier1_mappings();
        stats.tier1_mappings_considered = tier1.len();
        let result = self.replacer.apply_replacements(text, tier1);
        stats.tier1_replacements = result.count;
        stats.applied_mappings = applied_details(&result, Tier::One);
        let mut current = result.text;

        // Tier 2
        if let Some(project) = classification.project.as_deref() {
            let candidates = db.get_tier2_mappings_for_project(project);
            stats.tier2_mappings_considered = candidates.len();

            let gated: Vec<&SoundsLikeMapping> = candidates
                .into_iter()
                .filter(|m| self.detector.should_apply_tier2(m, classification))
                .collect();
            let selected = self.without_unresolved_collisions(db, gated, classification);

            let result = self.replacer.apply_replacements(&current, &selected);
            stats.tier2_replacements = result.count;
            stats.applied_mappings.extend(applied_details(&result, Tier::Two));
            current = result.text;
        } else {
            log::debug!("correction: no project context, skipping tier 2");
        }

        stats.total_replacements = stats.tier1_replacements + stats.tier2_replacements;
        stats.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Some(sink) = &self.sink {
            sink.record(text.len(), &stats);
        }

        CorrectionOutcome {
            text: current,
            replacements_made: stats.total_replacements > 0,
            stats,
        }
    }

    /// Keep gated mappings whose `sounds_like` is unique among them; where
    /// several survive for one `sounds_like`, keep only the collision winner.
    fn without_unresolved_collisions(
        &self,
        db: &SoundsLikeDatabase,
        gated: Vec<&SoundsLikeMapping>,
        classification: &Classification,
    ) -> Vec<SoundsLikeMapping> {
        let mut per_form: HashMap<&str, usize> = HashMap::new();
        for m in gated.iter().copied() {
            *per_form.entry(m.sounds_like.as_str()).or_default() += 1;
        }

        let mut winners: HashMap<&str, Option<&SoundsLikeMapping>> = HashMap::new();
        let mut selected = Vec::with_capacity(gated.len());
        for m in gated.iter().copied() {
            if per_form[m.sounds_like.as_str()] == 1 {
                selected.push(m.clone());
                continue;
            }
            let winner = *winners.entry(m.sounds_like.as_str()).or_insert_with(|| {
                let resolved = db
                    .get_collision(&m.sounds_like)
                    .and_then(|c| self.detector.resolve_collision(c, classification));
                if resolved.is_none() {
                    log::debug!(
                        "correction: {:?} has several qualifying tier-2 mappings, skipping",
                        m.sounds_like
                    );
                }
                resolved
            });
            if winner.is_some_and(|w| same_mapping(w, m)) {
                selected.push(m.clone());
            }
        }
        selected
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
