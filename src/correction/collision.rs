//! Tier-2 gating and collision resolution.
//!
//! [`CollisionDetector`] is a stateless policy evaluator.  It answers two
//! questions for the correction phase:
//!
//! * may this tier-2 mapping be applied under this [`Classification`]?
//! * which single mapping, if any, should win when several entities share a
//!   phonetic form?
//!
//! Resolution order for a collision:
//!
//! ```text
//! exactly one tier-1 candidate       → that candidate
//! more than one tier-1 candidate     → none (registry data problem, warned)
//! exactly one qualifying tier-2      → that candidate
//! zero or several qualifying tier-2  → none
//! ```
//!
//! The capitalization hint is advisory: it can only turn an undecided case
//! into a confident "no", never into a "yes".

use serde::Serialize;

use crate::config::{check_confidence, ConfigError, EngineConfig};

use super::mapping::{Classification, Collision, SoundsLikeMapping, Tier};
use super::replacer::TextReplacer;

/// Confidence reported for tier-2 decisions when the classifier gave none.
const UNKNOWN_CONFIDENCE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub tier2_min_confidence: f64,
    pub use_capitalization_hints: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            tier2_min_confidence: 0.6,
            use_capitalization_hints: true,
        }
    }
}

// ---------------------------------------------------------------------------
// CapitalizationHint
// ---------------------------------------------------------------------------

/// What the casing of a match in running text suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapitalizationHint {
    /// Capitalized mid-sentence.
    ProperNoun,
    /// Written in lowercase.
    CommonTerm,
    /// Absent, sentence-initial, or hints disabled.
    Unknown,
}

fn is_sentence_start(prefix: &str) -> bool {
    let trimmed = prefix.trim_end();
    if trimmed.is_empty() {
        return true;
    }
    trimmed.len() < prefix.len() && trimmed.ends_with(&['.', '!', '?'][..])
}

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// Everything needed to decide one ambiguous token.
#[derive(Debug, Clone)]
pub struct DecisionContext<'a> {
    pub classification: &'a Classification,
    pub sounds_like: &'a str,
    pub available_mappings: Vec<&'a SoundsLikeMapping>,
    pub surrounding_text: Option<&'a str>,
}

/// Outcome of [`CollisionDetector::decide_replacement`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementDecision {
    pub should_replace: bool,
    pub mapping: Option<SoundsLikeMapping>,
    pub reason: String,
    pub confidence: f64,
}

impl ReplacementDecision {
    fn replace(mapping: &SoundsLikeMapping, reason: &str, confidence: f64) -> Self {
        Self {
            should_replace: true,
            mapping: Some(mapping.clone()),
            reason: reason.to_string(),
            confidence,
        }
    }

    fn decline(reason: &str, confidence: f64) -> Self {
        Self {
            should_replace: false,
            mapping: None,
            reason: reason.to_string(),
            confidence,
        }
    }
}

// ---------------------------------------------------------------------------
// CollisionDetector
// ---------------------------------------------------------------------------

/// Policy evaluator for tier-2 mappings and collisions.
///
/// ```rust
/// use sounds_like_correct::correction::{Classification, CollisionDetector, DetectorOptions};
///
/// let detector = CollisionDetector::new(DetectorOptions::default()).unwrap();
/// assert!(CollisionDetector::new(DetectorOptions {
///     tier2_min_confidence: 1.2,
///     ..DetectorOptions::default()
/// })
/// .is_err());
/// # let _ = (detector, Classification::default());
/// ```
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    options: DetectorOptions,
    matcher: TextReplacer,
}

impl CollisionDetector {
    /// Build a detector; an out-of-range threshold is a configuration error.
    pub fn new(options: DetectorOptions) -> Result<Self, ConfigError> {
        check_confidence(options.tier2_min_confidence)?;
        Ok(Self {
            options,
            matcher: TextReplacer::default(),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        Self::new(DetectorOptions {
            tier2_min_confidence: config.tier2_min_confidence,
            use_capitalization_hints: config.use_capitalization_hints,
        })
    }

    pub fn options(&self) -> DetectorOptions {
        self.options
    }

    // -----------------------------------------------------------------------
    // Gating
    // -----------------------------------------------------------------------

    /// Whether a tier-2 `mapping` may be applied under `classification`.
    pub fn should_apply_tier2(
        &self,
        mapping: &SoundsLikeMapping,
        classification: &Classification,
    ) -> bool {
        if mapping.tier != Tier::Two {
            return false;
        }

        let threshold = mapping
            .min_confidence
            .unwrap_or(self.options.tier2_min_confidence);
        match classification.confidence {
            Some(confidence) if confidence >= threshold => {}
            _ => return false,
        }

        match &mapping.scoped_to_projects {
            Some(projects) if !projects.is_empty() => classification
                .project
                .as_ref()
                .is_some_and(|p| projects.contains(p)),
            _ => true,
        }
    }

    // -----------------------------------------------------------------------
    // Collision resolution
    // -----------------------------------------------------------------------

    /// Pick at most one mapping from a collision.
    pub fn resolve_collision<'a>(
        &self,
        collision: &'a Collision,
        classification: &Classification,
    ) -> Option<&'a SoundsLikeMapping> {
        let candidates: Vec<&SoundsLikeMapping> = collision.mappings.iter().collect();
        self.resolve_candidates(&collision.sounds_like, &candidates, classification)
    }

    fn resolve_candidates<'a>(
        &self,
        sounds_like: &str,
        candidates: &[&'a SoundsLikeMapping],
        classification: &Classification,
    ) -> Option<&'a SoundsLikeMapping> {
        let tier1: Vec<&SoundsLikeMapping> = candidates
            .iter()
            .copied()
            .filter(|m| m.tier == Tier::One)
            .collect();

        match tier1.as_slice() {
            [only] => return Some(*only),
            [] => {}
            several => {
                let ids: Vec<&str> = several.iter().map(|m| m.entity_id.as_str()).collect();
                log::warn!(
                    "collision: {} tier-1 mappings share {sounds_like:?} ({}); \
                     registry needs disambiguation",
                    several.len(),
                    ids.join(", ")
                );
                return None;
            }
        }

        let mut qualifying = candidates
            .iter()
            .copied()
            .filter(|m| m.tier == Tier::Two && self.should_apply_tier2(m, classification));
        match (qualifying.next(), qualifying.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Capitalization hint
    // -----------------------------------------------------------------------

    /// Inspect how `sounds_like` is cased at its first word-bounded
    /// occurrence in `surrounding_text`.
    pub fn detect_capitalization_hint(
        &self,
        sounds_like: &str,
        surrounding_text: &str,
    ) -> CapitalizationHint {
        if !self.options.use_capitalization_hints {
            return CapitalizationHint::Unknown;
        }

        let re = match self.matcher.build_pattern(sounds_like) {
            Ok(re) => re,
            Err(e) => {
                log::debug!("collision: no capitalization hint ({e})");
                return CapitalizationHint::Unknown;
            }
        };
        let Some(found) = self
            .matcher
            .find_matches(&re, surrounding_text)
            .into_iter()
            .next()
        else {
            return CapitalizationHint::Unknown;
        };

        let matched = found.as_str();
        if matched == matched.to_lowercase() {
            CapitalizationHint::CommonTerm
        } else if is_sentence_start(&surrounding_text[..found.start()]) {
            CapitalizationHint::Unknown
        } else {
            CapitalizationHint::ProperNoun
        }
    }

    // -----------------------------------------------------------------------
    // Full decision
    // -----------------------------------------------------------------------

    /// Decide whether the token `context.sounds_like` should be replaced.
    pub fn decide_replacement(&self, context: &DecisionContext<'_>) -> ReplacementDecision {
        let classification = context.classification;
        let tier2_confidence = classification.confidence.unwrap_or(UNKNOWN_CONFIDENCE);

        match context.available_mappings.as_slice() {
            [] => ReplacementDecision::decline("no mappings available", 1.0),

            [mapping] => match mapping.tier {
                Tier::One => ReplacementDecision::replace(mapping, "tier-1 mapping", 1.0),
                Tier::Two if self.should_apply_tier2(mapping, classification) => {
                    ReplacementDecision::replace(
                        mapping,
                        "tier-2 mapping matched project and confidence",
                        tier2_confidence,
                    )
                }
                Tier::Two => ReplacementDecision::decline(
                    "tier-2 mapping did not meet project or confidence requirements",
                    tier2_confidence,
                ),
                Tier::Three => ReplacementDecision::decline(
                    "tier-3 mapping is never applied automatically",
                    1.0,
                ),
            },

            candidates => {
                if let Some(mapping) =
                    self.resolve_candidates(context.sounds_like, candidates, classification)
                {
                    let confidence = if mapping.tier == Tier::One {
                        1.0
                    } else {
                        tier2_confidence
                    };
                    return ReplacementDecision::replace(mapping, "collision resolved", confidence);
                }

                let hint = context
                    .surrounding_text
                    .map(|text| self.detect_capitalization_hint(context.sounds_like, text));
                if hint == Some(CapitalizationHint::CommonTerm) {
                    ReplacementDecision::decline(
                        "collision unresolved; lowercase usage suggests a common term",
                        0.7,
                    )
                } else {
                    ReplacementDecision::decline("collision could not be resolved", 0.5)
                }
            }
        }
    }
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self {
            options: DetectorOptions::default(),
            matcher: TextReplacer::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
