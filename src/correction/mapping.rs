//! Core value types shared by the correction engine.
//!
//! * [`SoundsLikeMapping`] — one phonetic correction candidate.
//! * [`Collision`] — two or more mappings sharing a phonetic form.
//! * [`Classification`] — upstream routing context used for tier-2 gating.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::EntityType;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Risk tier governing how a mapping may be applied.
///
/// | Tier    | Policy                                             |
/// |---------|----------------------------------------------------|
/// | `One`   | Always applied                                     |
/// | `Two`   | Applied only with matching project + confidence    |
/// | `Three` | Never applied automatically                        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    One,
    Two,
    Three,
}

impl Tier {
    pub fn as_u8(self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
            Tier::Three => 3,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.as_u8())
    }
}

// ---------------------------------------------------------------------------
// CollisionRisk
// ---------------------------------------------------------------------------

/// Informational risk label derived alongside the [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionRisk {
    None,
    Low,
    Medium,
    High,
}

// ---------------------------------------------------------------------------
// SoundsLikeMapping
// ---------------------------------------------------------------------------

/// A phonetic variant paired with the canonical text of its owning entity.
///
/// `tier` and `collision_risk` are only meaningful once the mapping has
/// passed through [`SoundsLikeDatabase`](crate::correction::SoundsLikeDatabase);
/// the database is the sole place where they are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundsLikeMapping {
    /// Lowercased phrase as typically mis-transcribed.
    pub sounds_like: String,
    /// Canonical replacement text.
    pub correct_text: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    /// When set, restricts application to these project ids.
    pub scoped_to_projects: Option<Vec<String>>,
    pub collision_risk: CollisionRisk,
    pub tier: Tier,
    /// Confidence required for tier-2 application.  `None` falls back to the
    /// detector-wide threshold.
    pub min_confidence: Option<f64>,
}

impl SoundsLikeMapping {
    /// Build an unclassified mapping (tier 1, no risk) with `sounds_like`
    /// normalized to lowercase.
    pub fn new(
        sounds_like: &str,
        correct_text: impl Into<String>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            sounds_like: sounds_like.trim().to_lowercase(),
            correct_text: correct_text.into(),
            entity_type,
            entity_id: entity_id.into(),
            scoped_to_projects: None,
            collision_risk: CollisionRisk::None,
            tier: Tier::One,
            min_confidence: None,
        }
    }

    /// `true` when the mapping is restricted to a non-empty set of projects.
    pub fn is_project_scoped(&self) -> bool {
        self.scoped_to_projects
            .as_ref()
            .is_some_and(|projects| !projects.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

/// Two or more mappings that share the same normalized `sounds_like`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collision {
    pub sounds_like: String,
    pub mappings: Vec<SoundsLikeMapping>,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Routing decision supplied by the upstream classifier.
///
/// Only `project` and `confidence` drive correction; anything else the
/// classifier wants to pass along lives in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub project: Option<String>,
    pub confidence: Option<f64>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Classification {
    pub fn new(project: Option<&str>, confidence: Option<f64>) -> Self {
        Self {
            project: project.map(str::to_string),
            confidence,
            extra: BTreeMap::new(),
        }
    }

    /// Classification for `project` at the given confidence.
    pub fn for_project(project: &str, confidence: f64) -> Self {
        Self::new(Some(project), Some(confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mapping_is_lowercased_and_trimmed() {
        let m = SoundsLikeMapping::new("  Pro Tocol ", "Protokoll", EntityType::Project, "protokoll");
        assert_eq!(m.sounds_like, "pro tocol");
        assert_eq!(m.tier, Tier::One);
        assert_eq!(m.collision_risk, CollisionRisk::None);
        assert!(!m.is_project_scoped());
    }

    #[test]
    fn empty_scope_list_is_not_scoped() {
        let mut m = SoundsLikeMapping::new("x", "X", EntityType::Term, "x");
        m.scoped_to_projects = Some(Vec::new());
        assert!(!m.is_project_scoped());
        m.scoped_to_projects = Some(vec!["alpha".into()]);
        assert!(m.is_project_scoped());
    }

    #[test]
    fn classification_keeps_extra_fields() {
        let json = r#"{"project":"alpha","confidence":0.8,"destination":"notes/alpha"}"#;
        let c: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(c.project.as_deref(), Some("alpha"));
        assert_eq!(c.confidence, Some(0.8));
        assert_eq!(c.extra["destination"], "notes/alpha");
    }

    #[test]
    fn tier_display() {
        assert_eq!(Tier::Two.to_string(), "tier 2");
        assert_eq!(Tier::Three.as_u8(), 3);
    }
}
