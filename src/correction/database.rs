//! The sounds-like mapping catalog.
//!
//! [`SoundsLikeDatabase`] is built once from the entity registry and is
//! immutable afterwards.  Building it:
//!
//! 1. emits one mapping per phonetic variant of every active entity,
//! 2. groups mappings by lowercased `sounds_like` into [`Collision`]s,
//! 3. classifies every mapping into a [`Tier`] and [`CollisionRisk`],
//! 4. partitions mappings for lookup: a tier-1 list, a tier-2 map keyed by
//!    project id (plus the [`GENERIC_BUCKET`]), and a tier-3 list.
//!
//! Tier precedence (first match wins):
//!
//! | Condition                              | Tier |
//! |----------------------------------------|------|
//! | `sounds_like` is a generic term        | 3    |
//! | common term, or shares a `sounds_like` | 2    |
//! | otherwise                              | 1    |

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ConfigError, EngineConfig};
use crate::registry::{EntityType, RegistryEntity, RegistrySource};

use super::mapping::{Collision, CollisionRisk, SoundsLikeMapping, Tier};

/// Tier-2 bucket for mappings that are not scoped to a project.
pub const GENERIC_BUCKET: &str = "_generic";

// ---------------------------------------------------------------------------
// DatabaseOptions
// ---------------------------------------------------------------------------

/// Build-time settings for [`SoundsLikeDatabase`].
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Threshold stamped onto tier-2 project mappings that carry none.
    pub tier2_min_confidence: f64,
    pub detect_collisions: bool,
    pub common_terms: HashSet<String>,
    pub generic_terms: HashSet<String>,
}

impl DatabaseOptions {
    /// Derive options from engine config, validating it first.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tier2_min_confidence: config.tier2_min_confidence,
            detect_collisions: config.detect_collisions,
            common_terms: config.common_term_set(),
            generic_terms: config.generic_term_set(),
        })
    }

    /// Options with the given term lists and default everything else.
    pub fn with_terms(common: &[&str], generic: &[&str]) -> Self {
        Self {
            common_terms: common.iter().map(|t| t.to_lowercase()).collect(),
            generic_terms: generic.iter().map(|t| t.to_lowercase()).collect(),
            ..Self::default()
        }
    }
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            tier2_min_confidence: config.tier2_min_confidence,
            detect_collisions: config.detect_collisions,
            common_terms: config.common_term_set(),
            generic_terms: config.generic_term_set(),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification helpers
// ---------------------------------------------------------------------------

/// Tier for a normalized `sounds_like` given the global collision set.
pub fn classify_tier(
    sounds_like: &str,
    has_collision: bool,
    common_terms: &HashSet<String>,
    generic_terms: &HashSet<String>,
) -> Tier {
    if generic_terms.contains(sounds_like) {
        Tier::Three
    } else if common_terms.contains(sounds_like) || has_collision {
        Tier::Two
    } else {
        Tier::One
    }
}

/// Commonness only raises the risk of tier-2 mappings; a generic term that is
/// also listed as common stays tier 3 and is never applied.
fn collision_risk(tier: Tier, has_collision: bool, is_common: bool) -> CollisionRisk {
    match tier {
        _ if has_collision => CollisionRisk::High,
        Tier::Two if is_common => CollisionRisk::Medium,
        Tier::Two => CollisionRisk::Low,
        Tier::One | Tier::Three => CollisionRisk::None,
    }
}

// ---------------------------------------------------------------------------
// DatabaseSummary
// ---------------------------------------------------------------------------

/// Catalog size breakdown, for logging and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatabaseSummary {
    pub total: usize,
    pub tier1: usize,
    pub tier2: usize,
    pub tier3: usize,
    pub collisions: usize,
    /// Number of projects with a tier-2 bucket of their own.
    pub projects: usize,
}

// ---------------------------------------------------------------------------
// SoundsLikeDatabase
// ---------------------------------------------------------------------------

/// Immutable catalog of classified sounds-like mappings.
#[derive(Debug, Clone, Default)]
pub struct SoundsLikeDatabase {
    mappings: Vec<SoundsLikeMapping>,
    tier1: Vec<SoundsLikeMapping>,
    tier2: HashMap<String, Vec<SoundsLikeMapping>>,
    tier3: Vec<SoundsLikeMapping>,
    collisions: HashMap<String, Collision>,
    /// `sounds_like` → indexes into `mappings`.
    index: HashMap<String, Vec<usize>>,
    common_terms: HashSet<String>,
    generic_terms: HashSet<String>,
}

impl SoundsLikeDatabase {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Read every source and build the catalog.
    ///
    /// A source that cannot be read contributes nothing; with no readable
    /// source the result is an empty catalog that corrects nothing.
    pub async fn load(sources: &[Arc<dyn RegistrySource>], options: DatabaseOptions) -> Self {
        let mut entities = Vec::new();
        for source in sources {
            match source.read_entities().await {
                Ok(found) => {
                    log::debug!(
                        "database: {} records from {}",
                        found.len(),
                        source.name()
                    );
                    entities.extend(found);
                }
                Err(e) => log::warn!("database: skipping source {} ({e})", source.name()),
            }
        }

        let db = Self::from_entities(entities, options);
        let summary = db.summary();
        log::info!(
            "database: loaded {} mappings (tier1={}, tier2={}, tier3={}, collisions={})",
            summary.total,
            summary.tier1,
            summary.tier2,
            summary.tier3,
            summary.collisions
        );
        db
    }

    /// Build the catalog from already-read entities.
    pub fn from_entities(
        entities: impl IntoIterator<Item = RegistryEntity>,
        options: DatabaseOptions,
    ) -> Self {
        let DatabaseOptions {
            tier2_min_confidence,
            detect_collisions,
            common_terms,
            generic_terms,
        } = options;

        // 1. Raw mappings, one per (entity, variant).
        let mut seen: HashSet<(EntityType, String, String)> = HashSet::new();
        let mut mappings = Vec::new();
        for entity in entities {
            let RegistryEntity {
                entity_type,
                record,
            } = entity;
            if !record.is_active() {
                log::debug!("database: skipping inactive entity {:?}", record.id);
                continue;
            }
            for variant in record.variants() {
                let mapping =
                    SoundsLikeMapping::new(variant, record.name.clone(), entity_type, record.id.clone());
                let key = (
                    entity_type,
                    mapping.entity_id.clone(),
                    mapping.sounds_like.clone(),
                );
                if seen.insert(key) {
                    mappings.push(mapping);
                }
            }
        }

        // 2. Group by phonetic form.
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, m) in mappings.iter().enumerate() {
            index.entry(m.sounds_like.clone()).or_default().push(i);
        }
        let colliding: HashSet<&str> = if detect_collisions {
            index
                .iter()
                .filter(|(_, idx)| idx.len() >= 2)
                .map(|(k, _)| k.as_str())
                .collect()
        } else {
            HashSet::new()
        };

        // 3. Classify.
        let mut classified = Vec::with_capacity(mappings.len());
        for mut m in mappings {
            let has_collision = colliding.contains(m.sounds_like.as_str());
            let is_common = common_terms.contains(&m.sounds_like);
            m.tier = classify_tier(&m.sounds_like, has_collision, &common_terms, &generic_terms);
            m.collision_risk = collision_risk(m.tier, has_collision, is_common);

            if m.tier == Tier::Two && m.entity_type == EntityType::Project {
                m.scoped_to_projects = Some(vec![m.entity_id.clone()]);
                m.min_confidence.get_or_insert(tier2_min_confidence);
            }
            classified.push(m);
        }

        let collisions: HashMap<String, Collision> = colliding
            .iter()
            .map(|sounds_like| {
                let members: Vec<SoundsLikeMapping> = index[*sounds_like]
                    .iter()
                    .map(|&i| classified[i].clone())
                    .collect();
                let collision = Collision {
                    sounds_like: sounds_like.to_string(),
                    count: members.len(),
                    mappings: members,
                };
                (sounds_like.to_string(), collision)
            })
            .collect();

        // 4. Partition.
        let mut tier1 = Vec::new();
        let mut tier2: HashMap<String, Vec<SoundsLikeMapping>> = HashMap::new();
        let mut tier3 = Vec::new();
        for m in &classified {
            match m.tier {
                Tier::One => tier1.push(m.clone()),
                Tier::Two => {
                    let bucket = if m.entity_type == EntityType::Project {
                        m.entity_id.clone()
                    } else {
                        GENERIC_BUCKET.to_string()
                    };
                    tier2.entry(bucket).or_default().push(m.clone());
                }
                Tier::Three => tier3.push(m.clone()),
            }
        }

        Self {
            mappings: classified,
            tier1,
            tier2,
            tier3,
            collisions,
            index,
            common_terms,
            generic_terms,
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Every mapping, in registry order.
    pub fn mappings(&self) -> &[SoundsLikeMapping] {
        &self.mappings
    }

    /// Mappings that are always safe to apply.
    pub fn get_tier1_mappings(&self) -> &[SoundsLikeMapping] {
        &self.tier1
    }

    /// Tier-2 mappings scoped to `project_id`, followed by the unscoped ones.
    pub fn get_tier2_mappings_for_project(&self, project_id: &str) -> Vec<&SoundsLikeMapping> {
        let scoped = if project_id == GENERIC_BUCKET {
            None
        } else {
            self.tier2.get(project_id)
        };
        scoped
            .into_iter()
            .chain(self.tier2.get(GENERIC_BUCKET))
            .flatten()
            .collect()
    }

    /// Mappings that are never applied automatically.
    pub fn get_tier3_mappings(&self) -> &[SoundsLikeMapping] {
        &self.tier3
    }

    /// All mappings sharing `sounds_like` (case-insensitive).
    pub fn mappings_for(&self, sounds_like: &str) -> Vec<&SoundsLikeMapping> {
        self.index
            .get(&sounds_like.trim().to_lowercase())
            .into_iter()
            .flatten()
            .map(|&i| &self.mappings[i])
            .collect()
    }

    pub fn has_collision(&self, sounds_like: &str) -> bool {
        self.collisions
            .contains_key(&sounds_like.trim().to_lowercase())
    }

    pub fn get_collision(&self, sounds_like: &str) -> Option<&Collision> {
        self.collisions.get(&sounds_like.trim().to_lowercase())
    }

    pub fn get_all_collisions(&self) -> &HashMap<String, Collision> {
        &self.collisions
    }

    /// Tier `sounds_like` would receive against this catalog's collision set.
    pub fn classify_tier(&self, sounds_like: &str) -> Tier {
        let key = sounds_like.trim().to_lowercase();
        classify_tier(
            &key,
            self.collisions.contains_key(&key),
            &self.common_terms,
            &self.generic_terms,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn summary(&self) -> DatabaseSummary {
        DatabaseSummary {
            total: self.mappings.len(),
            tier1: self.tier1.len(),
            tier2: self.tier2.values().map(Vec::len).sum(),
            tier3: self.tier3.len(),
            collisions: self.collisions.len(),
            projects: self
                .tier2
                .keys()
                .filter(|k| k.as_str() != GENERIC_BUCKET)
                .count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemorySource, RegistryError};
    use async_trait::async_trait;

    fn options() -> DatabaseOptions {
        DatabaseOptions::with_terms(&["mark"], &["meeting", "update"])
    }

    fn build(entities: Vec<RegistryEntity>) -> SoundsLikeDatabase {
        SoundsLikeDatabase::from_entities(entities, options())
    }

    #[test]
    fn unique_term_is_tier_one() {
        let db = build(vec![RegistryEntity::project(
            "protokoll",
            "Protokoll",
            &["protocol"],
        )]);
        assert_eq!(db.get_tier1_mappings().len(), 1);
        let m = &db.get_tier1_mappings()[0];
        assert_eq!(m.tier, Tier::One);
        assert_eq!(m.collision_risk, CollisionRisk::None);
        assert_eq!(m.correct_text, "Protokoll");
        assert!(m.scoped_to_projects.is_none());
    }

    #[test]
    fn generic_terms_are_tier_three_even_when_colliding() {
        let db = build(vec![
            RegistryEntity::term("standup", "Standup", &["meeting"]),
            RegistryEntity::project("meet", "Meet", &["Meeting"]),
        ]);
        assert!(db.has_collision("meeting"));
        assert_eq!(db.get_tier3_mappings().len(), 2);
        assert!(db.get_tier3_mappings().iter().all(|m| m.tier == Tier::Three));
        assert!(db.get_tier1_mappings().is_empty());
        assert!(db.get_tier2_mappings_for_project("meet").is_empty());
        assert_eq!(db.classify_tier("MEETING"), Tier::Three);
    }

    #[test]
    fn collisions_count_every_contributing_mapping() {
        let db = build(vec![
            RegistryEntity::person("jon", "Jon", &["john"]),
            RegistryEntity::person("john-smith", "John Smith", &["John"]),
            RegistryEntity::project("john-deere", "John Deere", &["john"]),
        ]);
        let collision = db.get_collision("JOHN").expect("collision");
        assert_eq!(collision.count, 3);
        assert_eq!(collision.mappings.len(), 3);
        assert_eq!(collision.sounds_like, "john");
        assert!(collision.mappings.iter().all(|m| m.tier == Tier::Two));
        assert!(collision
            .mappings
            .iter()
            .all(|m| m.collision_risk == CollisionRisk::High));
        assert_eq!(db.get_all_collisions().len(), 1);
    }

    #[test]
    fn common_terms_are_tier_two_medium_risk() {
        let db = build(vec![RegistryEntity::person("marc", "Marc", &["mark"])]);
        let generic = db.get_tier2_mappings_for_project("anything");
        assert_eq!(generic.len(), 1);
        assert_eq!(generic[0].tier, Tier::Two);
        assert_eq!(generic[0].collision_risk, CollisionRisk::Medium);
        assert!(generic[0].scoped_to_projects.is_none());
    }

    #[test]
    fn term_listed_as_generic_and_common_stays_tier_three_without_risk() {
        let opts = DatabaseOptions::with_terms(&["update"], &["update"]);
        let db = SoundsLikeDatabase::from_entities(
            vec![RegistryEntity::term("upd", "UPD", &["update"])],
            opts,
        );
        let tier3 = db.get_tier3_mappings();
        assert_eq!(tier3.len(), 1);
        assert_eq!(tier3[0].tier, Tier::Three);
        assert_eq!(tier3[0].collision_risk, CollisionRisk::None);
        assert!(db.get_tier2_mappings_for_project("any").is_empty());
    }

    #[test]
    fn tier_two_projects_are_scoped_with_default_confidence() {
        let db = build(vec![
            RegistryEntity::project("alpha", "Alpha", &["alfa"]),
            RegistryEntity::person("alfa-romeo", "Alfa", &["alfa"]),
        ]);

        let for_alpha = db.get_tier2_mappings_for_project("alpha");
        assert_eq!(for_alpha.len(), 2);
        let project = for_alpha
            .iter()
            .find(|m| m.entity_type == EntityType::Project)
            .unwrap();
        assert_eq!(project.scoped_to_projects, Some(vec!["alpha".to_string()]));
        assert_eq!(project.min_confidence, Some(0.6));

        // Other projects only see the generic bucket.
        let for_beta = db.get_tier2_mappings_for_project("beta");
        assert_eq!(for_beta.len(), 1);
        assert_eq!(for_beta[0].entity_type, EntityType::Person);
        assert!(for_beta[0].min_confidence.is_none());

        let summary = db.summary();
        assert_eq!(summary.tier2, 2);
        assert_eq!(summary.projects, 1);
    }

    #[test]
    fn inactive_entities_are_skipped() {
        let db = build(vec![
            RegistryEntity::person("old", "Old Name", &["olde"]).inactive(),
            RegistryEntity::person("new", "New Name", &["nu"]),
        ]);
        assert_eq!(db.mappings().len(), 1);
        assert!(db.mappings_for("olde").is_empty());
    }

    #[test]
    fn repeated_variants_of_one_entity_do_not_collide() {
        let db = build(vec![RegistryEntity::term(
            "k8s",
            "Kubernetes",
            &["cube ernetes", "Cube Ernetes"],
        )]);
        assert_eq!(db.mappings().len(), 1);
        assert!(!db.has_collision("cube ernetes"));
        assert_eq!(db.get_tier1_mappings().len(), 1);
    }

    #[test]
    fn disabled_collision_detection_keeps_tier_one() {
        let mut opts = options();
        opts.detect_collisions = false;
        let db = SoundsLikeDatabase::from_entities(
            vec![
                RegistryEntity::person("a", "A", &["ay"]),
                RegistryEntity::person("b", "B", &["ay"]),
            ],
            opts,
        );
        assert!(db.get_all_collisions().is_empty());
        assert_eq!(db.get_tier1_mappings().len(), 2);
        assert_eq!(db.mappings_for("ay").len(), 2);
    }

    #[test]
    fn options_from_invalid_config_fail() {
        let config = EngineConfig {
            tier2_min_confidence: 2.0,
            ..EngineConfig::default()
        };
        assert!(DatabaseOptions::from_config(&config).is_err());
    }

    #[test]
    fn empty_database_is_pass_through() {
        let db = SoundsLikeDatabase::default();
        assert!(db.is_empty());
        assert!(db.get_tier1_mappings().is_empty());
        assert!(db.get_tier2_mappings_for_project("alpha").is_empty());
        assert!(db.get_collision("x").is_none());
    }

    struct Unreadable;

    #[async_trait]
    impl RegistrySource for Unreadable {
        fn name(&self) -> String {
            "unreadable".into()
        }

        async fn read_entities(&self) -> Result<Vec<RegistryEntity>, RegistryError> {
            Err(RegistryError::NotFound("/missing".into()))
        }
    }

    #[tokio::test]
    async fn unreadable_source_degrades_to_remaining_sources() {
        let sources: Vec<Arc<dyn RegistrySource>> = vec![
            Arc::new(Unreadable),
            Arc::new(MemorySource::new(
                "ok",
                vec![RegistryEntity::project("protokoll", "Protokoll", &["protocol"])],
            )),
        ];
        let db = SoundsLikeDatabase::load(&sources, options()).await;
        assert_eq!(db.get_tier1_mappings().len(), 1);
    }

    #[tokio::test]
    async fn no_readable_source_yields_empty_database() {
        let sources: Vec<Arc<dyn RegistrySource>> = vec![Arc::new(Unreadable)];
        let db = SoundsLikeDatabase::load(&sources, options()).await;
        assert!(db.is_empty());
    }

    #[test]
    fn classify_tier_is_pure() {
        let common: HashSet<String> = ["mark".to_string()].into();
        let generic: HashSet<String> = ["update".to_string()].into();
        assert_eq!(classify_tier("update", true, &common, &generic), Tier::Three);
        assert_eq!(classify_tier("mark", false, &common, &generic), Tier::Two);
        assert_eq!(classify_tier("zed", true, &common, &generic), Tier::Two);
        assert_eq!(classify_tier("zed", false, &common, &generic), Tier::One);
    }
}
