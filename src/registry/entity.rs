//! Entity records as read from the registry.
//!
//! Only `{id, name, sounds_like, active}` is consumed; any other field the
//! registry stores alongside them is ignored during deserialization.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Kind of entity a mapping corrects towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Project,
    Person,
    Term,
}

impl EntityType {
    /// All entity kinds, in the order sources enumerate them.
    pub const ALL: [EntityType; 3] = [EntityType::Project, EntityType::Person, EntityType::Term];

    /// Sub-directory holding this kind of record in a registry directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityType::Project => "projects",
            EntityType::Person => "people",
            EntityType::Term => "terms",
        }
    }
}

// ---------------------------------------------------------------------------
// EntityRecord
// ---------------------------------------------------------------------------

/// The subset of a registry entry this engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sounds_like: Option<Vec<String>>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl EntityRecord {
    pub fn new(id: &str, name: &str, sounds_like: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sounds_like: Some(sounds_like.iter().map(|s| s.to_string()).collect()),
            active: None,
        }
    }

    /// Entities are active unless explicitly marked `active: false`.
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }

    /// Non-blank phonetic variants, in registry order.
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.sounds_like
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// RegistryEntity
// ---------------------------------------------------------------------------

/// A record tagged with the kind of entity it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntity {
    pub entity_type: EntityType,
    pub record: EntityRecord,
}

impl RegistryEntity {
    pub fn new(entity_type: EntityType, record: EntityRecord) -> Self {
        Self {
            entity_type,
            record,
        }
    }

    pub fn project(id: &str, name: &str, sounds_like: &[&str]) -> Self {
        Self::new(EntityType::Project, EntityRecord::new(id, name, sounds_like))
    }

    pub fn person(id: &str, name: &str, sounds_like: &[&str]) -> Self {
        Self::new(EntityType::Person, EntityRecord::new(id, name, sounds_like))
    }

    pub fn term(id: &str, name: &str, sounds_like: &[&str]) -> Self {
        Self::new(EntityType::Term, EntityRecord::new(id, name, sounds_like))
    }

    /// Mark the entity inactive.
    pub fn inactive(mut self) -> Self {
        self.record.active = Some(false);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_defaults_to_true() {
        let json = r#"{"id":"alice","name":"Alice"}"#;
        let rec: EntityRecord = serde_json::from_str(json).unwrap();
        assert!(rec.is_active());
        assert_eq!(rec.variants().count(), 0);
    }

    #[test]
    fn explicit_inactive() {
        let json = r#"{"id":"bob","name":"Bob","active":false,"sounds_like":["bop"]}"#;
        let rec: EntityRecord = serde_json::from_str(json).unwrap();
        assert!(!rec.is_active());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"id":"p","name":"P","context":"work","classification":{"x":1}}"#;
        assert!(serde_json::from_str::<EntityRecord>(json).is_ok());
    }

    #[test]
    fn variants_skip_blank_entries() {
        let rec = EntityRecord::new("t", "T", &["one", "  ", "", " two "]);
        let v: Vec<_> = rec.variants().collect();
        assert_eq!(v, vec!["one", "two"]);
    }

    #[test]
    fn dir_names() {
        assert_eq!(EntityType::Project.dir_name(), "projects");
        assert_eq!(EntityType::Person.dir_name(), "people");
        assert_eq!(EntityType::Term.dir_name(), "terms");
    }
}
