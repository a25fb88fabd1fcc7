//! Registry sources — where entity records come from.
//!
//! [`RegistrySource`] is the async seam between the correction engine and the
//! entity store.  Two implementations ship with the crate:
//!
//! * [`DirectorySource`] — one file per entity under
//!   `<root>/{projects,people,terms}/`, JSON (`*.json`) or TOML (`*.toml`).
//! * [`MemorySource`] — a fixed in-process list, for embedding hosts and tests.
//!
//! A source fails as a whole only when it cannot be read at all.  Individual
//! malformed files are logged and skipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::entity::{EntityRecord, EntityType, RegistryEntity};

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors raised while reading a registry source.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The source location does not exist.
    #[error("registry location not found: {0}")]
    NotFound(PathBuf),

    /// The source location exists but could not be read.
    #[error("failed to read registry location {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single record could not be parsed.
    #[error("malformed registry record {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// RegistrySource trait
// ---------------------------------------------------------------------------

/// Async source of entity records.
///
/// Implementors must be `Send + Sync` so they can be held as
/// `Arc<dyn RegistrySource>` by a process-wide correction context.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> String;

    /// Read every entity record this source holds, active or not.
    async fn read_entities(&self) -> Result<Vec<RegistryEntity>, RegistryError>;
}

// ---------------------------------------------------------------------------
// DirectorySource
// ---------------------------------------------------------------------------

/// Reads entity files from a registry directory.
///
/// ```text
/// <root>/
///   projects/alpha.toml
///   people/alice.json
///   terms/kubernetes.toml
/// ```
///
/// Missing kind sub-directories are treated as empty.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_kind(&self, kind: EntityType) -> Result<Vec<RegistryEntity>, RegistryError> {
        let dir = self.root.join(kind.dir_name());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let io_err = |source: std::io::Error| RegistryError::Io {
            path: dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if record_format(&path).is_some() {
                paths.push(path);
            }
        }
        // Stable order keeps collision listings reproducible between runs.
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path).await {
                Ok(record) => out.push(RegistryEntity::new(kind, record)),
                Err(e) => log::warn!("registry: skipping record ({e})"),
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl RegistrySource for DirectorySource {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    async fn read_entities(&self) -> Result<Vec<RegistryEntity>, RegistryError> {
        if !self.root.is_dir() {
            return Err(RegistryError::NotFound(self.root.clone()));
        }

        let mut all = Vec::new();
        for kind in EntityType::ALL {
            all.extend(self.read_kind(kind).await?);
        }
        log::debug!(
            "registry: read {} records from {}",
            all.len(),
            self.root.display()
        );
        Ok(all)
    }
}

#[derive(Debug, Clone, Copy)]
enum RecordFormat {
    Json,
    Toml,
}

fn record_format(path: &Path) -> Option<RecordFormat> {
    match path.extension()?.to_str()? {
        "json" => Some(RecordFormat::Json),
        "toml" => Some(RecordFormat::Toml),
        _ => None,
    }
}

async fn read_record(path: &Path) -> Result<EntityRecord, RegistryError> {
    let malformed = |reason: String| RegistryError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| malformed(e.to_string()))?;

    let record: EntityRecord = match record_format(path) {
        Some(RecordFormat::Json) => {
            serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?
        }
        Some(RecordFormat::Toml) => toml::from_str(&content).map_err(|e| malformed(e.to_string()))?,
        None => return Err(malformed("unsupported file extension".into())),
    };

    if record.id.trim().is_empty() {
        return Err(malformed("empty id".into()));
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// A fixed list of entities held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    entities: Vec<RegistryEntity>,
}

impl MemorySource {
    pub fn new(label: &str, entities: Vec<RegistryEntity>) -> Self {
        Self {
            label: label.to_string(),
            entities,
        }
    }
}

#[async_trait]
impl RegistrySource for MemorySource {
    fn name(&self) -> String {
        format!("memory:{}", self.label)
    }

    async fn read_entities(&self) -> Result<Vec<RegistryEntity>, RegistryError> {
        Ok(self.entities.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn reads_json_and_toml_records() {
        let dir = tempdir().expect("temp dir");
        write(
            dir.path(),
            "projects/alpha.toml",
            "id = \"alpha\"\nname = \"Alpha\"\nsounds_like = [\"all fa\"]\n",
        );
        write(
            dir.path(),
            "people/alice.json",
            r#"{"id":"alice","name":"Alice","sounds_like":["alis"]}"#,
        );

        let source = DirectorySource::new(dir.path());
        let entities = source.read_entities().await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_type, EntityType::Project);
        assert_eq!(entities[0].record.id, "alpha");
        assert_eq!(entities[1].entity_type, EntityType::Person);
        assert_eq!(entities[1].record.name, "Alice");
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let source = DirectorySource::new(dir.path().join("nope"));
        let err = source.read_entities().await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let dir = tempdir().expect("temp dir");
        write(dir.path(), "terms/bad.json", "{ not json");
        write(dir.path(), "terms/noid.json", r#"{"id":"","name":"x"}"#);
        write(dir.path(), "terms/good.json", r#"{"id":"k8s","name":"Kubernetes"}"#);
        write(dir.path(), "terms/readme.md", "ignored");

        let source = DirectorySource::new(dir.path());
        let entities = source.read_entities().await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].record.id, "k8s");
    }

    #[tokio::test]
    async fn empty_root_reads_nothing() {
        let dir = tempdir().expect("temp dir");
        let source = DirectorySource::new(dir.path());
        assert!(source.read_entities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_source_returns_entities() {
        let source = MemorySource::new(
            "test",
            vec![RegistryEntity::term("k8s", "Kubernetes", &["cube ernetes"])],
        );
        assert_eq!(source.name(), "memory:test");
        assert_eq!(source.read_entities().await.unwrap().len(), 1);
    }

    #[test]
    fn source_is_object_safe() {
        let _: Box<dyn RegistrySource> = Box::new(MemorySource::default());
    }
}
