//! Process-scoped owner of the loaded mapping catalog.
//!
//! [`CorrectionContext`] is created once by the host and passed by reference
//! to every correction pass.  The registry is read the first time
//! [`database`](CorrectionContext::database) is awaited; callers that arrive
//! while that read is in flight wait on the same load instead of starting
//! their own.  Afterwards every caller gets a clone of the same
//! `Arc<SoundsLikeDatabase>`.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{AppConfig, ConfigError, EngineConfig};
use crate::registry::{DirectorySource, RegistrySource};

use super::database::{DatabaseOptions, SoundsLikeDatabase};

pub struct CorrectionContext {
    sources: Vec<Arc<dyn RegistrySource>>,
    options: DatabaseOptions,
    database: OnceCell<Arc<SoundsLikeDatabase>>,
}

impl CorrectionContext {
    /// Context that will build its catalog from `sources`.
    pub fn new(
        sources: Vec<Arc<dyn RegistrySource>>,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            sources,
            options: DatabaseOptions::from_config(config)?,
            database: OnceCell::new(),
        })
    }

    /// Context reading every registry directory listed in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let sources = config
            .registry
            .sources
            .iter()
            .map(|path| Arc::new(DirectorySource::new(path)) as Arc<dyn RegistrySource>)
            .collect();
        Self::new(sources, &config.engine)
    }

    /// Context around an already-built catalog; no registry read happens.
    pub fn with_database(database: SoundsLikeDatabase) -> Self {
        Self {
            sources: Vec::new(),
            options: DatabaseOptions::default(),
            database: OnceCell::new_with(Some(Arc::new(database))),
        }
    }

    /// The shared catalog, loading it on first use.
    pub async fn database(&self) -> Arc<SoundsLikeDatabase> {
        self.database
            .get_or_init(|| async {
                log::info!(
                    "context: loading sounds-like database from {} source(s)",
                    self.sources.len()
                );
                Arc::new(SoundsLikeDatabase::load(&self.sources, self.options.clone()).await)
            })
            .await
            .clone()
    }

    /// `true` once the catalog has been built.
    pub fn is_loaded(&self) -> bool {
        self.database.initialized()
    }
}

impl fmt::Debug for CorrectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("CorrectionContext")
            .field("sources", &names)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::registry::{RegistryEntity, RegistryError};

    /// Counts reads and sleeps so concurrent callers overlap the load.
    struct CountingSource {
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegistrySource for CountingSource {
        fn name(&self) -> String {
            "counting".into()
        }

        async fn read_entities(&self) -> Result<Vec<RegistryEntity>, RegistryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![RegistryEntity::project(
                "protokoll",
                "Protokoll",
                &["protocol"],
            )])
        }
    }

    fn counting_context() -> (Arc<CorrectionContext>, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source: Arc<dyn RegistrySource> = Arc::new(CountingSource {
            reads: Arc::clone(&reads),
        });
        let ctx = CorrectionContext::new(vec![source], &EngineConfig::default()).unwrap();
        (Arc::new(ctx), reads)
    }

    #[tokio::test]
    async fn loads_once_and_reuses() {
        let (ctx, reads) = counting_context();
        assert!(!ctx.is_loaded());

        let first = ctx.database().await;
        let second = ctx.database().await;

        assert!(ctx.is_loaded());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(first.get_tier1_mappings().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_share_one_load() {
        let (ctx, reads) = counting_context();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { ctx.database().await })
            })
            .collect();

        let mut dbs = Vec::new();
        for h in handles {
            dbs.push(h.await.unwrap());
        }

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(dbs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn preloaded_database_skips_registry() {
        let db = SoundsLikeDatabase::from_entities(
            vec![RegistryEntity::term("k8s", "Kubernetes", &["cube ernetes"])],
            DatabaseOptions::default(),
        );
        let ctx = CorrectionContext::with_database(db);
        assert!(ctx.is_loaded());
        assert_eq!(ctx.database().await.mappings().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            tier2_min_confidence: 3.0,
            ..EngineConfig::default()
        };
        assert!(CorrectionContext::new(Vec::new(), &config).is_err());
    }

    #[tokio::test]
    async fn missing_registry_directory_yields_empty_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = AppConfig::default();
        config.registry.sources = vec![dir.path().join("absent")];

        let ctx = CorrectionContext::from_config(&config).unwrap();
        assert!(ctx.database().await.is_empty());
    }
}
