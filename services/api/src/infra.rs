use hospital_directory::config::{StoreBackend, StoreConfig};
use hospital_directory::directory::{MemoryDirectoryStore, SqliteDirectoryStore, StoreError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The configured directory store, opened and ready for a service to wrap.
pub(crate) enum StoreHandle {
    Sqlite(Arc<SqliteDirectoryStore>),
    Memory(Arc<MemoryDirectoryStore>),
}

impl StoreHandle {
    pub(crate) fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Sqlite => {
                let store = SqliteDirectoryStore::open(&config.path, config.busy_timeout)?;
                debug!(schema_version = store.schema_version()?, "directory schema ready");
                Ok(Self::Sqlite(Arc::new(store)))
            }
            StoreBackend::Memory => {
                warn!("using in-memory directory store; data is lost on exit");
                Ok(Self::Memory(Arc::new(MemoryDirectoryStore::new())))
            }
        }
    }

    /// Releases the database connection. In-memory stores have nothing to release.
    pub(crate) fn close(&self) -> Result<(), StoreError> {
        match self {
            StoreHandle::Sqlite(store) => store.close(),
            StoreHandle::Memory(_) => Ok(()),
        }
    }
}
