//! Connection management
//!
//! Owns the lifecycle of the storage handle and the table bound for the
//! configured partition: uninitialized, started, stopped.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{Connector, DefaultConnector, StorageBackend, TableSchema};
use crate::config::ClientOptions;
use crate::error::{CacheError, Result};

// == Store Handle ==
/// A storage handle, tagged with who owns its lifecycle.
#[derive(Clone)]
pub enum StoreHandle {
    /// Opened by this connection; released on `stop()`.
    Owned(Arc<dyn StorageBackend>),
    /// Supplied by the caller; never closed here.
    Borrowed(Arc<dyn StorageBackend>),
}

impl StoreHandle {
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        match self {
            StoreHandle::Owned(backend) | StoreHandle::Borrowed(backend) => backend,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, StoreHandle::Owned(_))
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreHandle::Owned(_) => f.write_str("StoreHandle::Owned"),
            StoreHandle::Borrowed(_) => f.write_str("StoreHandle::Borrowed"),
        }
    }
}

/// A started connection: the handle plus the table bound against it.
#[derive(Debug, Clone)]
pub struct Binding {
    pub handle: StoreHandle,
    pub table: TableSchema,
}

impl Binding {
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        self.handle.backend()
    }
}

// == Connection ==
/// Connection manager for one cache partition.
///
/// `start()` is single-flight: concurrent callers queue on an internal lock
/// and the ones that arrive after the first success adopt its binding.
pub struct Connection {
    options: ClientOptions,
    external: Option<Arc<dyn StorageBackend>>,
    connector: Arc<dyn Connector>,
    /// Current binding, None when not started
    state: RwLock<Option<Arc<Binding>>>,
    /// Serializes start/stop transitions
    lifecycle: Mutex<()>,
}

impl Connection {
    /// Creates a connection that opens its own handle from `options.url`.
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::build(options, None, Arc::new(DefaultConnector))
    }

    /// Creates a connection that adopts a caller-managed handle.
    ///
    /// `options.url` is ignored; `stop()` leaves the handle open.
    pub fn with_handle(options: ClientOptions, handle: Arc<dyn StorageBackend>) -> Result<Self> {
        Self::build(options, Some(handle), Arc::new(DefaultConnector))
    }

    /// Creates a connection that opens its handle through a custom connector.
    pub fn with_connector(options: ClientOptions, connector: Arc<dyn Connector>) -> Result<Self> {
        Self::build(options, None, connector)
    }

    fn build(
        options: ClientOptions,
        external: Option<Arc<dyn StorageBackend>>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            options,
            external,
            connector,
            state: RwLock::new(None),
            lifecycle: Mutex::new(()),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    // == Start ==
    /// Establishes or adopts the storage handle and syncs the table.
    ///
    /// Idempotent: returns immediately once started.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        if self.state.read().await.is_some() {
            debug!("Connection already started");
            return Ok(());
        }

        let table_name = self.options.table_name();
        let table = TableSchema::cache_table(table_name);

        let handle = match &self.external {
            Some(backend) => {
                info!("Adopting externally managed handle for table {}", table_name);
                StoreHandle::Borrowed(Arc::clone(backend))
            }
            None => {
                let url = self.options.url.as_deref().ok_or_else(|| {
                    CacheError::Configuration("No URL given".to_string())
                })?;

                info!("Connecting to backing store for table {}", table_name);
                let backend = self
                    .connector
                    .connect(url)
                    .await
                    .map_err(|e| CacheError::backend("start", table_name, e))?;
                StoreHandle::Owned(backend)
            }
        };

        if let Err(e) = handle.backend().sync(&table).await {
            if handle.is_owned() {
                if let Err(close_err) = handle.backend().close().await {
                    warn!("Failed to release handle after sync failure: {:#}", close_err);
                }
            }
            return Err(CacheError::backend("start", table_name, e));
        }

        info!("Table {} synced, connection ready", table_name);
        *self.state.write().await = Some(Arc::new(Binding { handle, table }));
        Ok(())
    }

    // == Stop ==
    /// Releases the handle if this connection owns it.
    ///
    /// Idempotent: a no-op when not started. Failures while closing an owned
    /// handle are logged, never returned.
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;

        let Some(binding) = self.state.write().await.take() else {
            debug!("Connection already stopped");
            return;
        };

        match &binding.handle {
            StoreHandle::Owned(backend) => {
                if let Err(e) = backend.close().await {
                    warn!("Failed to close handle for table {}: {:#}", binding.table.name(), e);
                }
                info!("Connection for table {} released", binding.table.name());
            }
            StoreHandle::Borrowed(_) => {
                info!(
                    "Connection for table {} stopped; external handle left open",
                    binding.table.name()
                );
            }
        }
    }

    // == Is Ready ==
    /// True iff a binding exists and its backend reports open.
    ///
    /// Never blocks. Returns false whenever the state lock is held for
    /// writing, which happens briefly inside every `start()` and `stop()`
    /// call, including redundant ones that change nothing.
    pub fn is_ready(&self) -> bool {
        match self.state.try_read() {
            Ok(state) => state.as_ref().is_some_and(|b| b.backend().is_open()),
            Err(_) => false,
        }
    }

    /// Returns the current binding or `NotStarted`.
    pub async fn binding(&self, operation: &'static str) -> Result<Arc<Binding>> {
        self.state
            .read()
            .await
            .clone()
            .ok_or(CacheError::NotStarted { operation })
    }
}
