//! Connection registry: connection names to live adapters.

use crate::adapter::Adapter;
use sqlrecord_core::{
    Config, ConnectionInfo, Connector, Dialect, EnglishInflector, Error, Inflector, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// An adapter shared by everything resolving the same connection string.
pub type SharedAdapter = Arc<Mutex<Adapter>>;

type Slot = Arc<Mutex<Option<SharedAdapter>>>;

/// Registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Adapters currently cached
    pub cached_adapters: usize,
    /// Successful handshakes since the registry was created
    pub connections_opened: usize,
    /// Failed handshakes since the registry was created
    pub failed_connections: usize,
}

/// Resolves connection names to adapters and caches one adapter per
/// distinct connection string.
///
/// Resolution is safe to call from several threads: the first caller for a
/// connection string performs the handshake while later callers for the same
/// string wait for it; a failed handshake is not cached.
pub struct ConnectionRegistry {
    config: Config,
    connectors: HashMap<Dialect, Arc<dyn Connector>>,
    inflector: Arc<dyn Inflector>,
    cache: Mutex<HashMap<String, Slot>>,
    opened: AtomicUsize,
    failed: AtomicUsize,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("config", &self.config)
            .field("dialects", &self.connectors.keys().collect::<Vec<_>>())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ConnectionRegistry {
    /// Create a registry with no connectors registered.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            connectors: HashMap::new(),
            inflector: Arc::new(EnglishInflector),
            cache: Mutex::new(HashMap::new()),
            opened: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Register `connector` for its dialect.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.register(connector);
        self
    }

    /// Register `connector`, replacing any connector of the same dialect.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.dialect(), connector);
    }

    /// Inflector handed to every adapter opened from now on.
    pub fn with_inflector(mut self, inflector: Arc<dyn Inflector>) -> Self {
        self.inflector = inflector;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn inflector(&self) -> &Arc<dyn Inflector> {
        &self.inflector
    }

    /// Whether a connector is registered for `dialect`.
    pub fn supports(&self, dialect: Dialect) -> bool {
        self.connectors.contains_key(&dialect)
    }

    /// Connection string for `name`.
    ///
    /// `None` and `""` mean the default connection; a value containing `://`
    /// is already a connection string.
    pub fn connection_string(&self, name: Option<&str>) -> Option<String> {
        match name.filter(|n| !n.is_empty()) {
            None => self.config.default_connection_string().map(str::to_string),
            Some(url) if url.contains("://") => Some(url.to_string()),
            Some(name) => self.config.get_connection(name).map(str::to_string),
        }
    }

    /// The adapter for `name`, connecting on first use.
    pub fn resolve(&self, name: Option<&str>) -> Result<SharedAdapter> {
        let url = self.connection_string(name).ok_or_else(|| {
            Error::connection_failed(format!(
                "Empty connection string for connection '{}'",
                name.filter(|n| !n.is_empty())
                    .unwrap_or_else(|| self.config.default_connection())
            ))
        })?;

        let slot = {
            let mut cache = lock(&self.cache);
            Arc::clone(cache.entry(url.clone()).or_default())
        };

        let mut slot = lock(&slot);
        if let Some(adapter) = slot.as_ref() {
            return Ok(Arc::clone(adapter));
        }

        let adapter = Arc::new(Mutex::new(self.connect(&url)?));
        *slot = Some(Arc::clone(&adapter));
        Ok(adapter)
    }

    /// Open a new, uncached adapter for a connection string.
    pub fn connect(&self, url: &str) -> Result<Adapter> {
        let info = ConnectionInfo::parse(url)?;
        let connector = Dialect::from_protocol(&info.protocol)
            .and_then(|dialect| self.connectors.get(&dialect))
            .ok_or_else(|| Error::unsupported_dialect(&info.protocol))?;

        match Adapter::open(connector.as_ref(), info, &self.config) {
            Ok(adapter) => {
                self.opened.fetch_add(1, Ordering::Relaxed);
                Ok(adapter.with_inflector(Arc::clone(&self.inflector)))
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %err, "Connection failed");
                Err(err)
            }
        }
    }

    /// Forget the cached adapter for `name`. Returns whether one was cached.
    pub fn drop_connection(&self, name: Option<&str>) -> bool {
        let Some(url) = self.connection_string(name) else {
            return false;
        };
        let removed = lock(&self.cache).remove(&url);
        removed.is_some_and(|slot| lock(&slot).is_some())
    }

    pub fn stats(&self) -> RegistryStats {
        let cached_adapters = lock(&self.cache)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count();
        RegistryStats {
            cached_adapters,
            connections_opened: self.opened.load(Ordering::Relaxed),
            failed_connections: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
