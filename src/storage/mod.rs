use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::ContextId;
use crate::events::{Event, EventBus, StorageEvent, WeakEventBus};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no storage is attached to this context")]
    Unavailable,
    #[error("failed to read preferences: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write preferences: {path}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to parse preferences")]
    Parse(#[from] serde_json::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Synchronous string key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Keys stored as one JSON object on disk. Writes keep unrelated keys.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Map<String, Value>> {
        let serialized = match fs::read_to_string(&self.path) {
            Ok(serialized) => serialized,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if serialized.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&serialized)?)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.load()?;
        // Non-string JSON values surface as their literal text so callers
        // see them as invalid rather than missing.
        Ok(entries.get(key).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        // An unparsable file cannot be merged into; it is replaced.
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(StorageError::Parse(err)) => {
                tracing::warn!(?err, path = %self.path.display(), "overwriting unparsable preferences");
                Map::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), Value::String(value.to_string()));
        let serialized = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, serialized).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

struct StorageObserver {
    context: ContextId,
    bus: WeakEventBus,
}

struct SharedStorageInner {
    backend: Box<dyn KeyValueStore>,
    observers: RefCell<Vec<StorageObserver>>,
}

thread_local! {
    static GLOBAL_STORAGE: RefCell<Option<SharedStorage>> = const { RefCell::new(None) };
}

/// Handle to the store every context on the UI thread shares.
///
/// A write that changes a value is reported as [`Event::Storage`] to every
/// attached context except the one that made it.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Rc<SharedStorageInner>,
}

impl SharedStorage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            inner: Rc::new(SharedStorageInner {
                backend: Box::new(backend),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// The thread's shared store, created in memory on first access.
    pub fn global() -> Self {
        GLOBAL_STORAGE.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| {
                    tracing::debug!("initializing shared in-memory storage");
                    Self::in_memory()
                })
                .clone()
        })
    }

    /// Installs the thread's shared store. Returns `false` and keeps the
    /// existing store if one was already initialized.
    pub fn install_global(storage: SharedStorage) -> bool {
        GLOBAL_STORAGE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(storage);
            true
        })
    }

    pub fn ptr_eq(&self, other: &SharedStorage) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.backend.get(key)
    }

    pub fn set_item(&self, origin: ContextId, key: &str, value: &str) -> StorageResult<()> {
        let old_value = self.inner.backend.get(key).ok().flatten();
        self.inner.backend.set(key, value)?;

        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        let event = Event::Storage(StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: Some(value.to_string()),
        });
        for bus in self.observer_buses(origin) {
            bus.dispatch(&event);
        }
        Ok(())
    }

    pub(crate) fn attach(&self, context: ContextId, bus: WeakEventBus) {
        let mut observers = self.inner.observers.borrow_mut();
        observers.retain(|observer| observer.context != context);
        observers.push(StorageObserver { context, bus });
    }

    pub(crate) fn detach(&self, context: ContextId) {
        self.inner
            .observers
            .borrow_mut()
            .retain(|observer| observer.context != context);
    }

    pub fn attached_contexts(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    fn observer_buses(&self, origin: ContextId) -> Vec<EventBus> {
        let mut observers = self.inner.observers.borrow_mut();
        observers.retain(|observer| observer.bus.upgrade().is_some());
        observers
            .iter()
            .filter(|observer| observer.context != origin)
            .filter_map(|observer| observer.bus.upgrade())
            .collect()
    }
}

impl fmt::Debug for SharedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStorage")
            .field("attached_contexts", &self.attached_contexts())
            .finish()
    }
}
