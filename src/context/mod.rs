use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::{Event, EventBus, Visibility};
use crate::storage::{SharedStorage, StorageError, StorageResult};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct ContextInner {
    id: ContextId,
    bus: EventBus,
    storage: Option<SharedStorage>,
    visibility: Cell<Visibility>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(storage) = &self.storage {
            storage.detach(self.id);
        }
    }
}

/// One tab or window: its own event bus, a foreground flag, and (once
/// available) the shared store.
#[derive(Clone)]
pub struct BrowsingContext {
    inner: Rc<ContextInner>,
}

impl BrowsingContext {
    /// A context attached to the thread's global store.
    pub fn new() -> Self {
        Self::with_storage(SharedStorage::global())
    }

    pub fn with_storage(storage: SharedStorage) -> Self {
        let context = Self::build(Some(storage));
        if let Some(storage) = &context.inner.storage {
            storage.attach(context.id(), context.inner.bus.downgrade());
        }
        context
    }

    /// A context with no store yet; reads and writes report
    /// [`StorageError::Unavailable`].
    pub fn detached() -> Self {
        Self::build(None)
    }

    fn build(storage: Option<SharedStorage>) -> Self {
        let id = ContextId::next();
        tracing::debug!(?id, attached = storage.is_some(), "created browsing context");
        Self {
            inner: Rc::new(ContextInner {
                id,
                bus: EventBus::new(),
                storage,
                visibility: Cell::new(Visibility::Visible),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn storage(&self) -> Option<&SharedStorage> {
        self.inner.storage.as_ref()
    }

    pub fn has_storage(&self) -> bool {
        self.inner.storage.is_some()
    }

    pub fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage()
            .ok_or(StorageError::Unavailable)?
            .get_item(key)
    }

    pub fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.storage()
            .ok_or(StorageError::Unavailable)?
            .set_item(self.id(), key, value)
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.visibility.get()
    }

    /// Records the new visibility and notifies listeners if it changed.
    pub fn set_visibility(&self, visibility: Visibility) {
        if self.inner.visibility.replace(visibility) == visibility {
            return;
        }
        tracing::debug!(id = ?self.id(), ?visibility, "visibility changed");
        self.inner.bus.dispatch(&Event::VisibilityChange(visibility));
    }

    pub fn focus(&self) {
        self.inner.bus.dispatch(&Event::Focus);
    }

    /// Broadcasts a theme change to every listener in this context.
    pub fn dispatch_theme_change(&self) -> usize {
        self.inner.bus.dispatch(&Event::ThemeChange)
    }
}

impl Default for BrowsingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrowsingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowsingContext")
            .field("id", &self.inner.id)
            .field("attached", &self.has_storage())
            .field("visibility", &self.visibility())
            .finish()
    }
}
