use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::BrowsingContext;
use crate::events::{Event, EventBus, EventKind, ListenerId, Visibility};
use crate::storage::StorageError;

/// Key the preference is persisted under.
pub const THEME_KEY: &str = "skolarin-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub const fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }

    /// Only the two exact persisted strings are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemePreference::Light),
            "dark" => Some(ThemePreference::Dark),
            _ => None,
        }
    }

    pub const fn from_dark_mode(is_dark_mode: bool) -> Self {
        if is_dark_mode {
            ThemePreference::Dark
        } else {
            ThemePreference::Light
        }
    }

    pub const fn is_dark(self) -> bool {
        matches!(self, ThemePreference::Dark)
    }

    pub const fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemePreference {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| value.to_string())
    }
}

struct SyncState {
    context: BrowsingContext,
    key: String,
    is_dark_mode: Cell<bool>,
}

impl SyncState {
    fn read_and_normalize(&self) -> bool {
        let stored = match self.context.get_item(&self.key) {
            Ok(stored) => stored,
            Err(StorageError::Parse(err)) => {
                tracing::warn!(?err, key = %self.key, "stored preferences are unparsable");
                Some(String::new())
            }
            Err(StorageError::Unavailable) => {
                tracing::debug!(key = %self.key, "no storage attached; keeping in-memory theme");
                return self.is_dark_mode.get();
            }
            Err(err) => {
                tracing::warn!(?err, key = %self.key, "failed to read theme; keeping in-memory theme");
                return self.is_dark_mode.get();
            }
        };

        let preference = stored.as_deref().and_then(ThemePreference::parse);
        self.set_dark_mode(preference.is_some_and(ThemePreference::is_dark));

        if preference.is_none() {
            tracing::debug!(key = %self.key, ?stored, "normalizing stored theme to light");
            self.write(ThemePreference::Light);
        }
        self.is_dark_mode.get()
    }

    fn set_dark_mode(&self, is_dark_mode: bool) {
        if self.is_dark_mode.replace(is_dark_mode) != is_dark_mode {
            tracing::debug!(context = ?self.context.id(), is_dark_mode, "theme state changed");
        }
    }

    fn write(&self, preference: ThemePreference) -> bool {
        match self.context.set_item(&self.key, preference.as_str()) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(?err, key = %self.key, %preference, "failed to persist theme");
                false
            }
        }
    }
}

/// Dark-mode flag for one mounted view, kept in step with the shared store.
///
/// The flag is read synchronously on construction without writing. The
/// store is repaired on [`ThemeSync::read_and_normalize`], which every
/// subscription trigger re-runs. Store failures are logged and the last
/// in-memory value is kept.
pub struct ThemeSync {
    state: Rc<SyncState>,
}

impl ThemeSync {
    pub fn new(context: &BrowsingContext) -> Self {
        Self::with_key(context, THEME_KEY)
    }

    pub fn with_key(context: &BrowsingContext, key: impl Into<String>) -> Self {
        let key = key.into();
        let is_dark_mode = initial_dark_mode(context, &key);
        Self {
            state: Rc::new(SyncState {
                context: context.clone(),
                key,
                is_dark_mode: Cell::new(is_dark_mode),
            }),
        }
    }

    pub fn is_dark_mode(&self) -> bool {
        self.state.is_dark_mode.get()
    }

    pub fn preference(&self) -> ThemePreference {
        ThemePreference::from_dark_mode(self.is_dark_mode())
    }

    pub fn key(&self) -> &str {
        &self.state.key
    }

    pub fn context(&self) -> &BrowsingContext {
        &self.state.context
    }

    /// Re-reads the stored value. Anything but `"dark"` clears the flag, and
    /// anything but `"dark"` or `"light"` (including a missing key) is
    /// rewritten as `"light"`.
    pub fn read_and_normalize(&self) -> bool {
        self.state.read_and_normalize()
    }

    /// Flips the flag, persists it and broadcasts the change. The new value
    /// is applied before any listener runs. When the write fails nothing is
    /// broadcast, so the flip stays in memory only.
    pub fn toggle(&self) -> bool {
        let next = !self.is_dark_mode();
        self.state.set_dark_mode(next);
        if self.state.write(ThemePreference::from_dark_mode(next)) {
            self.state.context.dispatch_theme_change();
        }
        next
    }

    /// Registers the four re-sync triggers on the owning context. Each one
    /// re-runs [`ThemeSync::read_and_normalize`] and then calls `on_change`.
    pub fn subscribe<F>(&self, on_change: F) -> ThemeSubscription
    where
        F: Fn() + 'static,
    {
        let on_change: Rc<dyn Fn()> = Rc::new(on_change);
        let bus = self.state.context.bus().clone();
        let key = self.state.key.clone();

        let ids = [
            bus.add_listener(
                EventKind::ThemeChange,
                resync(Rc::downgrade(&self.state), on_change.clone(), |_| true),
            ),
            bus.add_listener(
                EventKind::Storage,
                resync(
                    Rc::downgrade(&self.state),
                    on_change.clone(),
                    move |event| matches!(event, Event::Storage(change) if change.key == key),
                ),
            ),
            bus.add_listener(
                EventKind::Focus,
                resync(Rc::downgrade(&self.state), on_change.clone(), |_| true),
            ),
            bus.add_listener(
                EventKind::VisibilityChange,
                resync(Rc::downgrade(&self.state), on_change, |event| {
                    matches!(event, Event::VisibilityChange(Visibility::Visible))
                }),
            ),
        ];

        tracing::debug!(context = ?self.state.context.id(), "theme subscription registered");
        ThemeSubscription {
            bus,
            ids: Some(ids),
        }
    }
}

impl fmt::Debug for ThemeSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeSync")
            .field("context", &self.state.context.id())
            .field("key", &self.state.key)
            .field("is_dark_mode", &self.is_dark_mode())
            .finish()
    }
}

fn initial_dark_mode(context: &BrowsingContext, key: &str) -> bool {
    if !context.has_storage() {
        return false;
    }
    match context.get_item(key) {
        Ok(stored) => stored.as_deref() == Some(ThemePreference::Dark.as_str()),
        Err(err) => {
            tracing::warn!(?err, key, "failed to read theme on startup; defaulting to light");
            false
        }
    }
}

fn resync<P>(state: Weak<SyncState>, on_change: Rc<dyn Fn()>, accepts: P) -> impl Fn(&Event)
where
    P: Fn(&Event) -> bool + 'static,
{
    move |event| {
        if !accepts(event) {
            return;
        }
        let Some(state) = state.upgrade() else {
            return;
        };
        state.read_and_normalize();
        on_change();
    }
}

/// Listener registrations held by one view. Dropping it, or calling
/// [`ThemeSubscription::unsubscribe`], removes all four at once.
#[must_use = "dropping the subscription unregisters its listeners immediately"]
pub struct ThemeSubscription {
    bus: EventBus,
    ids: Option<[ListenerId; 4]>,
}

impl ThemeSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.ids.is_some()
    }

    fn release(&mut self) {
        let Some(ids) = self.ids.take() else {
            return;
        };
        for id in ids {
            self.bus.remove_listener(id);
        }
        tracing::debug!("theme subscription released");
    }
}

impl Drop for ThemeSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ThemeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore, SharedStorage, StorageResult};
    use std::cell::RefCell;
    use std::io;
    use std::path::PathBuf;

    /// Counts writes so tests can assert that normalization is idempotent.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: Rc<Cell<usize>>,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.writes.set(self.writes.get() + 1);
            self.inner.set(key, value)
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Read {
                path: PathBuf::from("/unavailable"),
                source: io::Error::other("storage disabled"),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Write {
                path: PathBuf::from("/unavailable"),
                source: io::Error::other("storage disabled"),
            })
        }
    }

    /// Readable, but every write is rejected.
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Write {
                path: PathBuf::from("/read-only"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            })
        }
    }

    fn counting_storage() -> (SharedStorage, Rc<Cell<usize>>) {
        let store = CountingStore::default();
        let writes = store.writes.clone();
        (SharedStorage::new(store), writes)
    }

    fn stored(context: &BrowsingContext) -> Option<String> {
        context.get_item(THEME_KEY).unwrap()
    }

    #[test]
    fn preference_parses_only_exact_values() {
        assert_eq!(ThemePreference::parse("dark"), Some(ThemePreference::Dark));
        assert_eq!(ThemePreference::parse("light"), Some(ThemePreference::Light));
        assert_eq!(ThemePreference::parse("Dark"), None);
        assert_eq!(ThemePreference::parse(" dark"), None);
        assert_eq!(ThemePreference::parse(""), None);
        assert_eq!("dark".parse::<ThemePreference>(), Ok(ThemePreference::Dark));
        assert_eq!(ThemePreference::Light.toggled(), ThemePreference::Dark);
        assert_eq!(ThemePreference::Dark.to_string(), "dark");
    }

    #[test]
    fn construction_reads_without_writing() {
        let (storage, writes) = counting_storage();
        let context = BrowsingContext::with_storage(storage);

        let sync = ThemeSync::new(&context);
        assert!(!sync.is_dark_mode());
        assert_eq!(writes.get(), 0);
        assert_eq!(stored(&context), None);
    }

    #[test]
    fn construction_picks_up_stored_dark_value() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        context.set_item(THEME_KEY, "dark").unwrap();

        let sync = ThemeSync::new(&context);
        assert!(sync.is_dark_mode());
        assert_eq!(sync.preference(), ThemePreference::Dark);
    }

    #[test]
    fn construction_without_storage_defaults_to_light() {
        let context = BrowsingContext::detached();
        let sync = ThemeSync::new(&context);
        assert!(!sync.is_dark_mode());
        assert!(!sync.read_and_normalize());
    }

    #[test]
    fn invalid_values_are_normalized_to_light() {
        for invalid in ["", "DARK", "blue", "true", "dark ", "null"] {
            let context = BrowsingContext::with_storage(SharedStorage::in_memory());
            context.set_item(THEME_KEY, invalid).unwrap();

            let sync = ThemeSync::new(&context);
            assert!(!sync.read_and_normalize(), "value {invalid:?}");
            assert!(!sync.is_dark_mode());
            assert_eq!(stored(&context).as_deref(), Some("light"), "value {invalid:?}");
        }
    }

    #[test]
    fn missing_key_is_written_as_light() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let sync = ThemeSync::new(&context);

        assert!(!sync.read_and_normalize());
        assert_eq!(stored(&context).as_deref(), Some("light"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let (storage, writes) = counting_storage();
        let context = BrowsingContext::with_storage(storage);
        context.set_item(THEME_KEY, "garbage").unwrap();
        let sync = ThemeSync::new(&context);
        writes.set(0);

        assert!(!sync.read_and_normalize());
        assert_eq!(writes.get(), 1);
        assert!(!sync.read_and_normalize());
        assert_eq!(writes.get(), 1);
    }

    #[test]
    fn valid_values_cause_no_writes() {
        for value in ["dark", "light"] {
            let (storage, writes) = counting_storage();
            let context = BrowsingContext::with_storage(storage);
            context.set_item(THEME_KEY, value).unwrap();
            writes.set(0);

            let sync = ThemeSync::new(&context);
            assert_eq!(sync.read_and_normalize(), value == "dark");
            assert_eq!(sync.read_and_normalize(), value == "dark");
            assert_eq!(writes.get(), 0);
        }
    }

    #[test]
    fn toggle_round_trip_updates_state_and_store() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let sync = ThemeSync::new(&context);
        assert!(!sync.is_dark_mode());

        assert!(sync.toggle());
        assert!(sync.is_dark_mode());
        assert_eq!(stored(&context).as_deref(), Some("dark"));

        assert!(!sync.toggle());
        assert!(!sync.is_dark_mode());
        assert_eq!(stored(&context).as_deref(), Some("light"));
    }

    #[test]
    fn toggle_broadcast_converges_other_instances_in_same_context() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let first = ThemeSync::new(&context);
        let second = ThemeSync::new(&context);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let _subscription = second.subscribe(move || counter.set(counter.get() + 1));

        assert!(first.toggle());
        assert!(second.is_dark_mode());
        assert_eq!(notified.get(), 1);
    }

    #[test]
    fn storage_event_converges_instances_in_other_contexts() {
        let storage = SharedStorage::in_memory();
        let tab_a = BrowsingContext::with_storage(storage.clone());
        let tab_b = BrowsingContext::with_storage(storage);
        let a = ThemeSync::new(&tab_a);
        let b = ThemeSync::new(&tab_b);
        let _subscription = b.subscribe(|| {});

        assert!(a.toggle());
        assert!(b.is_dark_mode());
        assert!(!a.toggle());
        assert!(!b.is_dark_mode());
    }

    #[test]
    fn storage_events_for_other_keys_are_ignored() {
        let storage = SharedStorage::in_memory();
        let tab_a = BrowsingContext::with_storage(storage.clone());
        let tab_b = BrowsingContext::with_storage(storage);
        let b = ThemeSync::new(&tab_b);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let _subscription = b.subscribe(move || counter.set(counter.get() + 1));

        tab_a.set_item("skolarin_auth_token", "abc").unwrap();
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn visibility_trigger_resyncs_stale_state() {
        let storage = SharedStorage::in_memory();
        let background = BrowsingContext::with_storage(storage.clone());
        let sync = ThemeSync::new(&background);
        let _subscription = sync.subscribe(|| {});
        background.set_visibility(Visibility::Hidden);

        // Attributed to this context, so no storage event reaches it.
        storage
            .set_item(background.id(), THEME_KEY, "dark")
            .unwrap();
        assert!(!sync.is_dark_mode());

        background.set_visibility(Visibility::Visible);
        assert!(sync.is_dark_mode());
    }

    #[test]
    fn hiding_does_not_trigger_resync() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let sync = ThemeSync::new(&context);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let _subscription = sync.subscribe(move || counter.set(counter.get() + 1));

        context.set_visibility(Visibility::Hidden);
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn focus_trigger_resyncs_stale_state() {
        let storage = SharedStorage::in_memory();
        let context = BrowsingContext::with_storage(storage.clone());
        let sync = ThemeSync::new(&context);
        let _subscription = sync.subscribe(|| {});

        storage.set_item(context.id(), THEME_KEY, "dark").unwrap();
        assert!(!sync.is_dark_mode());
        context.focus();
        assert!(sync.is_dark_mode());
    }

    #[test]
    fn unsubscribe_stops_all_triggers() {
        let storage = SharedStorage::in_memory();
        let tab_a = BrowsingContext::with_storage(storage.clone());
        let tab_b = BrowsingContext::with_storage(storage.clone());
        let a = ThemeSync::new(&tab_a);
        let b = ThemeSync::new(&tab_b);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let subscription = b.subscribe(move || counter.set(counter.get() + 1));
        assert_eq!(tab_b.bus().listener_count(), 4);

        subscription.unsubscribe();
        assert_eq!(tab_b.bus().listener_count(), 0);

        a.toggle();
        tab_b.dispatch_theme_change();
        tab_b.focus();
        tab_b.set_visibility(Visibility::Hidden);
        storage.set_item(tab_b.id(), THEME_KEY, "dark").unwrap();
        tab_b.set_visibility(Visibility::Visible);

        assert!(!b.is_dark_mode());
        assert_eq!(notified.get(), 0);
    }

    #[test]
    fn dropping_subscription_releases_listeners() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let sync = ThemeSync::new(&context);
        {
            let subscription = sync.subscribe(|| {});
            assert!(subscription.is_active());
            assert_eq!(context.bus().listener_count_for(EventKind::ThemeChange), 1);
            assert_eq!(context.bus().listener_count_for(EventKind::Storage), 1);
            assert_eq!(context.bus().listener_count_for(EventKind::Focus), 1);
            assert_eq!(
                context.bus().listener_count_for(EventKind::VisibilityChange),
                1
            );
        }
        assert_eq!(context.bus().listener_count(), 0);
    }

    #[test]
    fn listeners_outliving_their_sync_are_inert() {
        let context = BrowsingContext::with_storage(SharedStorage::in_memory());
        let sync = ThemeSync::new(&context);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let subscription = sync.subscribe(move || counter.set(counter.get() + 1));

        drop(sync);
        context.dispatch_theme_change();
        assert_eq!(notified.get(), 0);
        drop(subscription);
    }

    #[test]
    fn failing_store_degrades_to_in_memory_toggling() {
        let context = BrowsingContext::with_storage(SharedStorage::new(FailingStore));
        let sync = ThemeSync::new(&context);
        let _subscription = sync.subscribe(|| {});
        assert!(!sync.is_dark_mode());

        assert!(sync.toggle());
        assert!(sync.is_dark_mode());
        assert!(sync.read_and_normalize());
        assert!(!sync.toggle());
        assert!(!sync.is_dark_mode());
    }

    #[test]
    fn rejected_write_keeps_toggled_state() {
        let inner = MemoryStore::new();
        inner.set(THEME_KEY, "light").unwrap();
        let context = BrowsingContext::with_storage(SharedStorage::new(ReadOnlyStore { inner }));
        let sync = ThemeSync::new(&context);
        let notified = Rc::new(Cell::new(0));
        let counter = notified.clone();
        let _subscription = sync.subscribe(move || counter.set(counter.get() + 1));

        assert!(sync.toggle());
        assert!(sync.is_dark_mode());
        assert_eq!(notified.get(), 0);
        assert_eq!(stored(&context).as_deref(), Some("light"));

        assert!(!sync.toggle());
        assert!(!sync.is_dark_mode());
    }

    #[test]
    fn unparsable_preferences_file_is_normalized_to_light() {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        root.push(format!("skolarin-theme-{}-{nanos}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let path = root.join("preferences.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let context = BrowsingContext::with_storage(SharedStorage::new(JsonFileStore::new(&path)));
        let sync = ThemeSync::new(&context);
        assert!(!sync.read_and_normalize());
        assert_eq!(stored(&context).as_deref(), Some("light"));

        assert!(sync.toggle());
        assert_eq!(stored(&context).as_deref(), Some("dark"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn detached_context_toggles_in_memory() {
        let context = BrowsingContext::detached();
        let sync = ThemeSync::new(&context);
        let _subscription = sync.subscribe(|| {});

        assert!(sync.toggle());
        assert!(sync.is_dark_mode());
        context.focus();
        assert!(sync.is_dark_mode());
    }

    #[test]
    fn concurrent_toggles_converge_on_last_write() {
        let storage = SharedStorage::in_memory();
        let tab_a = BrowsingContext::with_storage(storage.clone());
        let tab_b = BrowsingContext::with_storage(storage);
        let a = ThemeSync::new(&tab_a);
        let b = ThemeSync::new(&tab_b);

        // Neither instance is subscribed, so `b` toggles from a stale value.
        assert!(a.toggle());
        assert!(!a.toggle());
        assert!(b.toggle());
        assert_eq!(stored(&tab_a).as_deref(), Some("dark"));
        assert!(!a.is_dark_mode());

        let _subscription = a.subscribe(|| {});
        tab_a.focus();
        assert!(a.is_dark_mode());
        assert_eq!(a.is_dark_mode(), b.is_dark_mode());
    }

    #[test]
    fn custom_key_is_respected_by_storage_filter() {
        let storage = SharedStorage::in_memory();
        let tab_a = BrowsingContext::with_storage(storage.clone());
        let tab_b = BrowsingContext::with_storage(storage);
        let a = ThemeSync::with_key(&tab_a, "custom-theme");
        let b = ThemeSync::with_key(&tab_b, "custom-theme");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = b.subscribe(move || sink.borrow_mut().push(()));

        a.toggle();
        assert!(b.is_dark_mode());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(
            tab_b.get_item("custom-theme").unwrap().as_deref(),
            Some("dark")
        );
        assert_eq!(tab_b.get_item(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn end_to_end_scenario_across_two_mounts() {
        let (storage, writes) = counting_storage();
        let tab = BrowsingContext::with_storage(storage);

        let first = ThemeSync::new(&tab);
        let _first_subscription = first.subscribe(|| {});
        assert!(!first.read_and_normalize());
        assert!(!first.is_dark_mode());
        assert_eq!(stored(&tab).as_deref(), Some("light"));

        assert!(first.toggle());
        assert_eq!(stored(&tab).as_deref(), Some("dark"));
        let writes_before_second_mount = writes.get();

        let second = ThemeSync::new(&tab);
        assert!(second.is_dark_mode());
        assert!(second.read_and_normalize());
        assert_eq!(writes.get(), writes_before_second_mount);
    }
}
