use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Listener slots on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ThemeChange,
    Storage,
    Focus,
    VisibilityChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// A write made through the shared store by another context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ThemeChange,
    Storage(StorageEvent),
    Focus,
    VisibilityChange(Visibility),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ThemeChange => EventKind::ThemeChange,
            Event::Storage(_) => EventKind::Storage,
            Event::Focus => EventKind::Focus,
            Event::VisibilityChange(_) => EventKind::VisibilityChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Event)>;

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    registrations: Vec<Registration>,
}

/// Publish/subscribe channel for one execution context.
///
/// Cloning yields another handle to the same bus. Dispatch snapshots the
/// matching listeners first, so a listener may add or remove registrations
/// or dispatch again without tripping a `RefCell` borrow. A listener removed
/// mid-dispatch is not called afterwards.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        let mut state = self.state.borrow_mut();
        state.next_id = state.next_id.saturating_add(1);
        let id = ListenerId(state.next_id);
        state.registrations.push(Registration {
            id,
            kind,
            listener: Rc::new(listener),
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.registrations.len();
        state.registrations.retain(|registration| registration.id != id);
        state.registrations.len() != before
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.state
            .borrow()
            .registrations
            .iter()
            .any(|registration| registration.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().registrations.len()
    }

    pub fn listener_count_for(&self, kind: EventKind) -> usize {
        self.state
            .borrow()
            .registrations
            .iter()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    /// Calls every listener registered for the event's kind, in
    /// registration order. Returns how many were called.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, Listener)> = self
            .state
            .borrow()
            .registrations
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| (registration.id, registration.listener.clone()))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            listener(event);
            delivered += 1;
        }
        tracing::trace!(?kind, delivered, "dispatched event");
        delivered
    }

    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            state: Rc::downgrade(&self.state),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct WeakEventBus {
    state: Weak<RefCell<BusState>>,
}

impl WeakEventBus {
    pub fn upgrade(&self) -> Option<EventBus> {
        self.state.upgrade().map(|state| EventBus { state })
    }
}

impl fmt::Debug for WeakEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventBus")
            .field("alive", &(self.state.strong_count() > 0))
            .finish()
    }
}
