use std::fmt;

use crate::context::BrowsingContext;
use crate::theme::{ThemePreference, ThemeSubscription, ThemeSync, THEME_KEY};

/// The part of the theme state a page renders from.
pub trait ThemeHandle {
    fn is_dark_mode(&self) -> bool;
    fn toggle(&self) -> bool;

    fn preference(&self) -> ThemePreference {
        ThemePreference::from_dark_mode(self.is_dark_mode())
    }
}

impl ThemeHandle for ThemeSync {
    fn is_dark_mode(&self) -> bool {
        ThemeSync::is_dark_mode(self)
    }

    fn toggle(&self) -> bool {
        ThemeSync::toggle(self)
    }
}

/// A mounted page. Holds exactly one theme subscription, released when the
/// mount is dropped (including while unwinding).
pub struct PageMount {
    name: String,
    sync: ThemeSync,
    subscription: Option<ThemeSubscription>,
}

pub fn mount_page<F>(context: &BrowsingContext, name: impl Into<String>, on_change: F) -> PageMount
where
    F: Fn() + 'static,
{
    PageMount::mount(context, name, THEME_KEY, on_change)
}

impl PageMount {
    pub fn mount<F>(
        context: &BrowsingContext,
        name: impl Into<String>,
        key: impl Into<String>,
        on_change: F,
    ) -> Self
    where
        F: Fn() + 'static,
    {
        let name = name.into();
        let sync = ThemeSync::with_key(context, key);
        sync.read_and_normalize();
        let subscription = sync.subscribe(on_change);
        tracing::debug!(page = %name, context = ?context.id(), is_dark_mode = sync.is_dark_mode(), "page mounted");
        Self {
            name,
            sync,
            subscription: Some(subscription),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn theme(&self) -> &ThemeSync {
        &self.sync
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!(page = %self.name, "page unmounted");
        }
    }
}

impl ThemeHandle for PageMount {
    fn is_dark_mode(&self) -> bool {
        self.sync.is_dark_mode()
    }

    fn toggle(&self) -> bool {
        self.sync.toggle()
    }
}

impl Drop for PageMount {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PageMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageMount")
            .field("name", &self.name)
            .field("mounted", &self.is_mounted())
            .field("theme", &self.sync)
            .finish()
    }
}
