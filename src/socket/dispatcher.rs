//! Inbound message routing.
//!
//! Registrations are kept in insertion order. Every inbound message is
//! offered to every registration; all that match fire, not just the first.
//!
//! | Filter | Matches when |
//! |--------|--------------|
//! | none | always |
//! | [`Filter::Exact`] | text body equals the string |
//! | [`Filter::Pattern`] | regex finds a match in the text body |
//!
//! Binary bodies only reach unfiltered registrations.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::Message;

// ============================================================================
// Types
// ============================================================================

/// Inbound message callback type.
pub type MessageCallback = Arc<dyn Fn(&Message) + Send + Sync>;

// ============================================================================
// NotifyHook
// ============================================================================

/// Host-side "something changed, refresh now" capability.
///
/// Any `Fn()` closure is a hook that is never already in progress.
pub trait NotifyHook: Send + Sync {
    /// Runs one notify cycle.
    fn notify(&self);

    /// Returns `true` while a notify cycle is running.
    ///
    /// The dispatcher skips [`NotifyHook::notify`] in that case.
    fn in_progress(&self) -> bool {
        false
    }
}

impl<F> NotifyHook for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Restricts which messages reach a callback.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Text body must equal this string exactly.
    Exact(String),
    /// Text body must contain a match for this pattern.
    Pattern(Regex),
}

impl Filter {
    /// Creates an exact-match filter.
    #[inline]
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Compiles a pattern filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilter`] if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| Error::invalid_filter(pattern, e.to_string()))
    }

    /// Returns `true` if `message` passes this filter.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        let Some(text) = message.as_text() else {
            return false;
        };

        match self {
            Self::Exact(expected) => text == expected,
            Self::Pattern(regex) => regex.is_match(text),
        }
    }
}

impl From<&str> for Filter {
    fn from(text: &str) -> Self {
        Self::exact(text)
    }
}

impl From<String> for Filter {
    fn from(text: String) -> Self {
        Self::Exact(text)
    }
}

impl From<Regex> for Filter {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

// ============================================================================
// MessageOptions
// ============================================================================

/// Options for one message registration.
#[derive(Debug, Clone)]
pub struct MessageOptions {
    /// Optional filter; `None` matches every message.
    pub filter: Option<Filter>,
    /// Run the notify hook after the callback fires.
    pub auto_notify: bool,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            filter: None,
            auto_notify: true,
        }
    }
}

impl MessageOptions {
    /// Unfiltered, auto-notify on.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter.
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the auto-notify flag.
    #[inline]
    #[must_use]
    pub fn auto_notify(mut self, enabled: bool) -> Self {
        self.auto_notify = enabled;
        self
    }
}

// ============================================================================
// MessageDispatcher
// ============================================================================

struct Registration {
    callback: MessageCallback,
    filter: Option<Filter>,
    auto_notify: bool,
}

impl Registration {
    fn matches(&self, message: &Message) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(message))
    }
}

/// Ordered list of message registrations.
pub struct MessageDispatcher {
    registrations: RwLock<Vec<Arc<Registration>>>,
    notify: Option<Arc<dyn NotifyHook>>,
}

impl MessageDispatcher {
    /// Creates an empty dispatcher with an optional notify hook.
    #[must_use]
    pub fn new(notify: Option<Arc<dyn NotifyHook>>) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            notify,
        }
    }

    /// Appends a registration.
    pub fn register(&self, callback: MessageCallback, options: MessageOptions) {
        self.registrations.write().push(Arc::new(Registration {
            callback,
            filter: options.filter,
            auto_notify: options.auto_notify,
        }));
    }

    /// Offers `message` to every registration in order.
    ///
    /// Callbacks run on the calling thread without any lock held, so they
    /// may register further callbacks; those see the next message, not this
    /// one. Returns the number of callbacks that fired.
    pub fn dispatch(&self, message: &Message) -> usize {
        let registrations = self.registrations.read().clone();
        let mut fired = 0;

        for registration in registrations.iter().filter(|r| r.matches(message)) {
            (registration.callback)(message);
            fired += 1;

            if registration.auto_notify
                && let Some(hook) = &self.notify
                && !hook.in_progress()
            {
                hook.notify();
            }
        }

        trace!(fired, total = registrations.len(), "Message dispatched");
        fired
    }

    /// Returns the number of registrations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }
}

impl fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("registrations", &self.len())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
