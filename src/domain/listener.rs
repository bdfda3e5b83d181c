//! Event handlers and their identity.
//!
//! A [`Listener`] is a shared callable with a process-unique [`ListenerId`].
//! Identity survives cloning, so the value returned by a registration call
//! can later be handed back to [`super::EventBus::remove_listener`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::EventArgs;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Closure type stored behind a [`Listener`].
pub type ListenerFn = dyn Fn(&EventArgs) -> anyhow::Result<()> + Send + Sync;

/// Identity of a registered handler, used as the removal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A callable event handler with a stable identity.
///
/// Two `Listener`s compare equal exactly when one is a clone of the other.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    func: Arc<ListenerFn>,
}

impl Listener {
    /// Wraps a fallible closure as a new listener with a fresh identity.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&EventArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id: ListenerId::next(),
            func: Arc::new(func),
        }
    }

    /// Wraps an infallible closure.
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(&EventArgs) + Send + Sync + 'static,
    {
        Self::new(move |args| {
            func(args);
            Ok(())
        })
    }

    /// Builds a listener that reuses `id`. Used for one-shot wrappers,
    /// which must be stored under the identity of the listener they wrap.
    pub(crate) fn with_id<F>(id: ListenerId, func: F) -> Self
    where
        F: Fn(&EventArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            id,
            func: Arc::new(func),
        }
    }

    /// Returns this listener's identity.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Invokes the listener directly, bypassing any bus.
    ///
    /// # Errors
    ///
    /// Returns whatever error the wrapped closure returns.
    pub fn call(&self, args: &EventArgs) -> anyhow::Result<()> {
        (self.func)(args)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish_non_exhaustive()
    }
}
