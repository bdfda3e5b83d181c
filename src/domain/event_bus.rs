//! Synchronous in-process event bus.
//!
//! [`EventBus`] keeps, for each event name, an ordered set of
//! [`Listener`]s keyed by [`ListenerId`]. Emission delivers the same
//! [`EventArgs`] to every handler in registration order.
//!
//! # Locking
//!
//! A single [`parking_lot::Mutex`] guards the handler table. Every
//! operation holds it only for its own critical section and never while a
//! handler runs, so handlers may register or remove listeners (including
//! themselves) on the same bus. An emission works on a snapshot taken when
//! it starts: handlers added during the emission are not called by it, and
//! handlers removed during it are still called by it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{EventArgs, Listener, ListenerId};
use crate::error::EventBusError;

/// Reserved event: emitting it with no handlers fails instead of being
/// silently dropped.
pub const ERROR_EVENT: &str = "error";

/// Meta event fired with `(event_name, listener_id)` before a listener is
/// added.
pub const NEW_LISTENER_EVENT: &str = "new_listener";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Persistent,
    Once,
}

#[derive(Debug)]
struct Entry {
    key: Listener,
    mode: Mode,
    invoke: Listener,
}

type HandlerTable = HashMap<String, Vec<Entry>>;

/// Removes `id` from `event`, keeping survivors in order. Returns whether
/// an entry was removed.
fn remove_entry(table: &mut HandlerTable, event: &str, id: ListenerId) -> bool {
    let Some(entries) = table.get_mut(event) else {
        return false;
    };
    match entries.iter().position(|entry| entry.key.id() == id) {
        Some(pos) => {
            entries.remove(pos);
            true
        }
        None => false,
    }
}

/// Ordered multi-consumer publish/subscribe bus.
///
/// Cloning is cheap and every clone shares the same handler table.
///
/// # Constraint
///
/// Handlers run on the emitting thread. A handler that blocks blocks the
/// `emit` call that invoked it; the bus has no timeout or cancellation.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<HandlerTable>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event` and returns it unchanged.
    ///
    /// Fires [`NEW_LISTENER_EVENT`] before the listener becomes visible.
    /// Registering the same listener twice for the same event keeps a
    /// single entry at its original position.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::DualRegistration`] if the listener is
    /// already registered for `event` through [`EventBus::once`], or
    /// [`EventBusError::HandlerFailure`] if a `new_listener` handler fails.
    pub fn on(&self, event: &str, listener: Listener) -> Result<Listener, EventBusError> {
        self.add_handler(event, listener.clone(), listener.clone(), Mode::Persistent)?;
        Ok(listener)
    }

    /// Registers `listener` to run on the next emission of `event` only.
    ///
    /// The stored value is a wrapper that removes the entry before calling
    /// `listener`, while the entry stays keyed by `listener` so that
    /// [`EventBus::remove_listener`] works the same as for [`EventBus::on`].
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::DualRegistration`] if the listener is
    /// already registered for `event` through [`EventBus::on`], or
    /// [`EventBusError::HandlerFailure`] if a `new_listener` handler fails.
    pub fn once(&self, event: &str, listener: Listener) -> Result<Listener, EventBusError> {
        let table = Arc::downgrade(&self.handlers);
        let owned_event = event.to_owned();
        let inner = listener.clone();
        let wrapper = Listener::with_id(listener.id(), move |args| {
            let Some(table) = table.upgrade() else {
                return Ok(());
            };
            {
                let mut table = table.lock();
                // Another emission may have consumed the entry first.
                if !remove_entry(&mut table, &owned_event, inner.id()) {
                    return Ok(());
                }
            }
            inner.call(args)
        });
        self.add_handler(event, listener.clone(), wrapper, Mode::Once)?;
        Ok(listener)
    }

    /// Returns a builder that registers its argument for `event` when
    /// [`Registration::register`] is called.
    pub fn listen(&self, event: impl Into<String>) -> Registration<'_> {
        Registration {
            bus: self,
            event: event.into(),
            mode: Mode::Persistent,
        }
    }

    fn add_handler(
        &self,
        event: &str,
        key: Listener,
        invoke: Listener,
        mode: Mode,
    ) -> Result<(), EventBusError> {
        self.check_mode(event, key.id(), mode)?;

        self.emit(
            NEW_LISTENER_EVENT,
            &EventArgs::new().arg(event).arg(key.id().get()),
        )?;

        let mut table = self.handlers.lock();
        let entries = table.entry(event.to_owned()).or_default();
        match entries.iter_mut().find(|entry| entry.key.id() == key.id()) {
            Some(existing) if existing.mode != mode => {
                return Err(EventBusError::DualRegistration {
                    event: event.to_owned(),
                    id: key.id(),
                });
            }
            Some(existing) => existing.invoke = invoke,
            None => entries.push(Entry { key, mode, invoke }),
        }
        tracing::trace!(event, count = entries.len(), "listener registered");
        Ok(())
    }

    fn check_mode(&self, event: &str, id: ListenerId, mode: Mode) -> Result<(), EventBusError> {
        let table = self.handlers.lock();
        let conflict = table
            .get(event)
            .and_then(|entries| entries.iter().find(|entry| entry.key.id() == id))
            .is_some_and(|entry| entry.mode != mode);
        if conflict {
            return Err(EventBusError::DualRegistration {
                event: event.to_owned(),
                id,
            });
        }
        Ok(())
    }

    /// Calls every handler registered for `event`, in registration order.
    ///
    /// Returns `true` if at least one handler was invoked.
    ///
    /// # Errors
    ///
    /// - [`EventBusError::HandlerFailure`] as soon as a handler fails; the
    ///   remaining handlers of this emission are skipped.
    /// - [`EventBusError::UnhandledErrorEvent`] if `event` is
    ///   [`ERROR_EVENT`] and no handler was invoked. It carries the first
    ///   positional argument unless that is missing or `null`.
    pub fn emit(&self, event: &str, args: &EventArgs) -> Result<bool, EventBusError> {
        let snapshot: Vec<Listener> = {
            let table = self.handlers.lock();
            table
                .get(event)
                .map(|entries| entries.iter().map(|entry| entry.invoke.clone()).collect())
                .unwrap_or_default()
        };

        let mut handled = false;
        for handler in snapshot {
            handler
                .call(args)
                .map_err(|source| EventBusError::HandlerFailure {
                    event: event.to_owned(),
                    source,
                })?;
            handled = true;
        }

        if !handled && event == ERROR_EVENT {
            let error = args.first().filter(|value| !value.is_null()).cloned();
            return Err(EventBusError::UnhandledErrorEvent(error));
        }

        Ok(handled)
    }

    /// Removes the listener keyed by `key` from `event`. Absent keys are
    /// ignored.
    pub fn remove_listener(&self, event: &str, key: impl Into<ListenerId>) {
        let id = key.into();
        let removed = remove_entry(&mut self.handlers.lock(), event, id);
        if removed {
            tracing::trace!(event, %id, "listener removed");
        }
    }

    /// Removes every listener of `event`, or of every event when `event`
    /// is `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut table = self.handlers.lock();
        match event {
            Some(event) => {
                table.insert(event.to_owned(), Vec::new());
            }
            None => table.clear(),
        }
        tracing::debug!(event = event.unwrap_or("*"), "listeners cleared");
    }

    /// Returns the listeners registered for `event`, in registration order.
    ///
    /// For one-shot registrations this is the original listener, not the
    /// wrapper that runs it.
    #[must_use]
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        let table = self.handlers.lock();
        table
            .get(event)
            .map(|entries| entries.iter().map(|entry| entry.key.clone()).collect())
            .unwrap_or_default()
    }
}

/// Deferred registration for one event, produced by [`EventBus::listen`].
#[derive(Debug)]
#[must_use]
pub struct Registration<'a> {
    bus: &'a EventBus,
    event: String,
    mode: Mode,
}

impl Registration<'_> {
    /// Switches this registration to one-shot.
    pub fn once(mut self) -> Self {
        self.mode = Mode::Once;
        self
    }

    /// Returns the event this registration targets.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Registers `listener` and returns it unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::on`] or [`EventBus::once`].
    pub fn register(self, listener: Listener) -> Result<Listener, EventBusError> {
        match self.mode {
            Mode::Persistent => self.bus.on(&self.event, listener),
            Mode::Once => self.bus.once(&self.event, listener),
        }
    }
}

impl From<&Listener> for ListenerId {
    fn from(listener: &Listener) -> Self {
        listener.id()
    }
}
