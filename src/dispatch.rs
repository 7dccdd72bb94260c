//! Mode-keyed callback dispatch.
//!
//! [`DispatchEngine`] owns the live callback registry: a map from
//! `(hardware_id, mode, key)` to an ordered callback list, an active mode
//! name, and a paused/active flag. The session orchestrator populates and
//! clears the registry; event producers drive [`DispatchEngine::process_event`]
//! through the engine's [`EventSink`] impl.
//!
//! Modes are flat. An event whose key has no registration under the active
//! mode is a no-op, including events from devices that are no longer
//! present; there is no fallback to another mode.
//!
//! The engine is a cloneable handle over a single lock. Dispatch and
//! registry mutation are mutually exclusive, and callbacks and observers run
//! with the lock held: they must not call back into the engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::channel::EventSink;
use crate::event::{Event, EventKey};
use crate::table::Callback;

/// The distinguished default mode every session starts in.
pub const GLOBAL_MODE: &str = "global";

type RegistryKey = (u64, String, EventKey);

struct Inner {
    active_mode: String,
    previous_mode: String,
    active: bool,
    registry: HashMap<RegistryKey, Vec<Callback>>,
    mode_observers: Vec<Box<dyn FnMut(&str) + Send>>,
    active_observers: Vec<Box<dyn FnMut(bool) + Send>>,
}

/// Cloneable handle to the shared dispatch state.
#[derive(Clone)]
pub struct DispatchEngine {
    inner: Arc<Mutex<Inner>>,
}

impl Default for DispatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                active_mode: GLOBAL_MODE.to_owned(),
                previous_mode: GLOBAL_MODE.to_owned(),
                active: false,
                registry: HashMap::new(),
                mode_observers: Vec::new(),
                active_observers: Vec::new(),
            })),
        }
    }

    /// Switches the active mode and notifies mode observers.
    pub fn set_mode(&self, mode: &str) {
        let mut inner = self.lock();
        let previous = std::mem::replace(&mut inner.active_mode, mode.to_owned());
        debug!(mode, %previous, "mode changed");
        inner.previous_mode = previous;
        for observer in &mut inner.mode_observers {
            observer(mode);
        }
    }

    /// Resets mode state to the global default without notifying observers.
    ///
    /// Used when a session starts, so no stale previous-mode marker survives
    /// from an earlier session.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.active_mode = GLOBAL_MODE.to_owned();
        inner.previous_mode = GLOBAL_MODE.to_owned();
    }

    pub fn active_mode(&self) -> String {
        self.lock().active_mode.clone()
    }

    pub fn previous_mode(&self) -> String {
        self.lock().previous_mode.clone()
    }

    /// Appends a callback to the ordered list registered for the triple.
    pub fn register_callback(&self, hardware_id: u64, mode: &str, key: EventKey, callback: Callback) {
        self.lock()
            .registry
            .entry((hardware_id, mode.to_owned(), key))
            .or_default()
            .push(callback);
    }

    /// Empties the whole registry.
    pub fn clear_registry(&self) {
        let mut inner = self.lock();
        let dropped = inner.registry.len();
        inner.registry.clear();
        debug!(entries = dropped, "callback registry cleared");
    }

    /// Number of registered callbacks, across all modes and devices.
    pub fn callback_count(&self) -> usize {
        self.lock().registry.values().map(Vec::len).sum()
    }

    /// Enables dispatch and notifies active-state observers.
    pub fn resume(&self) {
        self.set_active(true);
    }

    /// Disables dispatch and notifies active-state observers. Registrations
    /// are kept.
    pub fn pause(&self) {
        self.set_active(false);
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Registers an observer for mode changes.
    pub fn on_mode_changed(&self, observer: impl FnMut(&str) + Send + 'static) {
        self.lock().mode_observers.push(Box::new(observer));
    }

    /// Registers an observer for pause/resume transitions.
    pub fn on_active_changed(&self, observer: impl FnMut(bool) + Send + 'static) {
        self.lock().active_observers.push(Box::new(observer));
    }

    /// Runs the callbacks registered for this event under the active mode,
    /// in registration order. A no-op while paused or when nothing matches.
    pub fn process_event(&self, event: &Event) {
        let mut inner = self.lock();
        if !inner.active {
            return;
        }
        let key = (event.hardware_id, inner.active_mode.clone(), event.key());
        if let Some(callbacks) = inner.registry.get_mut(&key) {
            for callback in callbacks {
                callback.invoke(event);
            }
        }
    }

    fn set_active(&self, active: bool) {
        let mut inner = self.lock();
        inner.active = active;
        debug!(active, "dispatch state changed");
        for observer in &mut inner.active_observers {
            observer(active);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for DispatchEngine {
    fn on_event(&mut self, event: &Event) {
        self.process_event(event);
    }
}
