//! Session lifecycle: binding a compiled table to live input.
//!
//! [`SessionRunner`] drives one dispatch session at a time. `start()` resets
//! the engine to the global mode, loads the compiled table, transports every
//! callback into the engine's registry in table order, subscribes the engine
//! to both bus channels, and resumes dispatch. `stop()` reverses all of it:
//! unsubscribe first (after which no session callback can fire), then clear
//! the registry.
//!
//! Precondition: `start()` and `stop()` are invoked from a single control
//! thread (typically the UI thread). They are not safe to call concurrently
//! with each other.

use tracing::{debug, warn};

use crate::channel::{EventChannel, SubscriberId};
use crate::dispatch::{DispatchEngine, GLOBAL_MODE};
use crate::event::Channel;
use crate::table::{BindingLoader, LoadError};

/// Owns the lifecycle of a live dispatch session.
pub struct SessionRunner {
    channel: EventChannel,
    engine: DispatchEngine,
    loader: Box<dyn BindingLoader>,
    subscriptions: Vec<SubscriberId>,
    running: bool,
}

impl SessionRunner {
    pub fn new(
        channel: EventChannel,
        engine: DispatchEngine,
        loader: impl BindingLoader + 'static,
    ) -> Self {
        Self {
            channel,
            engine,
            loader: Box::new(loader),
            subscriptions: Vec::with_capacity(2),
            running: false,
        }
    }

    /// The engine this runner populates; exposed so callers can attach
    /// mode/active observers.
    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Loads the compiled table and goes live.
    ///
    /// On a load failure the error is returned and the session stays
    /// stopped; nothing has been registered or subscribed at that point.
    /// Calling `start()` while already running is a warned no-op.
    pub fn start(&mut self) -> Result<(), LoadError> {
        if self.running {
            warn!("session already running, start ignored");
            return Ok(());
        }

        self.engine.reset();
        let table = self.loader.load()?;

        let mut registered = 0usize;
        for entry in table.into_entries() {
            for callback in entry.callbacks {
                self.engine
                    .register_callback(entry.hardware_id, &entry.mode, entry.key, callback);
                registered += 1;
            }
        }

        self.subscriptions
            .push(self.channel.subscribe(Channel::Keyboard, self.engine.clone()));
        self.subscriptions
            .push(self.channel.subscribe(Channel::Joystick, self.engine.clone()));

        self.engine.set_mode(GLOBAL_MODE);
        self.engine.resume();
        self.running = true;
        debug!(callbacks = registered, "session started");
        Ok(())
    }

    /// Tears the session down. A no-op when not running.
    ///
    /// Unsubscribes before clearing the registry, so once this returns no
    /// callback of this session can fire; an event already in flight at most
    /// finds an empty registry.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        for id in self.subscriptions.drain(..).rev() {
            self.channel.unsubscribe(id);
        }
        self.engine.pause();
        self.engine.clear_registry();
        self.running = false;
        debug!("session stopped");
    }
}
