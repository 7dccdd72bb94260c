//! rebind — runtime core of an input remapping system.
//!
//! Provides the live half of a remapper: a publish/subscribe event bus, a
//! mode-keyed dispatch engine, a session orchestrator that loads compiled
//! binding tables and wires them to the bus, and a diagnostic replay engine
//! that re-emits synthetic event sequences without hardware.
//!
//! Device polling, profile editing/persistence, and the compiler that turns
//! profiles into [`table::TableDocument`] artifacts live outside this crate
//! and talk to it through [`EventChannel`], [`DispatchEngine`], and the
//! [`table::BindingLoader`] trait.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod replay;
pub mod runner;
pub mod table;
pub mod timer;

pub use channel::{sink_fn, EventChannel, EventSink, SinkFn, SubscriberId};
pub use config::ReplayTiming;
pub use dispatch::{DispatchEngine, GLOBAL_MODE};
pub use event::{Channel, Event, EventKey, InputKind};
pub use replay::{repeat_sequence, Repeater};
pub use runner::SessionRunner;
pub use table::{
    ActionRegistry, BindingLoader, BindingRecord, Callback, CallbackTable, JsonTableLoader,
    LoadError, TableDocument, TABLE_VERSION,
};
pub use timer::DelayedTask;
