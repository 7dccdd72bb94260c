//! Compiled callback tables and the loader boundary.
//!
//! A profile is compiled, outside this crate, into a [`CallbackTable`]: an
//! ordered list of `(hardware_id, mode, key)` entries, each carrying the
//! callbacks to run when a matching event arrives. The session orchestrator
//! only transports entries into the dispatch registry; it never interprets
//! binding semantics.
//!
//! The compilation step is reached through the [`BindingLoader`] trait. The
//! shipped implementation, [`JsonTableLoader`], reads a versioned JSON
//! document of [`BindingRecord`]s and resolves each record's action names
//! against an [`ActionRegistry`] of registered factories. The `version`
//! field is checked against [`TABLE_VERSION`] before anything is built, so
//! an artifact produced by an incompatible compiler is rejected up front
//! rather than half-loaded.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{Event, EventKey};

/// Version of the serialized table format this crate understands.
pub const TABLE_VERSION: u32 = 1;

/// Predicate deciding whether a callback's action runs for a given event.
pub type Condition = Box<dyn Fn(&Event) -> bool + Send>;

/// Action executed for a matching event.
pub type Action = Box<dyn FnMut(&Event) + Send>;

/// A compiled (condition, action) pair.
pub struct Callback {
    condition: Option<Condition>,
    action: Action,
}

impl Callback {
    /// Callback that runs unconditionally.
    pub fn new(action: impl FnMut(&Event) + Send + 'static) -> Self {
        Self {
            condition: None,
            action: Box::new(action),
        }
    }

    /// Callback gated on a condition.
    pub fn when(
        condition: impl Fn(&Event) -> bool + Send + 'static,
        action: impl FnMut(&Event) + Send + 'static,
    ) -> Self {
        Self {
            condition: Some(Box::new(condition)),
            action: Box::new(action),
        }
    }

    /// Runs the action if the condition (when present) passes.
    pub fn invoke(&mut self, event: &Event) {
        let passes = self.condition.as_ref().map_or(true, |cond| cond(event));
        if passes {
            (self.action)(event);
        }
    }
}

/// One table entry: the callbacks bound to a single input on one device in
/// one mode.
pub struct TableEntry {
    pub hardware_id: u64,
    pub mode: String,
    pub key: EventKey,
    pub callbacks: Vec<Callback>,
}

/// Ordered collection of compiled bindings.
///
/// Order is significant: callbacks appearing earlier in the table fire
/// earlier for the same key.
#[derive(Default)]
pub struct CallbackTable {
    entries: Vec<TableEntry>,
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for `(hardware_id, mode, key)`, merging into an
    /// existing entry for the same triple when there is one.
    pub fn bind(&mut self, hardware_id: u64, mode: &str, key: EventKey, callback: Callback) {
        let existing = self
            .entries
            .iter_mut()
            .find(|e| e.hardware_id == hardware_id && e.mode == mode && e.key == key);
        match existing {
            Some(entry) => entry.callbacks.push(callback),
            None => self.entries.push(TableEntry {
                hardware_id,
                mode: mode.to_owned(),
                key,
                callbacks: vec![callback],
            }),
        }
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TableEntry> {
        self.entries
    }

    /// Total number of callbacks across all entries.
    pub fn callback_count(&self) -> usize {
        self.entries.iter().map(|e| e.callbacks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Why a compiled table could not be loaded. All variants are recoverable;
/// the session simply stays stopped.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bindings artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed bindings artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("bindings artifact has version {found}, expected {expected}")]
    IncompatibleVersion { found: u32, expected: u32 },

    #[error("bindings reference unknown action {0:?}")]
    UnknownAction(String),
}

/// Source of compiled callback tables.
pub trait BindingLoader {
    fn load(&self) -> Result<CallbackTable, LoadError>;
}

impl<F> BindingLoader for F
where
    F: Fn() -> Result<CallbackTable, LoadError>,
{
    fn load(&self) -> Result<CallbackTable, LoadError> {
        self()
    }
}

/// One serialized binding: an input key on a device, in a mode, bound to a
/// list of named actions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingRecord {
    pub hardware_id: u64,
    pub mode: String,
    pub key: EventKey,
    pub actions: Vec<String>,
}

/// Top-level serialized table artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableDocument {
    pub version: u32,
    pub bindings: Vec<BindingRecord>,
}

/// Named action factories used to resolve [`BindingRecord::actions`].
///
/// A factory is invoked once per reference, so two bindings naming the same
/// action get independent callback instances.
#[derive(Default)]
pub struct ActionRegistry {
    factories: HashMap<String, Box<dyn Fn() -> Callback + Send>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, factory: impl Fn() -> Callback + Send + 'static) {
        self.factories.insert(name.to_owned(), Box::new(factory));
    }

    fn instantiate(&self, name: &str) -> Result<Callback, LoadError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| LoadError::UnknownAction(name.to_owned()))
    }
}

/// Builds a [`CallbackTable`] from a serialized document, preserving record
/// and action order.
pub fn parse_table(raw: &str, actions: &ActionRegistry) -> Result<CallbackTable, LoadError> {
    let document: TableDocument = serde_json::from_str(raw)?;
    if document.version != TABLE_VERSION {
        return Err(LoadError::IncompatibleVersion {
            found: document.version,
            expected: TABLE_VERSION,
        });
    }

    let mut table = CallbackTable::new();
    for record in &document.bindings {
        for name in &record.actions {
            let callback = actions.instantiate(name)?;
            table.bind(record.hardware_id, &record.mode, record.key, callback);
        }
    }
    Ok(table)
}

/// Loads a versioned JSON table artifact from disk.
pub struct JsonTableLoader {
    path: PathBuf,
    actions: ActionRegistry,
}

impl JsonTableLoader {
    pub fn new(path: impl Into<PathBuf>, actions: ActionRegistry) -> Self {
        Self {
            path: path.into(),
            actions,
        }
    }
}

impl BindingLoader for JsonTableLoader {
    fn load(&self) -> Result<CallbackTable, LoadError> {
        let raw = fs::read_to_string(&self.path)?;
        parse_table(&raw, &self.actions)
    }
}
