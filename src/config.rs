//! Replay timing configuration.
//!
//! Supports TOML (de)serialization so diagnostic timings can live next to
//! the rest of an application's config. All fields are plain seconds;
//! missing fields fall back to the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timings driving the replay engine state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayTiming {
    /// Delay between an event-list assignment and the start of emission.
    /// Rapid reassignments within this window coalesce into one start.
    pub debounce_secs: f64,

    /// Pause between consecutive emissions of the cyclic sequence.
    pub emit_interval_secs: f64,

    /// How long a replay runs before stopping on its own.
    pub auto_stop_secs: f64,
}

impl Default for ReplayTiming {
    fn default() -> Self {
        Self {
            debounce_secs: 1.0,
            emit_interval_secs: 0.5,
            auto_stop_secs: 5.0,
        }
    }
}

impl ReplayTiming {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs.max(0.0))
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_secs_f64(self.emit_interval_secs.max(0.0))
    }

    pub fn auto_stop(&self) -> Duration {
        Duration::from_secs_f64(self.auto_stop_secs.max(0.0))
    }
}
