//! Events, registry keys, and channel routing.
//!
//! The runtime represents input as small, device-agnostic deltas: an
//! [`Event`] names the originating device and carries an [`InputKind`]
//! describing what changed. Events are cheap to clone so synthetic variants
//! (forced press/release pairs, axis excursions) can be derived from a
//! captured event without touching the original.
//!
//! ## Value conventions
//! - **Axes:** normalized to `[-1.0, 1.0]`.
//! - **Buttons / keys:** boolean state expressed as press/release edges.
//! - **Hats (POV/D-pad):** a `(x, y)` direction tuple with components in
//!   `{-1, 0, 1}`; `(0, 0)` is neutral.
//!
//! Two projections of an event matter to the rest of the crate:
//! [`Event::key`] collapses press/release edges into the [`EventKey`] used to
//! look up callbacks, and [`Event::channel`] picks the bus [`Channel`] the
//! event travels on (keyboard input on its own channel, everything else on
//! the joystick channel).

use serde::{Deserialize, Serialize};

/// Per-device input change (delta).
///
/// Indices are device-local: `key` is a scan/usage index, `button`, `axis`
/// and `hat` count from the device descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// A keyboard key transitioned to pressed.
    KeyPressed { key: u16 },

    /// A keyboard key transitioned to released.
    KeyReleased { key: u16 },

    /// A joystick button transitioned to pressed.
    ButtonPressed { button: u16 },

    /// A joystick button transitioned to released.
    ButtonReleased { button: u16 },

    /// A continuous channel changed. `value` is normalized to `[-1.0, 1.0]`.
    AxisMoved { axis: u16, value: f64 },

    /// A hat (POV/D-pad) changed. `(0, 0)` is neutral.
    HatChanged { hat: u16, direction: (i8, i8) },
}

/// Input event attributed to a device.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Identity of the originating (or impersonated) hardware.
    pub hardware_id: u64,
    /// The actual input change.
    pub kind: InputKind,
}

/// The two delivery channels of the event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Keyboard,
    Joystick,
}

/// Edge-less identity of an input, used to key the callback registry.
///
/// Press and release edges of the same key or button map to the same
/// `EventKey`, so one registration covers both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKey {
    Key(u16),
    Button(u16),
    Axis(u16),
    Hat(u16),
}

impl Event {
    pub fn new(hardware_id: u64, kind: InputKind) -> Self {
        Self { hardware_id, kind }
    }

    /// Keyboard key edge.
    pub fn key_edge(hardware_id: u64, key: u16, pressed: bool) -> Self {
        let kind = if pressed {
            InputKind::KeyPressed { key }
        } else {
            InputKind::KeyReleased { key }
        };
        Self { hardware_id, kind }
    }

    /// Joystick button edge.
    pub fn button_edge(hardware_id: u64, button: u16, pressed: bool) -> Self {
        let kind = if pressed {
            InputKind::ButtonPressed { button }
        } else {
            InputKind::ButtonReleased { button }
        };
        Self { hardware_id, kind }
    }

    /// Axis position.
    pub fn axis(hardware_id: u64, axis: u16, value: f64) -> Self {
        Self {
            hardware_id,
            kind: InputKind::AxisMoved { axis, value },
        }
    }

    /// Hat direction.
    pub fn hat(hardware_id: u64, hat: u16, direction: (i8, i8)) -> Self {
        Self {
            hardware_id,
            kind: InputKind::HatChanged { hat, direction },
        }
    }

    /// Registry key this event dispatches under.
    pub fn key(&self) -> EventKey {
        match self.kind {
            InputKind::KeyPressed { key } | InputKind::KeyReleased { key } => EventKey::Key(key),
            InputKind::ButtonPressed { button } | InputKind::ButtonReleased { button } => {
                EventKey::Button(button)
            }
            InputKind::AxisMoved { axis, .. } => EventKey::Axis(axis),
            InputKind::HatChanged { hat, .. } => EventKey::Hat(hat),
        }
    }

    /// Bus channel this event travels on.
    pub fn channel(&self) -> Channel {
        match self.kind {
            InputKind::KeyPressed { .. } | InputKind::KeyReleased { .. } => Channel::Keyboard,
            _ => Channel::Joystick,
        }
    }

    /// Pressed/released state for digital inputs, `None` for axes and hats.
    pub fn is_pressed(&self) -> Option<bool> {
        match self.kind {
            InputKind::KeyPressed { .. } | InputKind::ButtonPressed { .. } => Some(true),
            InputKind::KeyReleased { .. } | InputKind::ButtonReleased { .. } => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_share_a_key() {
        let press = Event::button_edge(1, 3, true);
        let release = Event::button_edge(1, 3, false);
        assert_eq!(press.key(), EventKey::Button(3));
        assert_eq!(press.key(), release.key());
    }

    #[test]
    fn keyboard_events_route_to_the_keyboard_channel() {
        assert_eq!(Event::key_edge(0, 30, true).channel(), Channel::Keyboard);
        assert_eq!(Event::button_edge(1, 0, true).channel(), Channel::Joystick);
        assert_eq!(Event::axis(1, 2, 0.5).channel(), Channel::Joystick);
        assert_eq!(Event::hat(1, 0, (0, 1)).channel(), Channel::Joystick);
    }

    #[test]
    fn pressed_state_is_digital_only() {
        assert_eq!(Event::key_edge(0, 30, false).is_pressed(), Some(false));
        assert_eq!(Event::axis(1, 0, 1.0).is_pressed(), None);
        assert_eq!(Event::hat(1, 0, (0, 0)).is_pressed(), None);
    }
}
