//! Diagnostic event replay.
//!
//! [`Repeater`] re-emits a fixed event sequence onto the bus from its own
//! worker thread, so mode and binding behavior can be exercised without
//! hardware. Its lifecycle:
//!
//! ```text
//! Idle --set_events--> Pending --debounce elapses--> Running
//! Running --auto-stop elapses or stop()--> Idle
//! ```
//!
//! Assigning a new event list while a replay is running is ignored (never
//! queued), as is an empty list; rapid successive assignments while idle
//! coalesce into a single deferred start through the debounce timer. The
//! worker emits the sequence cyclically at a fixed interval and exits
//! cooperatively at the next iteration boundary once the running flag
//! clears; `stop()` does not interrupt an emission in progress.
//!
//! [`repeat_sequence`] builds replay lists from captured events the way the
//! interactive "repeat my input" feature does: digital inputs become a
//! release-then-press pair so the replay produces an observable edge, axes
//! become a four-point excursion, hats a deflect/neutral pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::channel::EventChannel;
use crate::config::ReplayTiming;
use crate::event::{Event, InputKind};
use crate::timer::DelayedTask;

struct Shared {
    bus: EventChannel,
    timing: ReplayTiming,
    running: AtomicBool,
    events: Mutex<Vec<Event>>,
    start_timer: Mutex<Option<DelayedTask>>,
    stop_timer: Mutex<Option<DelayedTask>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Emits a cyclic sequence of synthetic events onto the bus.
///
/// Cloneable handle; the timer callbacks hold clones of it.
#[derive(Clone)]
pub struct Repeater {
    shared: Arc<Shared>,
}

impl Repeater {
    pub fn new(bus: EventChannel, timing: ReplayTiming) -> Self {
        Self {
            shared: Arc::new(Shared {
                bus,
                timing,
                running: AtomicBool::new(false),
                events: Mutex::new(Vec::new()),
                start_timer: Mutex::new(None),
                stop_timer: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Whether a replay is currently running (or still winding down).
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Current event list.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.shared.events).clone()
    }

    /// Stores a new event list and queues a deferred start.
    ///
    /// Ignored while a replay is running, and ignored for empty lists. A
    /// pending (not yet fired) debounce timer is cancelled and replaced, so
    /// only the last assignment within the debounce window starts a replay.
    pub fn set_events(&self, events: Vec<Event>) {
        if self.is_running() {
            debug!("replay in progress, event assignment ignored");
            return;
        }
        if events.is_empty() {
            debug!("empty event list ignored");
            return;
        }

        *lock(&self.shared.events) = events;

        let this = self.clone();
        let task = DelayedTask::schedule(self.shared.timing.debounce(), move || this.run());
        // Slot assignment drops (cancels) any pending debounce timer.
        *lock(&self.shared.start_timer) = Some(task);
    }

    /// Starts the worker thread and arms the auto-stop timer.
    ///
    /// Normally invoked by the debounce timer. A no-op while a worker is
    /// still alive, so a double fire cannot spawn a second thread.
    pub fn run(&self) {
        let mut worker = lock(&self.shared.worker);
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        if lock(&self.shared.events).is_empty() {
            return;
        }

        self.shared.running.store(true, Ordering::SeqCst);

        let this = self.clone();
        let task = DelayedTask::schedule(self.shared.timing.auto_stop(), move || this.stop());
        *lock(&self.shared.stop_timer) = Some(task);

        let shared = Arc::clone(&self.shared);
        match thread::Builder::new()
            .name("rebind-replay".into())
            .spawn(move || emit_events(&shared))
        {
            Ok(handle) => *worker = Some(handle),
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                warn!(%err, "failed to spawn replay worker");
            }
        }
    }

    /// Clears the running flag. Cooperative: the worker exits at its next
    /// iteration boundary, not necessarily before this returns.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }

    /// Stops and waits for the worker thread to exit. For deterministic
    /// shutdown and tests.
    pub fn shutdown(&self) {
        self.stop();
        if let Some(timer) = lock(&self.shared.start_timer).take() {
            timer.cancel();
        }
        if let Some(timer) = lock(&self.shared.stop_timer).take() {
            timer.cancel();
        }
        let handle = lock(&self.shared.worker).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Worker loop: cyclic emission until the running flag clears.
fn emit_events(shared: &Shared) {
    // The list cannot change while running, so snapshot it once.
    let events = lock(&shared.events).clone();
    let Some(first) = events.first() else {
        shared.running.store(false, Ordering::SeqCst);
        return;
    };
    // Sequences are homogeneous in channel; the first element decides.
    let channel = first.channel();
    let interval = shared.timing.emit_interval();

    debug!(count = events.len(), ?channel, "replay worker started");
    let mut index = 0;
    while shared.running.load(Ordering::SeqCst) {
        shared.bus.emit(channel, &events[index]);
        index = (index + 1) % events.len();
        thread::sleep(interval);
    }
    debug!("replay worker stopped");
}

/// Expands a captured event into the list a replay should cycle through.
///
/// Returns an empty list (nothing worth replaying) for near-neutral axis
/// positions (|value| < 0.25) and neutral hat events; the caller is expected
/// to skip such captures rather than disturb a selection already made.
pub fn repeat_sequence(event: &Event) -> Vec<Event> {
    let hw = event.hardware_id;
    match event.kind {
        InputKind::KeyPressed { key } | InputKind::KeyReleased { key } => vec![
            Event::key_edge(hw, key, false),
            Event::key_edge(hw, key, true),
        ],
        InputKind::ButtonPressed { button } | InputKind::ButtonReleased { button } => vec![
            Event::button_edge(hw, button, false),
            Event::button_edge(hw, button, true),
        ],
        InputKind::AxisMoved { axis, value } => {
            if value.abs() < 0.25 {
                return Vec::new();
            }
            vec![
                Event::axis(hw, axis, -0.75),
                Event::axis(hw, axis, 0.0),
                Event::axis(hw, axis, 0.75),
                Event::axis(hw, axis, 0.0),
            ]
        }
        InputKind::HatChanged { hat, direction } => {
            if direction == (0, 0) {
                return Vec::new();
            }
            vec![Event::hat(hw, hat, direction), Event::hat(hw, hat, (0, 0))]
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::event::{Channel, EventKey};

    fn fast_timing() -> ReplayTiming {
        ReplayTiming {
            debounce_secs: 0.02,
            emit_interval_secs: 0.01,
            auto_stop_secs: 10.0,
        }
    }

    fn collector(bus: &EventChannel, channel: Channel) -> Arc<Mutex<Vec<Event>>> {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        bus.subscribe(
            channel,
            crate::channel::sink_fn(move |event: &Event| {
                sink.lock().unwrap().push(event.clone());
            }),
        );
        collected
    }

    fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn replays_the_list_cyclically_after_the_debounce() {
        let bus = EventChannel::new();
        let collected = collector(&bus, Channel::Joystick);
        let repeater = Repeater::new(bus, fast_timing());

        let a = Event::button_edge(1, 3, false);
        let b = Event::button_edge(1, 3, true);
        repeater.set_events(vec![a.clone(), b.clone()]);

        assert!(wait_for(
            || collected.lock().unwrap().len() >= 5,
            Duration::from_secs(2),
        ));
        repeater.shutdown();

        let seen = collected.lock().unwrap();
        for (i, event) in seen.iter().take(4).enumerate() {
            let expected = if i % 2 == 0 { &a } else { &b };
            assert_eq!(event, expected);
        }
    }

    #[test]
    fn keyboard_sequences_go_to_the_keyboard_channel() {
        let bus = EventChannel::new();
        let keyboard = collector(&bus, Channel::Keyboard);
        let joystick = collector(&bus, Channel::Joystick);
        let repeater = Repeater::new(bus, fast_timing());

        repeater.set_events(repeat_sequence(&Event::key_edge(0, 30, true)));

        assert!(wait_for(
            || keyboard.lock().unwrap().len() >= 2,
            Duration::from_secs(2),
        ));
        repeater.shutdown();
        assert!(joystick.lock().unwrap().is_empty());
    }

    #[test]
    fn assignment_while_running_is_ignored() {
        let bus = EventChannel::new();
        let collected = collector(&bus, Channel::Joystick);
        let repeater = Repeater::new(bus, fast_timing());

        let original = vec![Event::button_edge(1, 3, false), Event::button_edge(1, 3, true)];
        repeater.set_events(original.clone());
        assert!(wait_for(|| repeater.is_running(), Duration::from_secs(2)));

        repeater.set_events(vec![Event::button_edge(9, 9, true)]);
        assert_eq!(repeater.events(), original);

        let before = collected.lock().unwrap().len();
        assert!(wait_for(
            || collected.lock().unwrap().len() > before,
            Duration::from_secs(2),
        ));
        repeater.shutdown();
        assert!(collected
            .lock()
            .unwrap()
            .iter()
            .all(|event| event.hardware_id == 1));
    }

    #[test]
    fn empty_assignment_never_starts_a_replay() {
        let bus = EventChannel::new();
        let collected = collector(&bus, Channel::Joystick);
        let repeater = Repeater::new(bus, fast_timing());

        repeater.set_events(Vec::new());
        thread::sleep(Duration::from_millis(100));
        assert!(!repeater.is_running());
        assert!(collected.lock().unwrap().is_empty());
    }

    #[test]
    fn auto_stop_returns_the_engine_to_idle() {
        let bus = EventChannel::new();
        let collected = collector(&bus, Channel::Joystick);
        let timing = ReplayTiming {
            debounce_secs: 0.02,
            emit_interval_secs: 0.01,
            auto_stop_secs: 0.1,
        };
        let repeater = Repeater::new(bus, timing);

        repeater.set_events(vec![Event::button_edge(1, 0, true)]);
        assert!(wait_for(|| repeater.is_running(), Duration::from_secs(2)));
        assert!(wait_for(|| !repeater.is_running(), Duration::from_secs(2)));
        // Give the worker its last wakeup so the next run() sees it finished.
        thread::sleep(Duration::from_millis(50));

        // Idle again: a fresh assignment is accepted and restarts emission.
        let emitted = collected.lock().unwrap().len();
        repeater.set_events(vec![Event::button_edge(2, 0, true)]);
        assert_eq!(repeater.events()[0].hardware_id, 2);
        assert!(wait_for(
            || collected.lock().unwrap().len() > emitted,
            Duration::from_secs(2),
        ));
        repeater.shutdown();
    }

    #[test]
    fn rapid_reassignment_coalesces_into_one_start() {
        let bus = EventChannel::new();
        let collected = collector(&bus, Channel::Joystick);
        let timing = ReplayTiming {
            debounce_secs: 0.1,
            emit_interval_secs: 0.01,
            auto_stop_secs: 10.0,
        };
        let repeater = Repeater::new(bus, timing);

        for hw in [1, 2, 3] {
            repeater.set_events(vec![Event::button_edge(hw, 0, true)]);
        }
        assert!(wait_for(
            || !collected.lock().unwrap().is_empty(),
            Duration::from_secs(2),
        ));
        repeater.shutdown();

        // Only the last assignment survives the debounce window.
        assert!(collected
            .lock()
            .unwrap()
            .iter()
            .all(|event| event.hardware_id == 3));
    }

    #[test]
    fn digital_inputs_expand_to_release_then_press() {
        let sequence = repeat_sequence(&Event::button_edge(1, 3, true));
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence[0].is_pressed(), Some(false));
        assert_eq!(sequence[1].is_pressed(), Some(true));
        assert!(sequence.iter().all(|e| e.key() == EventKey::Button(3)));
    }

    #[test]
    fn axes_expand_to_a_four_point_excursion() {
        let sequence = repeat_sequence(&Event::axis(1, 2, 0.9));
        let values: Vec<f64> = sequence
            .iter()
            .map(|e| match e.kind {
                InputKind::AxisMoved { value, .. } => value,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(values, vec![-0.75, 0.0, 0.75, 0.0]);
    }

    #[test]
    fn near_neutral_captures_expand_to_nothing() {
        assert!(repeat_sequence(&Event::axis(1, 2, 0.1)).is_empty());
        assert!(repeat_sequence(&Event::hat(1, 0, (0, 0))).is_empty());
    }

    #[test]
    fn hats_expand_to_deflect_then_neutral() {
        let sequence = repeat_sequence(&Event::hat(1, 0, (0, 1)));
        assert_eq!(
            sequence[0].kind,
            InputKind::HatChanged { hat: 0, direction: (0, 1) }
        );
        assert_eq!(
            sequence[1].kind,
            InputKind::HatChanged { hat: 0, direction: (0, 0) }
        );
    }
}
