//! End-to-end walkthrough: compile a small table, go live, and drive it
//! with the replay engine instead of real hardware.
//!
//! Run with `cargo run --example replay`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rebind::{
    repeat_sequence, Callback, CallbackTable, DispatchEngine, Event, EventChannel, EventKey,
    LoadError, Repeater, ReplayTiming, SessionRunner, GLOBAL_MODE,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rebind=debug".into()),
        )
        .init();

    let bus = EventChannel::new();
    let engine = DispatchEngine::new();
    engine.on_mode_changed(|mode| println!("mode -> {mode}"));
    engine.on_active_changed(|active| println!("dispatch active -> {active}"));

    // One binding: button 3 on device 1, press edges only.
    let presses = Arc::new(AtomicUsize::new(0));
    let loader = {
        let presses = Arc::clone(&presses);
        move || -> Result<CallbackTable, LoadError> {
            let mut table = CallbackTable::new();
            let presses = Arc::clone(&presses);
            table.bind(
                1,
                GLOBAL_MODE,
                EventKey::Button(3),
                Callback::when(
                    |event| event.is_pressed() == Some(true),
                    move |event| {
                        let n = presses.fetch_add(1, Ordering::SeqCst) + 1;
                        println!("press #{n}: {event:?}");
                    },
                ),
            );
            Ok(table)
        }
    };

    let mut runner = SessionRunner::new(bus.clone(), engine, loader);
    runner.start().expect("bindings should load");

    // Pretend the user captured a button press for the input repeater.
    let timing = ReplayTiming {
        debounce_secs: 0.2,
        emit_interval_secs: 0.1,
        auto_stop_secs: 1.5,
    };
    let repeater = Repeater::new(bus, timing);
    repeater.set_events(repeat_sequence(&Event::button_edge(1, 3, true)));

    // Let the debounce elapse, the replay run, and the auto-stop fire.
    std::thread::sleep(Duration::from_secs(2));
    repeater.shutdown();
    runner.stop();

    println!(
        "replay dispatched {} presses",
        presses.load(Ordering::SeqCst)
    );
}
