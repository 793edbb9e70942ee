use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fenestra::error::RequestError;
use fenestra::event_loop::EventLoop;
use fenestra::frame_pump::FramePump;
use fenestra::screen::ScreenId;

mod common;

use common::{init_tracing, with_loop, Recorder};

fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn pump_ticks_only_while_running() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let ticks = Arc::new(AtomicUsize::new(0));

    let pump = with_loop(&mut event_loop, &mut app, {
        let ticks = Arc::clone(&ticks);
        move |event_loop| {
            let screen_id = event_loop.screens()[0].id;
            event_loop
                .create_frame_pump(
                    screen_id,
                    Box::new(move || {
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }),
                )
                .unwrap()
        }
    });
    assert_eq!(pump.screen_id(), ScreenId(1));
    assert!(!pump.is_running());

    thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), 0, "created stopped");

    pump.start();
    pump.start();
    assert!(pump.is_running());
    wait_for("ticks", || ticks.load(Ordering::SeqCst) >= 2);

    pump.stop();
    pump.stop();
    assert!(!pump.is_running());
    // No tick is in flight once stop returned.
    let stopped_at = ticks.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), stopped_at);

    pump.start();
    wait_for("ticks after restart", || ticks.load(Ordering::SeqCst) > stopped_at);
    drop(pump);
}

#[test]
fn pump_callback_can_stop_its_own_pump() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let ticks = Arc::new(AtomicUsize::new(0));
    let slot = Arc::new(Mutex::new(None::<FramePump>));

    let pump = with_loop(&mut event_loop, &mut app, {
        let ticks = Arc::clone(&ticks);
        let slot = Arc::clone(&slot);
        move |event_loop| {
            event_loop
                .create_frame_pump(
                    ScreenId(1),
                    Box::new(move || {
                        ticks.fetch_add(1, Ordering::SeqCst);
                        if let Some(pump) = slot.lock().unwrap().as_ref() {
                            pump.stop();
                        }
                    }),
                )
                .unwrap()
        }
    });
    pump.start();
    *slot.lock().unwrap() = Some(pump);

    wait_for("the pump to stop itself", || {
        slot.lock().unwrap().as_ref().is_some_and(|pump| !pump.is_running())
    });
    let stopped_at = ticks.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(ticks.load(Ordering::SeqCst), stopped_at);

    // The callback keeps the slot alive, drop the pump here to join its thread.
    let pump = slot.lock().unwrap().take();
    drop(pump);
}

#[test]
fn unknown_screen_is_refused() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();

    let result = with_loop(&mut event_loop, &mut app, |event_loop| {
        event_loop.create_frame_pump(ScreenId(42), Box::new(|| ())).map(drop)
    });
    assert!(matches!(result, Err(RequestError::UnknownScreen(ScreenId(42)))));
}
