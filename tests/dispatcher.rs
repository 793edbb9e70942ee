use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use fenestra::event::Event;
use fenestra::event_loop::{EventLoop, PumpStatus};
use fenestra::platform::headless::NativeEvent;
use fenestra::window::Theme;

mod common;

use common::{init_tracing, pump, Recorder};

#[test]
fn tasks_from_many_threads_share_one_queue() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();

    const THREADS: usize = 4;
    const TASKS: usize = 50;

    // Every task records its position in the global order, the submitters record the order in
    // which they enqueued.
    let enqueued = Arc::new(Mutex::new(Vec::new()));
    let ran = Arc::new(Mutex::new(Vec::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let submitters: Vec<_> = (0..THREADS)
        .map(|thread_index| {
            let proxy = event_loop.create_proxy();
            let enqueued = Arc::clone(&enqueued);
            let ran = Arc::clone(&ran);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                assert!(!proxy.is_event_loop_thread());
                barrier.wait();
                for task_index in 0..TASKS {
                    let ran = Arc::clone(&ran);
                    // The lock makes enqueue order observable.
                    let mut enqueued = enqueued.lock().unwrap();
                    proxy.run_on_event_loop_async(move |event_loop| {
                        assert!(event_loop.is_event_loop_thread());
                        ran.lock().unwrap().push((thread_index, task_index));
                    });
                    enqueued.push((thread_index, task_index));
                }
            })
        })
        .collect();
    for submitter in submitters {
        submitter.join().unwrap();
    }

    pump(&mut event_loop, &mut app);

    let ran = ran.lock().unwrap();
    assert_eq!(ran.len(), THREADS * TASKS);
    assert_eq!(*ran, *enqueued.lock().unwrap());
}

#[test]
fn tasks_interleave_with_native_events() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = Recorder::default().on_event({
        let log = Arc::clone(&log);
        move |_, _, event| {
            if let Event::AppearanceChange(change) = event {
                log.lock().unwrap().push(format!("{:?}", change.theme));
            }
        }
    });

    let handle = event_loop.headless_handle();
    let proxy = event_loop.create_proxy();
    handle.send(NativeEvent::ThemeChanged(Theme::Dark));
    proxy.run_on_event_loop_async({
        let log = Arc::clone(&log);
        move |_| log.lock().unwrap().push("task".to_owned())
    });
    handle.send(NativeEvent::ThemeChanged(Theme::Light));

    pump(&mut event_loop, &mut app);
    assert_eq!(*log.lock().unwrap(), ["Dark", "task", "Light"]);
}

#[test]
fn tasks_queued_behind_exit_are_dropped() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let proxy = event_loop.create_proxy();
    let late_task_ran = Arc::new(AtomicBool::new(false));

    proxy.request_exit();
    proxy.run_on_event_loop_async({
        let late_task_ran = Arc::clone(&late_task_ran);
        move |_| late_task_ran.store(true, Ordering::SeqCst)
    });

    let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut app);
    assert_eq!(status, PumpStatus::Exit(0));
    assert_eq!(app.will_terminate, 1);

    pump(&mut event_loop, &mut app);
    assert!(!late_task_ran.load(Ordering::SeqCst));
    assert_eq!(app.started, 2, "started runs on every run");
}

#[test]
fn proxies_outliving_the_loop_are_inert() {
    init_tracing();
    let event_loop = EventLoop::new().unwrap();
    let proxy = event_loop.create_proxy();
    let handle = event_loop.headless_handle();
    event_loop.shutdown();

    proxy.run_on_event_loop_async(|_| unreachable!("the loop is gone"));
    proxy.request_exit();
    assert!(!handle.send(NativeEvent::TerminationRequest));
}

#[test]
fn termination_request_asks_the_application() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let handle = event_loop.headless_handle();

    let mut app = Recorder { refuse_termination: true, ..Default::default() };
    handle.send(NativeEvent::TerminationRequest);
    let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut app);
    assert_eq!(status, PumpStatus::Continue);
    assert_eq!(app.will_terminate, 0);

    app.refuse_termination = false;
    handle.send(NativeEvent::TerminationRequest);
    let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut app);
    assert_eq!(status, PumpStatus::Exit(0));
    assert_eq!(app.will_terminate, 1);
}

#[test]
fn run_app_returns_after_exit() {
    init_tracing();
    let event_loop = EventLoop::new().unwrap();
    let proxy = event_loop.create_proxy();
    let submitter = thread::spawn(move || proxy.request_exit());

    let mut app = Recorder::default();
    event_loop.run_app(&mut app).unwrap();
    submitter.join().unwrap();
    assert_eq!(app.started, 1);
    assert_eq!(app.will_terminate, 1);
}
