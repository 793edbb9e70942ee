use std::cell::RefCell;
use std::rc::Rc;

use fenestra::dpi::{LogicalPosition, LogicalSize};
use fenestra::error::RequestError;
use fenestra::event::{
    Event, KeyDownEvent, Timestamp, WindowFocusChangeEvent, WindowFullScreenToggleEvent,
    WindowOcclusionChangeEvent, WindowResizeEvent,
};
use fenestra::event_loop::EventLoop;
use fenestra::keyboard::{Key, KeyCode, NamedKey};
use fenestra::platform::headless::{HeadlessConfig, NativeEvent};
use fenestra::window::{WindowAttributes, WindowId, WindowLifecycle};

mod common;

use common::{init_tracing, open_window, pump, with_loop, Recorder};

const BTN_LEFT: u32 = 0x110;

fn events_only(events: Vec<(Option<WindowId>, Event)>) -> Vec<Event> {
    events.into_iter().map(|(_, event)| event).collect()
}

#[test]
fn first_configure_then_draw() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();

    let window_id = with_loop(&mut event_loop, &mut app, |event_loop| {
        let attributes = WindowAttributes::default().with_size(LogicalSize::new(640.0, 480.0));
        let window_id = event_loop.create_window(attributes).unwrap();
        assert_eq!(event_loop.window_lifecycle(window_id).unwrap(), Some(WindowLifecycle::Created));
        window_id
    });

    let events = app.take();
    assert!(events.iter().all(|(id, _)| *id == Some(window_id)));
    match &events_only(events)[..] {
        [Event::WindowConfigure(configure), Event::WindowResize(resize), Event::WindowDraw(draw)] => {
            assert_eq!(configure.size, LogicalSize::new(640.0, 480.0));
            assert_eq!(resize.size, LogicalSize::new(640.0, 480.0));
            assert_eq!(draw.size.width, 640);
        },
        events => panic!("unexpected events: {events:?}"),
    }

    let lifecycle = with_loop(&mut event_loop, &mut app, move |event_loop| {
        event_loop.window_lifecycle(window_id).unwrap()
    });
    assert_eq!(lifecycle, Some(WindowLifecycle::Configured));
}

#[test]
fn window_ids_are_never_reused() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();

    let first = open_window(&mut event_loop, &mut app);
    with_loop(&mut event_loop, &mut app, move |event_loop| event_loop.destroy_window(first))
        .unwrap();
    let second = open_window(&mut event_loop, &mut app);
    assert_ne!(first, second);

    with_loop(&mut event_loop, &mut app, move |event_loop| {
        // Destroyed: neutral no-ops.
        assert_eq!(event_loop.window_size(first).unwrap(), None);
        assert_eq!(event_loop.window_title(first).unwrap(), None);
        assert!(event_loop.set_window_title(first, "gone").is_ok());
        assert!(event_loop.request_redraw(first).is_ok());
        assert!(event_loop.destroy_window(first).is_ok());
        assert_eq!(event_loop.window_lifecycle(first).unwrap(), Some(WindowLifecycle::Destroyed));

        // Never issued: an error.
        let unknown = WindowId::from(u64::MAX);
        assert!(matches!(event_loop.window_size(unknown), Err(RequestError::UnknownWindow(_))));
        assert!(matches!(event_loop.destroy_window(unknown), Err(RequestError::UnknownWindow(_))));
        assert!(matches!(event_loop.maximize(unknown), Err(RequestError::UnknownWindow(_))));

        assert!(event_loop.window_size(second).unwrap().is_some());
    });
}

#[test]
fn fullscreen_toggle_and_resize_precede_later_input() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let handle = event_loop.headless_handle();

    let window_id = open_window(&mut event_loop, &mut app);
    let surface = handle.surface(window_id).unwrap();
    handle.send(NativeEvent::KeyboardEnter { surface });
    pump(&mut event_loop, &mut app);
    assert_eq!(events_only(app.take()), [Event::WindowFocusChange(WindowFocusChangeEvent {
        is_key: true,
        is_main: true,
    })]);

    event_loop.create_proxy().run_on_event_loop_async(move |event_loop| {
        event_loop.set_fullscreen(window_id).unwrap();
    });
    handle.send(NativeEvent::Key {
        code: KeyCode::Escape,
        key: Key::Named(NamedKey::Escape),
        characters: None,
        pressed: true,
        repeat: false,
        time: Timestamp::from_millis(10),
    });
    pump(&mut event_loop, &mut app);

    match &events_only(app.take_without_draws())[..] {
        [Event::WindowFullScreenToggle(WindowFullScreenToggleEvent { is_full_screen: true }), Event::WindowResize(WindowResizeEvent { size }), Event::KeyDown(KeyDownEvent { code: KeyCode::Escape, .. })] => {
            assert_eq!(*size, LogicalSize::new(1920.0, 1080.0));
        },
        events => panic!("unexpected events: {events:?}"),
    }
    assert!(handle.surface_state(surface).unwrap().fullscreen);

    with_loop(&mut event_loop, &mut app, move |event_loop| {
        event_loop.unset_fullscreen(window_id).unwrap();
    });
    match &events_only(app.take_without_draws())[..] {
        [Event::WindowFullScreenToggle(WindowFullScreenToggleEvent { is_full_screen: false }), Event::WindowResize(WindowResizeEvent { size })] => {
            assert_eq!(*size, LogicalSize::new(800.0, 600.0));
        },
        events => panic!("unexpected events: {events:?}"),
    }
}

#[test]
fn close_request_is_advisory() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let handle = event_loop.headless_handle();

    let window_id = open_window(&mut event_loop, &mut app);
    let surface = handle.surface(window_id).unwrap();
    handle.send(NativeEvent::Close { surface });
    pump(&mut event_loop, &mut app);
    assert_eq!(app.take(), [(Some(window_id), Event::WindowCloseRequest)]);

    with_loop(&mut event_loop, &mut app, move |event_loop| {
        assert_eq!(
            event_loop.window_lifecycle(window_id).unwrap(),
            Some(WindowLifecycle::CloseRequested)
        );
        assert!(event_loop.window_size(window_id).unwrap().is_some());
        event_loop.destroy_window(window_id).unwrap();
    });
    assert!(handle.surface(window_id).is_none());

    // Notifications for the destroyed surface are dropped.
    handle.send(NativeEvent::Close { surface });
    pump(&mut event_loop, &mut app);
    assert!(app.take().is_empty());
}

#[test]
fn events_for_a_window_destroyed_mid_batch_are_dropped() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default().on_event(|event_loop, window_id, event| {
        if let (Some(window_id), Event::WindowConfigure(_)) = (window_id, event) {
            event_loop.destroy_window(window_id).unwrap();
        }
    });

    with_loop(&mut event_loop, &mut app, |event_loop| {
        event_loop.create_window(WindowAttributes::default()).unwrap()
    });
    let events = events_only(app.take());
    assert!(matches!(&events[..], [Event::WindowConfigure(_)]), "{events:?}");
}

#[test]
fn interactive_move_needs_a_press() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let handle = event_loop.headless_handle();

    let window_id = open_window(&mut event_loop, &mut app);
    let surface = handle.surface(window_id).unwrap();

    let result = with_loop(&mut event_loop, &mut app, move |event_loop| {
        event_loop.start_move(window_id)
    });
    assert!(matches!(result, Err(RequestError::Ignored)));

    let time = Timestamp::from_millis(1);
    handle.send(NativeEvent::PointerEnter {
        surface,
        position: LogicalPosition::new(10.0, 10.0),
        time,
    });
    handle.send(NativeEvent::PointerButton { button: BTN_LEFT, pressed: true, time });
    pump(&mut event_loop, &mut app);
    app.take();

    with_loop(&mut event_loop, &mut app, move |event_loop| event_loop.start_move(window_id))
        .unwrap();
    handle.send(NativeEvent::PointerMotion { position: LogicalPosition::new(30.0, 15.0), time });
    handle.send(NativeEvent::PointerButton { button: BTN_LEFT, pressed: false, time });
    pump(&mut event_loop, &mut app);

    // The compositor consumes the pointer while it moves the window.
    let events = events_only(app.take_without_draws());
    match &events[..] {
        [Event::WindowMove(moved)] => assert_eq!(moved.origin, LogicalPosition::new(20.0, 5.0)),
        events => panic!("unexpected events: {events:?}"),
    }
}

#[test]
fn refusals_from_the_compositor() {
    init_tracing();
    let config = HeadlessConfig { max_windows: Some(1), ..Default::default() };
    let mut event_loop = EventLoop::builder().with_headless_config(config).build().unwrap();
    let mut app = Recorder::default();

    open_window(&mut event_loop, &mut app);
    with_loop(&mut event_loop, &mut app, |event_loop| {
        assert!(matches!(
            event_loop.create_window(WindowAttributes::default()),
            Err(RequestError::Os(_))
        ));
        let negative = WindowAttributes::default().with_size(LogicalSize::new(-1.0, 10.0));
        assert!(matches!(event_loop.create_window(negative), Err(RequestError::Os(_))));
    });
}

#[test]
fn minimize_occludes_until_focused() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default();
    let handle = event_loop.headless_handle();

    let window_id = open_window(&mut event_loop, &mut app);
    with_loop(&mut event_loop, &mut app, move |event_loop| event_loop.minimize(window_id))
        .unwrap();
    assert_eq!(events_only(app.take_without_draws()), [Event::WindowOcclusionChange(
        WindowOcclusionChangeEvent { is_occluded: true }
    )]);

    let surface = handle.surface(window_id).unwrap();
    handle.send(NativeEvent::KeyboardEnter { surface });
    pump(&mut event_loop, &mut app);
    let events = events_only(app.take_without_draws());
    assert!(events.contains(&Event::WindowOcclusionChange(WindowOcclusionChangeEvent {
        is_occluded: false
    })));
}

#[test]
fn redraw_requests_are_coalesced() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let draws = Rc::new(RefCell::new(0));
    let mut app = Recorder::default().on_event({
        let draws = Rc::clone(&draws);
        move |_, _, event| {
            if let Event::WindowDraw(_) = event {
                *draws.borrow_mut() += 1;
            }
        }
    });

    let window_id = open_window(&mut event_loop, &mut app);
    *draws.borrow_mut() = 0;
    with_loop(&mut event_loop, &mut app, move |event_loop| {
        event_loop.request_redraw(window_id).unwrap();
        event_loop.request_redraw(window_id).unwrap();
        event_loop.request_redraw(window_id).unwrap();
    });
    assert_eq!(*draws.borrow(), 1);
}

#[test]
fn started_runs_on_every_run() {
    init_tracing();
    let mut event_loop = EventLoop::new().unwrap();
    let mut app = Recorder::default().on_start(|event_loop| event_loop.exit());

    event_loop.run_app_on_demand(&mut app).unwrap();
    event_loop.run_app_on_demand(&mut app).unwrap();
    assert_eq!(app.started, 2);
    assert_eq!(app.will_terminate, 2);
}
