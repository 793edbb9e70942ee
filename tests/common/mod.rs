#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use fenestra::application::ApplicationHandler;
use fenestra::data_transfer::{DataSource, DragAndDropQuery, DragAndDropQueryResponse};
use fenestra::event::Event;
use fenestra::event_loop::{ActiveEventLoop, EventLoop};
use fenestra::window::WindowId;

/// Install a subscriber when `RUST_LOG` asks for one.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_some() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

type StartHook = Box<dyn FnMut(&dyn ActiveEventLoop)>;
type EventHook = Box<dyn FnMut(&dyn ActiveEventLoop, Option<WindowId>, &Event)>;

/// Records everything it receives.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<(Option<WindowId>, Event)>,
    pub started: usize,
    pub will_terminate: usize,
    pub refuse_termination: bool,
    pub queries: Vec<DragAndDropQuery>,
    pub drag_response: DragAndDropQueryResponse,
    /// Payloads served for owned sources, by MIME type.
    pub payloads: HashMap<String, Vec<u8>>,
    pub data_requests: Vec<(DataSource, String)>,
    pub on_start: Option<StartHook>,
    pub on_event: Option<EventHook>,
}

impl Recorder {
    pub fn on_start(mut self, hook: impl FnMut(&dyn ActiveEventLoop) + 'static) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    pub fn on_event(
        mut self,
        hook: impl FnMut(&dyn ActiveEventLoop, Option<WindowId>, &Event) + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(hook));
        self
    }

    /// Recorded events, forgetting them.
    pub fn take(&mut self) -> Vec<(Option<WindowId>, Event)> {
        std::mem::take(&mut self.events)
    }

    /// Recorded events without the draws, forgetting them.
    pub fn take_without_draws(&mut self) -> Vec<(Option<WindowId>, Event)> {
        self.take().into_iter().filter(|(_, event)| !matches!(event, Event::WindowDraw(_))).collect()
    }
}

impl ApplicationHandler for Recorder {
    fn started(&mut self, event_loop: &dyn ActiveEventLoop) {
        self.started += 1;
        if let Some(hook) = self.on_start.as_mut() {
            hook(event_loop);
        }
    }

    fn event(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        window_id: Option<WindowId>,
        event: &Event,
    ) -> bool {
        self.events.push((window_id, event.clone()));
        if let Some(hook) = self.on_event.as_mut() {
            hook(event_loop, window_id, event);
        }
        true
    }

    fn should_terminate(&mut self, _: &dyn ActiveEventLoop) -> bool {
        !self.refuse_termination
    }

    fn will_terminate(&mut self, _: &dyn ActiveEventLoop) {
        self.will_terminate += 1;
    }

    fn drag_and_drop_query(
        &mut self,
        _: &dyn ActiveEventLoop,
        query: &DragAndDropQuery,
    ) -> DragAndDropQueryResponse {
        self.queries.push(query.clone());
        self.drag_response.clone()
    }

    fn data_transfer_data(
        &mut self,
        _: &dyn ActiveEventLoop,
        source: DataSource,
        mime_type: &str,
    ) -> Option<Vec<u8>> {
        self.data_requests.push((source, mime_type.to_owned()));
        self.payloads.get(mime_type).cloned()
    }
}

/// Handle everything that is ready, including what the handling itself produced.
pub fn pump(event_loop: &mut EventLoop, app: &mut Recorder) {
    for _ in 0..4 {
        event_loop.pump_app_events(Some(Duration::ZERO), &mut *app);
    }
}

/// Run `task` with the active event loop, pump, and return what it returned.
pub fn with_loop<R: Send + 'static>(
    event_loop: &mut EventLoop,
    app: &mut Recorder,
    task: impl FnOnce(&dyn ActiveEventLoop) -> R + Send + 'static,
) -> R {
    let (sender, receiver) = std::sync::mpsc::channel();
    event_loop.create_proxy().run_on_event_loop_async(move |event_loop| {
        let _ = sender.send(task(event_loop));
    });
    pump(event_loop, app);
    receiver.try_recv().expect("task didn't run")
}

/// Create a window and handle its first configure.
pub fn open_window(event_loop: &mut EventLoop, app: &mut Recorder) -> WindowId {
    let window_id = with_loop(event_loop, app, |event_loop| {
        event_loop.create_window(Default::default()).unwrap()
    });
    app.take();
    window_id
}
