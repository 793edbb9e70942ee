//! State owned by the event-loop thread and the translation of native notifications.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use calloop::channel::Sender;
use dpi::{LogicalPosition, LogicalSize};
use fenestra_core::application::ApplicationHandler;
use fenestra_core::data_transfer::{
    DataSource, DataTransferContent, DataTransferSerial, DragAndDropActions,
};
use fenestra_core::error::RequestError;
use fenestra_core::event::{
    AppearanceChangeEvent, DataTransferEvent, DisplayConfigurationChangeEvent, DropPerformedEvent,
    Event, KeyDownEvent, KeyUpEvent, ModifiersChangedEvent, MouseButton, MouseDownEvent,
    MouseDraggedEvent, MouseEnteredEvent, MouseExitedEvent, MouseMovedEvent, MouseUpEvent,
    ScrollWheelEvent,
};
use fenestra_core::event_loop::{ActiveEventLoop, EventLoopProxy};
use fenestra_core::frame_pump::FramePump;
use fenestra_core::keyboard::KeyModifiersSet;
use fenestra_core::screen::{ScreenId, ScreenInfo};
use fenestra_core::text_input::{ComposingText, TextInputContext};
use fenestra_core::window::{
    DecorationMode, PointerShape, WindowAttributes, WindowId, WindowLifecycle, WindowResizeEdge,
};
use tracing::{debug, trace, trace_span, warn};

use crate::dispatcher::{MainThread, Message, ProxyProvider};
use crate::ime::TextInputSession;
use crate::negotiator::{DropOutcome, Fetch, Negotiator};
use crate::platform::headless::compositor::Compositor;
use crate::platform::headless::{InteractiveOp, NativeEvent, SharedState, SurfaceId};
use crate::registry::Registry;
use crate::ticker::ThreadFramePump;

#[derive(Debug, Default)]
struct PointerFocus {
    window_id: Option<WindowId>,
    position: LogicalPosition<f64>,
    /// Held buttons, oldest first.
    buttons: Vec<MouseButton>,
}

/// Everything the event loop owns. Lives on the event-loop thread only.
///
/// No `RefCell` borrow is held while the application runs, so callbacks are free to call back
/// into [`ActiveEventLoop`].
pub(crate) struct LoopState {
    main_thread: MainThread,
    sender: Sender<Message>,
    compositor: RefCell<Compositor>,
    registry: RefCell<Registry>,
    text_input: RefCell<TextInputSession>,
    negotiator: RefCell<Negotiator>,
    /// Pastes to serve once the current callback returned.
    fetches: RefCell<VecDeque<Fetch>>,
    pointer: RefCell<PointerFocus>,
    modifiers: Cell<KeyModifiersSet>,
    exit: Cell<bool>,
}

impl fmt::Debug for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopState")
            .field("main_thread", &self.main_thread)
            .field("exit", &self.exit.get())
            .finish_non_exhaustive()
    }
}

impl LoopState {
    pub(crate) fn new(
        main_thread: MainThread,
        sender: Sender<Message>,
        compositor: Compositor,
    ) -> Self {
        Self {
            main_thread,
            sender,
            compositor: RefCell::new(compositor),
            registry: RefCell::default(),
            text_input: RefCell::default(),
            negotiator: RefCell::default(),
            fetches: RefCell::default(),
            pointer: RefCell::default(),
            modifiers: Cell::default(),
            exit: Cell::new(false),
        }
    }

    pub(crate) fn sender(&self) -> &Sender<Message> {
        &self.sender
    }

    pub(crate) fn shared(&self) -> SharedState {
        self.compositor.borrow().shared()
    }

    pub(crate) fn clear_exit(&self) {
        self.exit.set(false);
    }

    /// Whether work is ready without waiting for the native connection.
    pub(crate) fn has_pending_work(&self) -> bool {
        self.compositor.borrow().has_responses() || self.registry.borrow().has_redraws()
    }

    pub(crate) fn pop_response(&self) -> Option<NativeEvent> {
        self.compositor.borrow_mut().pop_response()
    }

    /// Hand `event` to the application, unless it targets a window that is gone.
    pub(crate) fn deliver(
        &self,
        app: &mut dyn ApplicationHandler,
        window_id: Option<WindowId>,
        event: Event,
    ) {
        if let Some(window_id) = window_id {
            if !self.registry.borrow().is_alive(window_id) {
                trace!(?window_id, ?event, "event for a destroyed window dropped");
                return;
            }
        }

        let span = trace_span!("fenestra::event", ?window_id);
        let _entered = span.enter();
        app.event(self, window_id, &event);
        self.run_fetches(app);
    }

    /// Call the application outside of event delivery, then serve what it asked for.
    pub(crate) fn with_app<R>(
        &self,
        app: &mut dyn ApplicationHandler,
        callback: impl FnOnce(&mut dyn ApplicationHandler, &dyn ActiveEventLoop) -> R,
    ) -> R {
        let result = callback(&mut *app, self);
        self.run_fetches(app);
        result
    }

    fn run_fetches(&self, app: &mut dyn ApplicationHandler) {
        loop {
            let fetch = self.fetches.borrow_mut().pop_front();
            let Some(fetch) = fetch else {
                break;
            };

            let (serial, mime_type, data) = match fetch {
                Fetch::Offer { serial, mime_type, offer } => {
                    let data = offer.receive(&mime_type);
                    (serial, mime_type, data)
                },
                Fetch::Owned { serial, source, mime_type } => {
                    let data = app.data_transfer_data(self, source, &mime_type);
                    (serial, mime_type, data)
                },
            };
            let data = data.unwrap_or_else(|| {
                warn!(?serial, %mime_type, "paste failed, delivering no data");
                Vec::new()
            });
            let event = Event::DataTransfer(DataTransferEvent {
                serial,
                content: DataTransferContent { mime_type, data },
            });
            self.deliver(app, None, event);
        }
    }

    /// Deliver the coalesced draws of every window that asked for one.
    pub(crate) fn deliver_redraws(&self, app: &mut dyn ApplicationHandler) {
        let draws = self.registry.borrow_mut().take_redraws();
        for (window_id, surface, draw) in draws {
            self.deliver(app, Some(window_id), Event::WindowDraw(draw));
            self.registry.borrow_mut().frame_committed(window_id);
            self.compositor.borrow_mut().commit_frame(surface);
        }
    }

    fn window_for(&self, surface: SurfaceId) -> Option<WindowId> {
        let window_id = self.registry.borrow().window_for_surface(surface);
        if window_id.is_none() {
            trace!(?surface, "notification for an unknown surface dropped");
        }
        window_id
    }

    fn key_window(&self) -> Option<WindowId> {
        self.registry.borrow().key_window()
    }

    fn deliver_all(
        &self,
        app: &mut dyn ApplicationHandler,
        window_id: WindowId,
        events: impl IntoIterator<Item = Event>,
    ) {
        for event in events {
            self.deliver(app, Some(window_id), event);
        }
    }

    fn keyboard_focus(&self, app: &mut dyn ApplicationHandler, surface: SurfaceId, focused: bool) {
        let Some(window_id) = self.window_for(surface) else { return };
        let events = self.registry.borrow_mut().focus(window_id, focused);
        for (window_id, event) in events {
            self.deliver(app, Some(window_id), event);
        }
    }

    /// Translate one native notification into events.
    pub(crate) fn handle_native(&self, app: &mut dyn ApplicationHandler, event: NativeEvent) {
        trace!(?event, "native event");
        let forward = self.compositor.borrow_mut().observe(&event);
        if !forward {
            return;
        }

        match event {
            NativeEvent::ScreensChanged(screens) => {
                let event = Event::DisplayConfigurationChange(DisplayConfigurationChangeEvent {
                    screens,
                });
                self.deliver(app, None, event);
            },
            NativeEvent::Configure { surface, configure } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let events = self.registry.borrow_mut().configure(window_id, &configure);
                self.deliver_all(app, window_id, events);
            },
            NativeEvent::SurfaceMoved { surface, origin } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.registry.borrow_mut().moved(window_id, origin);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::Close { surface } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.registry.borrow_mut().close_requested(window_id);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::SurfaceEnterScreen { surface, screen } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.registry.borrow_mut().enter_screen(window_id, screen);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::PreferredScale { surface, scale } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.registry.borrow_mut().rescale(window_id, scale);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::Occluded { surface, occluded } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.registry.borrow_mut().occlude(window_id, occluded);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::FrameDone { surface } => {
                let Some(window_id) = self.window_for(surface) else { return };
                self.registry.borrow_mut().frame_done(window_id);
            },

            NativeEvent::KeyboardEnter { surface } => self.keyboard_focus(app, surface, true),
            NativeEvent::KeyboardLeave { surface } => self.keyboard_focus(app, surface, false),
            NativeEvent::Key { code, key, characters, pressed, repeat, time } => {
                let Some(window_id) = self.key_window() else {
                    trace!(?code, "key without keyboard focus dropped");
                    return;
                };
                let modifiers = self.modifiers.get();
                let event = if pressed {
                    Event::KeyDown(KeyDownEvent {
                        modifiers,
                        code,
                        key,
                        characters,
                        is_repeat: repeat,
                        timestamp: time,
                    })
                } else {
                    Event::KeyUp(KeyUpEvent { modifiers, code, key, characters, timestamp: time })
                };
                self.deliver(app, Some(window_id), event);
            },
            NativeEvent::Modifiers { modifiers, code, time } => {
                if self.modifiers.replace(modifiers) == modifiers {
                    return;
                }
                let Some(window_id) = self.key_window() else { return };
                let event = Event::ModifiersChanged(ModifiersChangedEvent {
                    modifiers,
                    code,
                    timestamp: time,
                });
                self.deliver(app, Some(window_id), event);
            },

            NativeEvent::PointerEnter { surface, position, time } => {
                let Some(window_id) = self.window_for(surface) else { return };
                {
                    let mut pointer = self.pointer.borrow_mut();
                    pointer.window_id = Some(window_id);
                    pointer.position = position;
                    pointer.buttons.clear();
                }
                let event = Event::MouseEntered(MouseEnteredEvent {
                    location_in_window: position,
                    timestamp: time,
                });
                self.deliver(app, Some(window_id), event);
            },
            NativeEvent::PointerLeave { surface, time } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let position = {
                    let mut pointer = self.pointer.borrow_mut();
                    if pointer.window_id != Some(window_id) {
                        return;
                    }
                    pointer.window_id = None;
                    pointer.buttons.clear();
                    pointer.position
                };
                let event = Event::MouseExited(MouseExitedEvent {
                    location_in_window: position,
                    timestamp: time,
                });
                self.deliver(app, Some(window_id), event);
            },
            NativeEvent::PointerMotion { position, time } => {
                let (window_id, dragging) = {
                    let mut pointer = self.pointer.borrow_mut();
                    pointer.position = position;
                    (pointer.window_id, pointer.buttons.first().copied())
                };
                let Some(window_id) = window_id else { return };
                let event = match dragging {
                    Some(button) => Event::MouseDragged(MouseDraggedEvent {
                        button,
                        location_in_window: position,
                        timestamp: time,
                    }),
                    None => Event::MouseMoved(MouseMovedEvent {
                        location_in_window: position,
                        timestamp: time,
                    }),
                };
                self.deliver(app, Some(window_id), event);
            },
            NativeEvent::PointerButton { button, pressed, time } => {
                let button = MouseButton::from_linux_button(button);
                let (window_id, position) = {
                    let mut pointer = self.pointer.borrow_mut();
                    if pressed {
                        if !pointer.buttons.contains(&button) {
                            pointer.buttons.push(button);
                        }
                    } else {
                        pointer.buttons.retain(|held| *held != button);
                    }
                    (pointer.window_id, pointer.position)
                };
                let Some(window_id) = window_id else { return };
                let event = if pressed {
                    Event::MouseDown(MouseDownEvent {
                        button,
                        location_in_window: position,
                        timestamp: time,
                    })
                } else {
                    Event::MouseUp(MouseUpEvent {
                        button,
                        location_in_window: position,
                        timestamp: time,
                    })
                };
                self.deliver(app, Some(window_id), event);
            },
            NativeEvent::PointerAxis { delta_x, delta_y, precise, time } => {
                let (window_id, position) = {
                    let pointer = self.pointer.borrow();
                    (pointer.window_id, pointer.position)
                };
                let Some(window_id) = window_id else { return };
                let event = Event::ScrollWheel(ScrollWheelEvent {
                    scrolling_delta_x: delta_x,
                    scrolling_delta_y: delta_y,
                    has_precise_scrolling_deltas: precise,
                    location_in_window: position,
                    timestamp: time,
                });
                self.deliver(app, Some(window_id), event);
            },

            NativeEvent::TextInputEnter { surface } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let event = self.text_input.borrow_mut().enter(window_id);
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::TextInputLeave { surface } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let (event, disabled) = self.text_input.borrow_mut().leave(window_id);
                if disabled {
                    self.compositor.borrow_mut().text_input_disable();
                }
                self.deliver_all(app, window_id, event);
            },
            NativeEvent::PreeditString { text, cursor_begin, cursor_end } => {
                self.text_input.borrow_mut().preedit_string(text, cursor_begin, cursor_end);
            },
            NativeEvent::CommitString { text } => {
                self.text_input.borrow_mut().commit_string(text);
            },
            NativeEvent::DeleteSurroundingText { before_length, after_length } => {
                self.text_input.borrow_mut().delete_surrounding_text(before_length, after_length);
            },
            NativeEvent::TextInputDone { serial } => {
                let batch = self.text_input.borrow_mut().done(serial);
                let Some((window_id, event, report)) = batch else { return };
                if let Some(report) = report {
                    self.compositor.borrow_mut().text_input_set_surrounding(
                        &report.text,
                        report.cursor,
                        report.cursor,
                    );
                }
                self.deliver(app, Some(window_id), event);
            },

            NativeEvent::Selection { source, offer } => {
                let event = self.negotiator.borrow_mut().selection(source, offer);
                self.deliver(app, None, event);
            },
            NativeEvent::DragEnter { serial, surface, position, offer, source_actions } => {
                let Some(window_id) = self.window_for(surface) else { return };
                let query = self.negotiator.borrow_mut().drag_enter(
                    serial,
                    window_id,
                    position,
                    offer,
                    source_actions,
                );
                let response = self.with_app(app, |app, event_loop| {
                    app.drag_and_drop_query(event_loop, &query)
                });
                self.negotiator.borrow_mut().respond(&response);
            },
            NativeEvent::DragMotion { position, .. } => {
                let query = self.negotiator.borrow_mut().drag_motion(position);
                let Some(query) = query else { return };
                let response = self.with_app(app, |app, event_loop| {
                    app.drag_and_drop_query(event_loop, &query)
                });
                self.negotiator.borrow_mut().respond(&response);
            },
            NativeEvent::DragLeave => {
                let window_id = self.negotiator.borrow_mut().drag_leave();
                if let Some(window_id) = window_id {
                    self.deliver(app, Some(window_id), Event::DragAndDropLeave);
                }
            },
            NativeEvent::Drop { serial } => {
                let outcome = self.negotiator.borrow_mut().drop(serial);
                match outcome {
                    DropOutcome::Idle => (),
                    DropOutcome::Left(window_id) => {
                        self.deliver(app, Some(window_id), Event::DragAndDropLeave);
                    },
                    DropOutcome::Perform {
                        window_id,
                        offer,
                        mime_type,
                        action,
                        location_in_window,
                    } => {
                        let data = offer.receive(&mime_type).unwrap_or_else(|| {
                            warn!(%mime_type, "reading the drop failed, delivering no data");
                            Vec::new()
                        });
                        offer.finish(action);
                        let event = Event::DropPerformed(DropPerformedEvent {
                            content: DataTransferContent { mime_type, data },
                            action,
                            location_in_window,
                        });
                        self.deliver(app, Some(window_id), event);
                    },
                }
            },
            NativeEvent::SourceSend { source, serial, mime_type, reply } => {
                let allowed = self.negotiator.borrow().serve(source, serial, &mime_type);
                let data = if allowed {
                    self.with_app(app, |app, event_loop| {
                        app.data_transfer_data(event_loop, source, &mime_type)
                    })
                } else {
                    None
                };
                if reply.send(data).is_err() {
                    debug!(?source, %mime_type, "data requester went away");
                }
            },
            NativeEvent::SourceCancelled { source, serial } => {
                let event = self.negotiator.borrow_mut().source_cancelled(source, serial);
                if let Some(event) = event {
                    self.deliver(app, None, event);
                }
            },
            NativeEvent::DragSourceFinished { serial, action } => {
                let finished = self.negotiator.borrow_mut().drag_source_finished(serial, action);
                if let Some((origin, event)) = finished {
                    let origin =
                        origin.filter(|window_id| self.registry.borrow().is_alive(*window_id));
                    self.deliver(app, origin, event);
                }
            },

            NativeEvent::ThemeChanged(theme) => {
                self.deliver(app, None, Event::AppearanceChange(AppearanceChangeEvent { theme }));
            },
            NativeEvent::TerminationRequest => {
                let terminate =
                    self.with_app(app, |app, event_loop| app.should_terminate(event_loop));
                if terminate {
                    debug!("termination requested, exiting");
                    self.exit();
                } else {
                    debug!("termination refused by the application");
                }
            },
        }
    }

    /// Cancel every in-flight transfer and composition. Used when the loop stops.
    pub(crate) fn cancel_negotiations(&self) {
        let sources = self.negotiator.borrow_mut().cancel_all();
        let mut compositor = self.compositor.borrow_mut();
        for source in sources {
            compositor.release_source(source);
        }
        if self.text_input.borrow_mut().disable() {
            compositor.text_input_disable();
        }
        let dropped = self.fetches.borrow_mut().drain(..).count();
        if dropped > 0 {
            debug!(dropped, "pending pastes cancelled");
        }
    }

    /// Tear every window down, as a disconnect would.
    pub(crate) fn disconnect(&self) {
        self.cancel_negotiations();
        self.negotiator.borrow_mut().forget_offers();
        let mut registry = self.registry.borrow_mut();
        for window_id in registry.window_ids() {
            registry.remove(window_id);
        }
        self.compositor.borrow_mut().disconnect();
    }

    fn window_surface(
        &self,
        operation: &str,
        window_id: WindowId,
    ) -> Result<Option<SurfaceId>, RequestError> {
        self.main_thread.assert_current(operation);
        Ok(self.registry.borrow().get(window_id)?.map(|entry| entry.surface))
    }

    /// Forward a request to the compositor. Destroyed windows are a no-op.
    fn request(
        &self,
        operation: &str,
        window_id: WindowId,
        request: impl FnOnce(&mut Compositor, SurfaceId) -> Result<(), RequestError>,
    ) -> Result<(), RequestError> {
        let Some(surface) = self.window_surface(operation, window_id)? else {
            return Ok(());
        };
        request(&mut self.compositor.borrow_mut(), surface)
    }

    fn set_size_bound(
        &self,
        operation: &str,
        window_id: WindowId,
        min_size: Option<Option<LogicalSize<f64>>>,
        max_size: Option<Option<LogicalSize<f64>>>,
    ) -> Result<(), RequestError> {
        self.request(operation, window_id, |compositor, surface| {
            compositor.set_size_bounds(surface, min_size, max_size)
        })?;
        if let Some(entry) = self.registry.borrow_mut().get_mut(window_id)? {
            if let Some(min_size) = min_size {
                entry.min_size = min_size;
            }
            if let Some(max_size) = max_size {
                entry.max_size = max_size;
            }
        }
        Ok(())
    }

    fn put_selection(
        &self,
        operation: &str,
        source: DataSource,
        mime_types: Vec<String>,
    ) -> Result<DataTransferSerial, RequestError> {
        self.main_thread.assert_current(operation);
        if mime_types.is_empty() {
            warn!(?source, "selection offered without MIME types");
            return Err(RequestError::Ignored);
        }
        let serial = self.compositor.borrow_mut().set_selection(source, mime_types.clone());
        self.negotiator.borrow_mut().own(source, serial, mime_types, None);
        Ok(serial)
    }

    fn paste(
        &self,
        operation: &str,
        source: DataSource,
        serial: DataTransferSerial,
        supported_mime_types: &[&str],
    ) -> bool {
        self.main_thread.assert_current(operation);
        let fetch = self.negotiator.borrow().paste(source, serial, supported_mime_types);
        match fetch {
            Some(fetch) => {
                trace!(?fetch, "paste scheduled");
                self.fetches.borrow_mut().push_back(fetch);
                true
            },
            None => {
                debug!(?source, ?supported_mime_types, "nothing to paste");
                false
            },
        }
    }
}

impl ActiveEventLoop for LoopState {
    fn create_proxy(&self) -> EventLoopProxy {
        EventLoopProxy::new(Arc::new(ProxyProvider {
            sender: self.sender.clone(),
            main_thread: self.main_thread,
        }))
    }

    fn is_event_loop_thread(&self) -> bool {
        self.main_thread.is_current()
    }

    fn create_window(&self, window_attributes: WindowAttributes) -> Result<WindowId, RequestError> {
        self.main_thread.assert_current("create_window");
        let window_id = WindowId::next_unique();
        let (surface, screen) = {
            let mut compositor = self.compositor.borrow_mut();
            let surface = compositor.create_surface(window_id, &window_attributes)?;
            (surface, compositor.host_screen())
        };
        self.registry.borrow_mut().insert(window_id, surface, &window_attributes, screen.as_ref());
        debug!(?window_id, ?surface, "window created");
        Ok(window_id)
    }

    fn destroy_window(&self, window_id: WindowId) -> Result<(), RequestError> {
        let Some(surface) = self.window_surface("destroy_window", window_id)? else {
            return Ok(());
        };

        self.compositor.borrow_mut().destroy_surface(surface);
        self.registry.borrow_mut().remove(window_id);
        if self.text_input.borrow_mut().window_destroyed(window_id) {
            self.compositor.borrow_mut().text_input_disable();
        }
        if self.negotiator.borrow_mut().window_destroyed(window_id) {
            debug!(?window_id, "drag over a destroyed window cancelled");
        }
        {
            let mut pointer = self.pointer.borrow_mut();
            if pointer.window_id == Some(window_id) {
                *pointer = PointerFocus::default();
            }
        }
        Ok(())
    }

    fn window_lifecycle(
        &self,
        window_id: WindowId,
    ) -> Result<Option<WindowLifecycle>, RequestError> {
        self.main_thread.assert_current("window_lifecycle");
        if !window_id.was_issued() {
            return Err(RequestError::UnknownWindow(window_id));
        }
        let registry = self.registry.borrow();
        let lifecycle =
            registry.get(window_id)?.map_or(WindowLifecycle::Destroyed, |entry| entry.lifecycle);
        Ok(Some(lifecycle))
    }

    fn window_size(&self, window_id: WindowId) -> Result<Option<LogicalSize<f64>>, RequestError> {
        self.main_thread.assert_current("window_size");
        Ok(self.registry.borrow().get(window_id)?.map(|entry| entry.size))
    }

    fn set_window_size(
        &self,
        window_id: WindowId,
        size: LogicalSize<f64>,
    ) -> Result<(), RequestError> {
        self.request("set_window_size", window_id, |compositor, surface| {
            compositor.set_size(surface, size)
        })
    }

    fn window_title(&self, window_id: WindowId) -> Result<Option<String>, RequestError> {
        self.main_thread.assert_current("window_title");
        Ok(self.registry.borrow().get(window_id)?.map(|entry| entry.title.clone()))
    }

    fn set_window_title(&self, window_id: WindowId, title: &str) -> Result<(), RequestError> {
        self.request("set_window_title", window_id, |compositor, surface| {
            compositor.set_title(surface, title)
        })?;
        if let Some(entry) = self.registry.borrow_mut().get_mut(window_id)? {
            entry.title = title.to_owned();
        }
        Ok(())
    }

    fn set_min_window_size(
        &self,
        window_id: WindowId,
        size: Option<LogicalSize<f64>>,
    ) -> Result<(), RequestError> {
        self.set_size_bound("set_min_window_size", window_id, Some(size), None)
    }

    fn set_max_window_size(
        &self,
        window_id: WindowId,
        size: Option<LogicalSize<f64>>,
    ) -> Result<(), RequestError> {
        self.set_size_bound("set_max_window_size", window_id, None, Some(size))
    }

    fn set_fullscreen(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("set_fullscreen", window_id, |compositor, surface| {
            compositor.set_fullscreen(surface, true)
        })
    }

    fn unset_fullscreen(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("unset_fullscreen", window_id, |compositor, surface| {
            compositor.set_fullscreen(surface, false)
        })
    }

    fn maximize(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("maximize", window_id, |compositor, surface| {
            compositor.set_maximized(surface, true)
        })
    }

    fn unmaximize(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("unmaximize", window_id, |compositor, surface| {
            compositor.set_maximized(surface, false)
        })
    }

    fn minimize(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("minimize", window_id, |compositor, surface| compositor.minimize(surface))
    }

    fn start_move(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.request("start_move", window_id, |compositor, surface| {
            compositor.start_interactive(surface, InteractiveOp::Move)
        })
    }

    fn start_resize(
        &self,
        window_id: WindowId,
        edge: WindowResizeEdge,
    ) -> Result<(), RequestError> {
        if edge == WindowResizeEdge::None {
            self.window_surface("start_resize", window_id)?;
            return Err(RequestError::Ignored);
        }
        self.request("start_resize", window_id, |compositor, surface| {
            compositor.start_interactive(surface, InteractiveOp::Resize(edge))
        })
    }

    fn show_window_menu(
        &self,
        window_id: WindowId,
        position: LogicalPosition<f64>,
    ) -> Result<(), RequestError> {
        self.request("show_window_menu", window_id, |compositor, surface| {
            compositor.start_interactive(surface, InteractiveOp::WindowMenu(position))
        })
    }

    fn set_pointer_shape(
        &self,
        window_id: WindowId,
        shape: PointerShape,
    ) -> Result<(), RequestError> {
        self.request("set_pointer_shape", window_id, |compositor, surface| {
            compositor.set_pointer_shape(surface, shape)
        })?;
        if let Some(entry) = self.registry.borrow_mut().get_mut(window_id)? {
            entry.pointer_shape = shape;
        }
        Ok(())
    }

    fn request_redraw(&self, window_id: WindowId) -> Result<(), RequestError> {
        self.main_thread.assert_current("request_redraw");
        let mut registry = self.registry.borrow_mut();
        if registry.get(window_id)?.is_some() {
            registry.request_redraw(window_id);
        }
        Ok(())
    }

    fn request_decoration_mode(
        &self,
        window_id: WindowId,
        mode: Option<DecorationMode>,
    ) -> Result<(), RequestError> {
        self.request("request_decoration_mode", window_id, |compositor, surface| {
            compositor.request_decoration_mode(surface, mode)
        })
    }

    fn screens(&self) -> Vec<ScreenInfo> {
        self.main_thread.assert_current("screens");
        self.compositor.borrow().screens()
    }

    fn text_input_enable(&self, context: TextInputContext) -> Result<(), RequestError> {
        self.main_thread.assert_current("text_input_enable");
        let key_window = self.key_window();
        let (window_id, request) = self.text_input.borrow_mut().enable(key_window, &context)?;
        let surface = self.registry.borrow().get(window_id)?.map(|entry| entry.surface);
        if let Some(surface) = surface {
            self.compositor.borrow_mut().text_input_enable(surface, request);
        }
        Ok(())
    }

    fn text_input_update(&self, context: TextInputContext) -> Result<(), RequestError> {
        self.main_thread.assert_current("text_input_update");
        let request = self.text_input.borrow_mut().update(&context)?;
        self.compositor.borrow_mut().text_input_update(request);
        Ok(())
    }

    fn text_input_disable(&self) -> Result<(), RequestError> {
        self.main_thread.assert_current("text_input_disable");
        if self.text_input.borrow_mut().disable() {
            self.compositor.borrow_mut().text_input_disable();
        }
        Ok(())
    }

    fn text_input_state(&self) -> Option<ComposingText> {
        self.main_thread.assert_current("text_input_state");
        self.text_input.borrow().composing().cloned()
    }

    fn clipboard_put(&self, mime_types: Vec<String>) -> Result<DataTransferSerial, RequestError> {
        self.put_selection("clipboard_put", DataSource::Clipboard, mime_types)
    }

    fn clipboard_paste(&self, serial: DataTransferSerial, supported_mime_types: &[&str]) -> bool {
        self.paste("clipboard_paste", DataSource::Clipboard, serial, supported_mime_types)
    }

    fn clipboard_mime_types(&self) -> Vec<String> {
        self.main_thread.assert_current("clipboard_mime_types");
        self.negotiator.borrow().mime_types(DataSource::Clipboard)
    }

    fn primary_selection_put(
        &self,
        mime_types: Vec<String>,
    ) -> Result<DataTransferSerial, RequestError> {
        self.put_selection("primary_selection_put", DataSource::PrimarySelection, mime_types)
    }

    fn primary_selection_paste(
        &self,
        serial: DataTransferSerial,
        supported_mime_types: &[&str],
    ) -> bool {
        self.paste(
            "primary_selection_paste",
            DataSource::PrimarySelection,
            serial,
            supported_mime_types,
        )
    }

    fn primary_selection_mime_types(&self) -> Vec<String> {
        self.main_thread.assert_current("primary_selection_mime_types");
        self.negotiator.borrow().mime_types(DataSource::PrimarySelection)
    }

    fn start_drag(
        &self,
        window_id: WindowId,
        mime_types: Vec<String>,
        actions: DragAndDropActions,
    ) -> Result<DataTransferSerial, RequestError> {
        let Some(surface) = self.window_surface("start_drag", window_id)? else {
            return Err(RequestError::Ignored);
        };
        if mime_types.is_empty() || actions.is_empty() {
            warn!(?window_id, "drag started without MIME types or actions");
            return Err(RequestError::Ignored);
        }
        let serial =
            self.compositor.borrow_mut().start_drag(surface, mime_types.clone(), actions)?;
        self.negotiator.borrow_mut().own(
            DataSource::DragAndDrop,
            serial,
            mime_types,
            Some(window_id),
        );
        Ok(serial)
    }

    fn create_frame_pump(
        &self,
        screen_id: ScreenId,
        callback: Box<dyn FnMut() + Send + 'static>,
    ) -> Result<FramePump, RequestError> {
        self.main_thread.assert_current("create_frame_pump");
        let screen = self.compositor.borrow().screen(screen_id);
        let screen = screen.ok_or(RequestError::UnknownScreen(screen_id))?;
        ThreadFramePump::spawn(&screen, callback)
    }

    fn exit(&self) {
        self.exit.set(true);
    }

    fn exiting(&self) -> bool {
        self.exit.get()
    }
}
