use std::fmt::{self, Debug};
use std::sync::Arc;

use dpi::{LogicalPosition, LogicalSize};

use crate::data_transfer::{DataTransferSerial, DragAndDropActions};
use crate::error::RequestError;
use crate::frame_pump::FramePump;
use crate::screen::{ScreenId, ScreenInfo};
use crate::text_input::{ComposingText, TextInputContext};
use crate::window::{
    DecorationMode, PointerShape, WindowAttributes, WindowId, WindowLifecycle, WindowResizeEdge,
};

/// Work submitted to the event-loop thread through [`EventLoopProxy::run_on_event_loop_async`].
pub type Task = Box<dyn FnOnce(&dyn ActiveEventLoop) + Send + 'static>;

/// The event loop as seen from inside [`ApplicationHandler`] callbacks and dispatched tasks.
///
/// Every method must be called on the event-loop thread, which is guaranteed when going through
/// the reference handed to callbacks. Window methods return [`RequestError::UnknownWindow`] for
/// ids that were never issued, and do nothing for windows that were already destroyed.
///
/// Mutators never report new geometry. The outcome of a request arrives as events.
///
/// [`ApplicationHandler`]: crate::application::ApplicationHandler
pub trait ActiveEventLoop: fmt::Debug {
    /// Creates an [`EventLoopProxy`] that can be used to submit work to the event loop, possibly
    /// from another thread.
    fn create_proxy(&self) -> EventLoopProxy;

    /// Whether the caller runs on the event-loop thread.
    fn is_event_loop_thread(&self) -> bool;

    /// Create a window.
    ///
    /// The window starts in [`WindowLifecycle::Created`] and receives
    /// [`Event::WindowConfigure`] once the platform configured it.
    ///
    /// [`Event::WindowConfigure`]: crate::event::Event::WindowConfigure
    fn create_window(&self, window_attributes: WindowAttributes) -> Result<WindowId, RequestError>;

    /// Release the native window, cancel its text input and the drags targeting it, and retire
    /// the id.
    fn destroy_window(&self, window_id: WindowId) -> Result<(), RequestError>;

    /// `None` once the window was destroyed.
    fn window_lifecycle(&self, window_id: WindowId)
        -> Result<Option<WindowLifecycle>, RequestError>;

    fn window_size(&self, window_id: WindowId) -> Result<Option<LogicalSize<f64>>, RequestError>;

    /// Ask for a new size. The window manager may pick another one.
    fn set_window_size(
        &self,
        window_id: WindowId,
        size: LogicalSize<f64>,
    ) -> Result<(), RequestError>;

    fn window_title(&self, window_id: WindowId) -> Result<Option<String>, RequestError>;

    fn set_window_title(&self, window_id: WindowId, title: &str) -> Result<(), RequestError>;

    fn set_min_window_size(
        &self,
        window_id: WindowId,
        size: Option<LogicalSize<f64>>,
    ) -> Result<(), RequestError>;

    fn set_max_window_size(
        &self,
        window_id: WindowId,
        size: Option<LogicalSize<f64>>,
    ) -> Result<(), RequestError>;

    fn set_fullscreen(&self, window_id: WindowId) -> Result<(), RequestError>;

    fn unset_fullscreen(&self, window_id: WindowId) -> Result<(), RequestError>;

    fn maximize(&self, window_id: WindowId) -> Result<(), RequestError>;

    fn unmaximize(&self, window_id: WindowId) -> Result<(), RequestError>;

    fn minimize(&self, window_id: WindowId) -> Result<(), RequestError>;

    /// Start an interactive move driven by the pointer.
    ///
    /// Needs a pointer button held down on the window, otherwise the request is
    /// [`RequestError::Ignored`].
    fn start_move(&self, window_id: WindowId) -> Result<(), RequestError>;

    /// Start an interactive resize from `edge`. Same requirements as [`Self::start_move`].
    fn start_resize(&self, window_id: WindowId, edge: WindowResizeEdge)
        -> Result<(), RequestError>;

    /// Show the window manager's window menu. Same requirements as [`Self::start_move`].
    fn show_window_menu(
        &self,
        window_id: WindowId,
        position: LogicalPosition<f64>,
    ) -> Result<(), RequestError>;

    fn set_pointer_shape(&self, window_id: WindowId, shape: PointerShape)
        -> Result<(), RequestError>;

    /// Schedule an [`Event::WindowDraw`]. Requests are coalesced until the draw is delivered.
    ///
    /// [`Event::WindowDraw`]: crate::event::Event::WindowDraw
    fn request_redraw(&self, window_id: WindowId) -> Result<(), RequestError>;

    /// Ask for client-side or server-side decorations, `None` to let the platform pick.
    fn request_decoration_mode(
        &self,
        window_id: WindowId,
        mode: Option<DecorationMode>,
    ) -> Result<(), RequestError>;

    /// Fresh snapshot of the connected screens.
    fn screens(&self) -> Vec<ScreenInfo>;

    /// Start a text-input session on the key window.
    ///
    /// Requires an input method to be available, see [`Event::TextInputAvailability`].
    ///
    /// [`Event::TextInputAvailability`]: crate::event::Event::TextInputAvailability
    fn text_input_enable(&self, context: TextInputContext) -> Result<(), RequestError>;

    /// Report the state of the text field to the input method.
    fn text_input_update(&self, context: TextInputContext) -> Result<(), RequestError>;

    /// End the session, dropping any composition in progress.
    fn text_input_disable(&self) -> Result<(), RequestError>;

    /// The text of the current session with every batch applied, `None` when disabled.
    fn text_input_state(&self) -> Option<ComposingText>;

    /// Offer data on the clipboard. Payloads are requested lazily through
    /// [`ApplicationHandler::data_transfer_data`].
    ///
    /// [`ApplicationHandler::data_transfer_data`]: crate::application::ApplicationHandler::data_transfer_data
    fn clipboard_put(&self, mime_types: Vec<String>) -> Result<DataTransferSerial, RequestError>;

    /// Fetch the clipboard as the first of `supported_mime_types` it carries.
    ///
    /// Returns `false` when nothing matches. Otherwise [`Event::DataTransfer`] with the same
    /// `serial` is emitted once the data arrived.
    ///
    /// [`Event::DataTransfer`]: crate::event::Event::DataTransfer
    fn clipboard_paste(&self, serial: DataTransferSerial, supported_mime_types: &[&str]) -> bool;

    /// MIME types currently on the clipboard.
    fn clipboard_mime_types(&self) -> Vec<String>;

    fn primary_selection_put(
        &self,
        mime_types: Vec<String>,
    ) -> Result<DataTransferSerial, RequestError>;

    fn primary_selection_paste(
        &self,
        serial: DataTransferSerial,
        supported_mime_types: &[&str],
    ) -> bool;

    fn primary_selection_mime_types(&self) -> Vec<String>;

    /// Start dragging data out of `window_id`. Needs a pointer button held down on the window.
    ///
    /// Unlike the other window operations, a destroyed window is not a no-op: no drag can start
    /// from it, so this returns [`RequestError::Ignored`].
    fn start_drag(
        &self,
        window_id: WindowId,
        mime_types: Vec<String>,
        actions: DragAndDropActions,
    ) -> Result<DataTransferSerial, RequestError>;

    /// Create a stopped [`FramePump`] ticking at the refresh rate of `screen_id`.
    fn create_frame_pump(
        &self,
        screen_id: ScreenId,
        callback: Box<dyn FnMut() + Send + 'static>,
    ) -> Result<FramePump, RequestError>;

    /// Stop the event loop once the current callback returns.
    fn exit(&self);

    /// Returns whether the [`ActiveEventLoop`] is about to stop.
    ///
    /// Set by [`exit()`][Self::exit].
    fn exiting(&self) -> bool;
}

/// Control the [`ActiveEventLoop`], possibly from a different thread, without referencing it
/// directly.
#[derive(Clone, Debug)]
pub struct EventLoopProxy {
    pub(crate) proxy: Arc<dyn EventLoopProxyProvider>,
}

impl EventLoopProxy {
    pub fn new(proxy: Arc<dyn EventLoopProxyProvider>) -> Self {
        Self { proxy }
    }

    /// Whether the caller runs on the event-loop thread.
    pub fn is_event_loop_thread(&self) -> bool {
        self.proxy.is_event_loop_thread()
    }

    /// Run `task` on the event-loop thread and return immediately.
    ///
    /// Tasks from every thread share one queue and run one at a time in the order they were
    /// submitted, interleaved with event delivery. Tasks still queued when the loop stops are
    /// dropped without running.
    pub fn run_on_event_loop_async<F>(&self, task: F)
    where
        F: FnOnce(&dyn ActiveEventLoop) + Send + 'static,
    {
        self.proxy.send_task(Box::new(task));
    }

    /// Ask the event loop to stop, as [`ActiveEventLoop::exit`] would.
    pub fn request_exit(&self) {
        self.proxy.send_task(Box::new(|event_loop| event_loop.exit()));
    }
}

pub trait EventLoopProxyProvider: Send + Sync + Debug {
    /// See [`EventLoopProxy::run_on_event_loop_async`] for details.
    fn send_task(&self, task: Task);

    /// See [`EventLoopProxy::is_event_loop_thread`].
    fn is_event_loop_thread(&self) -> bool;
}

/// The return status for `pump_app_events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PumpStatus {
    /// Continue running external loop.
    Continue,
    /// Exit external loop.
    Exit(i32),
}
