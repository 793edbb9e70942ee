//! A backend standing in for a Wayland-style compositor.
//!
//! The compositor lives on the event-loop thread and answers requests the way a real one would:
//! surfaces get configure events, interactive operations need a pointer press, offers carry
//! MIME types and are read lazily.
//!
//! Everything the real connection would read from its socket is injected through a
//! [`HeadlessHandle`], from any thread. Injected notifications are queued and translated on the
//! event-loop thread, in order.
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use dpi::{LogicalPosition, LogicalSize};
use fenestra_core::data_transfer::{
    DataSource, DataTransferSerial, DragAndDropAction, DragAndDropActions,
};
use fenestra_core::event::Timestamp;
use fenestra_core::keyboard::{Key, KeyCode, KeyModifiersSet, SmolStr};
use fenestra_core::screen::{ScreenId, ScreenInfo};
use fenestra_core::text_input::TextInputContentPurpose;
use fenestra_core::window::{
    DecorationMode, PointerShape, Theme, WindowCapabilities, WindowId, WindowResizeEdge,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dispatcher::Message;

pub(crate) mod compositor;
mod offer;

pub use offer::{DataOffer, DataOfferProvider, InMemoryOffer};

/// Native handle of a surface. Unrelated to the [`WindowId`] handed to the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceId(pub u32);

/// Setup of the headless compositor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeadlessConfig {
    /// Connected screens. The first primary one hosts new windows.
    pub screens: Vec<ScreenInfo>,
    /// Refuse to create more windows than this.
    pub max_windows: Option<usize>,
    /// Size of windows created without one.
    pub default_size: LogicalSize<f64>,
    /// Decoration mode picked when the window has no preference.
    pub decoration_mode: DecorationMode,
    pub capabilities: WindowCapabilities,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            screens: vec![ScreenInfo {
                id: ScreenId(1),
                is_primary: true,
                name: Some("HEADLESS-1".into()),
                origin: LogicalPosition::new(0.0, 0.0),
                size: LogicalSize::new(1920.0, 1080.0),
                scale_factor: 1.0,
                refresh_rate_millihertz: NonZeroU32::new(60_000),
            }],
            max_windows: None,
            default_size: LogicalSize::new(800.0, 600.0),
            decoration_mode: DecorationMode::ServerSide,
            capabilities: WindowCapabilities::default(),
        }
    }
}

/// The state the compositor asks a surface to take.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceConfigure {
    /// `None` lets the client keep its current size.
    pub size: Option<LogicalSize<f64>>,
    pub active: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    /// An interactive resize is in progress.
    pub resizing: bool,
    pub decoration_mode: DecorationMode,
    pub capabilities: WindowCapabilities,
}

/// A notification as read from the native connection.
#[derive(Debug)]
pub enum NativeEvent {
    /// The set of screens or one of their properties changed.
    ScreensChanged(Vec<ScreenInfo>),
    Configure { surface: SurfaceId, configure: SurfaceConfigure },
    /// The window manager moved the surface.
    SurfaceMoved { surface: SurfaceId, origin: LogicalPosition<f64> },
    /// The user asked to close the surface, from the title bar or a shortcut.
    Close { surface: SurfaceId },
    SurfaceEnterScreen { surface: SurfaceId, screen: ScreenId },
    PreferredScale { surface: SurfaceId, scale: f64 },
    Occluded { surface: SurfaceId, occluded: bool },
    /// The compositor is ready for a new frame of `surface`.
    FrameDone { surface: SurfaceId },

    KeyboardEnter { surface: SurfaceId },
    KeyboardLeave { surface: SurfaceId },
    Key {
        code: KeyCode,
        key: Key,
        characters: Option<SmolStr>,
        pressed: bool,
        repeat: bool,
        time: Timestamp,
    },
    Modifiers { modifiers: KeyModifiersSet, code: Option<KeyCode>, time: Timestamp },

    PointerEnter { surface: SurfaceId, position: LogicalPosition<f64>, time: Timestamp },
    PointerLeave { surface: SurfaceId, time: Timestamp },
    PointerMotion { position: LogicalPosition<f64>, time: Timestamp },
    /// `button` is a Linux `BTN_*` code.
    PointerButton { button: u32, pressed: bool, time: Timestamp },
    PointerAxis { delta_x: f64, delta_y: f64, precise: bool, time: Timestamp },

    TextInputEnter { surface: SurfaceId },
    TextInputLeave { surface: SurfaceId },
    /// Cursor offsets are bytes into `text`, `-1` hides the cursor.
    PreeditString { text: Option<String>, cursor_begin: i32, cursor_end: i32 },
    CommitString { text: Option<String> },
    DeleteSurroundingText { before_length: u32, after_length: u32 },
    /// Apply the buffered text-input notifications as one batch.
    TextInputDone { serial: u32 },

    /// A new clipboard or primary selection, `None` when it was cleared.
    Selection { source: DataSource, offer: Option<DataOffer> },
    DragEnter {
        serial: u32,
        surface: SurfaceId,
        position: LogicalPosition<f64>,
        offer: DataOffer,
        source_actions: DragAndDropActions,
    },
    DragMotion { position: LogicalPosition<f64>, time: Timestamp },
    DragLeave,
    Drop { serial: u32 },

    /// Another client wants the data of a source this application owns.
    SourceSend {
        source: DataSource,
        serial: DataTransferSerial,
        mime_type: String,
        reply: mpsc::Sender<Option<Vec<u8>>>,
    },
    /// A source this application owned was replaced.
    SourceCancelled { source: DataSource, serial: DataTransferSerial },
    /// A drag started by this application ended, `action` is `None` when it was cancelled.
    DragSourceFinished { serial: DataTransferSerial, action: Option<DragAndDropAction> },

    ThemeChanged(Theme),
    /// The session asks the application to quit.
    TerminationRequest,
}

/// An interactive operation the compositor is running for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractiveOp {
    Move,
    Resize(WindowResizeEdge),
    WindowMenu(LogicalPosition<f64>),
}

/// The compositor's view of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub window_id: WindowId,
    pub title: String,
    pub app_id: Option<String>,
    pub size: LogicalSize<f64>,
    pub origin: LogicalPosition<f64>,
    pub min_size: Option<LogicalSize<f64>>,
    pub max_size: Option<LogicalSize<f64>>,
    pub active: bool,
    pub fullscreen: bool,
    pub maximized: bool,
    pub minimized: bool,
    pub decoration_mode: DecorationMode,
    pub capabilities: WindowCapabilities,
    pub pointer_shape: PointerShape,
    pub interactive: Option<InteractiveOp>,
    /// Frames committed by the client.
    pub frames: u64,
    /// Size to restore when leaving fullscreen or maximized.
    pub(crate) restore_size: Option<LogicalSize<f64>>,
}

/// The compositor's view of the text-input object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeTextInputState {
    pub enabled: bool,
    pub surface: Option<SurfaceId>,
    pub surrounding_text: String,
    /// Byte offset into `surrounding_text`.
    pub cursor: usize,
    /// Byte offset of the other end of the selection.
    pub anchor: usize,
    pub content_purpose: TextInputContentPurpose,
    pub multiline: bool,
    pub cursor_rectangle: (LogicalPosition<f64>, LogicalSize<f64>),
    /// Number of state commits, echoed in `TextInputDone`.
    pub commit_count: u32,
}

/// A source this application put on the clipboard, the primary selection or a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSource {
    pub serial: DataTransferSerial,
    pub mime_types: Vec<String>,
    pub actions: DragAndDropActions,
}

#[derive(Debug, Default)]
pub(crate) struct NativeShared {
    pub(crate) screens: Vec<ScreenInfo>,
    pub(crate) surfaces: HashMap<SurfaceId, SurfaceSnapshot>,
    pub(crate) text_input: NativeTextInputState,
    pub(crate) sources: HashMap<DataSource, NativeSource>,
}

pub(crate) type SharedState = Arc<Mutex<NativeShared>>;

pub(crate) fn lock(shared: &SharedState) -> MutexGuard<'_, NativeShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The native connection as seen from other threads.
///
/// Cloneable and usable from any thread. Sent notifications are delivered on the event-loop
/// thread in the order they were sent, interleaved with tasks submitted through an
/// [`EventLoopProxy`].
///
/// [`EventLoopProxy`]: crate::event_loop::EventLoopProxy
#[derive(Clone)]
pub struct HeadlessHandle {
    pub(crate) sender: calloop::channel::Sender<Message>,
    pub(crate) shared: SharedState,
}

impl HeadlessHandle {
    /// Queue a native notification. Returns `false` once the event loop is gone.
    pub fn send(&self, event: NativeEvent) -> bool {
        match self.sender.send(Message::Native(event)) {
            Ok(()) => true,
            Err(mpsc::SendError(message)) => {
                tracing::debug!(?message, "native event dropped, the event loop is gone");
                false
            },
        }
    }

    /// The native surface of a live window.
    pub fn surface(&self, window_id: WindowId) -> Option<SurfaceId> {
        lock(&self.shared)
            .surfaces
            .iter()
            .find_map(|(surface, snapshot)| (snapshot.window_id == window_id).then_some(*surface))
    }

    pub fn surface_state(&self, surface: SurfaceId) -> Option<SurfaceSnapshot> {
        lock(&self.shared).surfaces.get(&surface).cloned()
    }

    pub fn screens(&self) -> Vec<ScreenInfo> {
        lock(&self.shared).screens.clone()
    }

    pub fn text_input(&self) -> NativeTextInputState {
        lock(&self.shared).text_input.clone()
    }

    /// The source this application currently owns for `source`.
    pub fn owned_source(&self, source: DataSource) -> Option<NativeSource> {
        lock(&self.shared).sources.get(&source).cloned()
    }

    /// Ask for the data of an owned source, as another client pasting it would.
    ///
    /// The reply arrives once the event loop handled the request. An empty reply is `None`.
    pub fn request_data(
        &self,
        source: DataSource,
        serial: DataTransferSerial,
        mime_type: impl Into<String>,
    ) -> mpsc::Receiver<Option<Vec<u8>>> {
        let (reply, receiver) = mpsc::channel();
        self.send(NativeEvent::SourceSend { source, serial, mime_type: mime_type.into(), reply });
        receiver
    }
}

impl fmt::Debug for HeadlessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessHandle").finish_non_exhaustive()
    }
}
