//! Incoming notifications from the native windowing stack.
//!
//! Every notification is translated into one [`Event`] variant carrying only the fields relevant
//! to it. Events are handed to [`ApplicationHandler::event`] by reference and dropped right after
//! the call returns.
//!
//! [`ApplicationHandler::event`]: crate::application::ApplicationHandler::event
use std::time::Duration;

use dpi::{LogicalPosition, LogicalSize, PhysicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::data_transfer::{DataSource, DataTransferContent, DataTransferSerial, DragAndDropAction};
use crate::keyboard::{Key, KeyCode, KeyModifiersSet};
use crate::screen::{ScreenId, ScreenInfo};
use crate::text_input::TextInputEvent;
use crate::window::{DecorationMode, Theme, WindowCapabilities};

/// Monotonic time of an input event, in milliseconds, as delivered by the native input stack.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is later.
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Describes a button of a mouse controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl MouseButton {
    /// Map a Linux `BTN_*` code.
    pub fn from_linux_button(code: u32) -> Self {
        match code {
            0x110 => Self::Left,
            0x111 => Self::Right,
            0x112 => Self::Middle,
            0x113 | 0x116 => Self::Back,
            0x114 | 0x115 => Self::Forward,
            other => Self::Other(other as u16),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyDownEvent {
    pub modifiers: KeyModifiersSet,
    /// Physical key.
    pub code: KeyCode,
    /// Logical key after the layout was applied.
    pub key: Key,
    /// Text the key press produces, if any.
    pub characters: Option<SmolStr>,
    pub is_repeat: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyUpEvent {
    pub modifiers: KeyModifiersSet,
    pub code: KeyCode,
    pub key: Key,
    pub characters: Option<SmolStr>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModifiersChangedEvent {
    pub modifiers: KeyModifiersSet,
    /// The modifier key whose press or release caused the change, when known.
    pub code: Option<KeyCode>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseMovedEvent {
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

/// Pointer motion while a button is held.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseDraggedEvent {
    pub button: MouseButton,
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseEnteredEvent {
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseExitedEvent {
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseDownEvent {
    pub button: MouseButton,
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MouseUpEvent {
    pub button: MouseButton,
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScrollWheelEvent {
    pub scrolling_delta_x: f64,
    pub scrolling_delta_y: f64,
    /// `true` for touchpads and other pixel-precise devices, `false` for notched wheels.
    pub has_precise_scrolling_deltas: bool,
    pub location_in_window: LogicalPosition<f64>,
    pub timestamp: Timestamp,
}

/// The window manager (re)configured the window.
///
/// Sent once the window is first configured, and later whenever the decoration mode, the
/// capabilities or the maximized state change.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowConfigureEvent {
    pub size: LogicalSize<f64>,
    pub active: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    pub decoration_mode: DecorationMode,
    pub capabilities: WindowCapabilities,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowResizeEvent {
    pub size: LogicalSize<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowMoveEvent {
    pub origin: LogicalPosition<f64>,
}

/// Keyboard focus moved in or out of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowFocusChangeEvent {
    /// The window receives keyboard input.
    pub is_key: bool,
    /// The window is the application's frontmost window.
    pub is_main: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowFullScreenToggleEvent {
    pub is_full_screen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowScreenChangeEvent {
    pub new_screen_id: ScreenId,
}

/// The window should be redrawn.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowDrawEvent {
    pub size: PhysicalSize<u32>,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowScaleChangedEvent {
    pub new_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowOcclusionChangeEvent {
    pub is_occluded: bool,
}

/// An input method became available to, or went away from, the key window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextInputAvailabilityEvent {
    pub available: bool,
}

/// Another client offers data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataTransferAvailableEvent {
    pub source: DataSource,
    pub mime_types: Vec<String>,
}

/// Data fetched for a paste request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataTransferEvent {
    pub serial: DataTransferSerial,
    pub content: DataTransferContent,
}

/// A source this application owned was replaced or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataTransferCancelledEvent {
    pub source: DataSource,
}

/// Data was dropped onto a window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DropPerformedEvent {
    pub content: DataTransferContent,
    pub action: DragAndDropAction,
    pub location_in_window: LogicalPosition<f64>,
}

/// A drag started by this application ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragAndDropFinishedEvent {
    /// The action the destination performed, `None` when the drag was cancelled.
    pub action: Option<DragAndDropAction>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayConfigurationChangeEvent {
    pub screens: Vec<ScreenInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AppearanceChangeEvent {
    pub theme: Theme,
}

/// Describes a notification from the native windowing stack.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Event {
    KeyDown(KeyDownEvent),
    KeyUp(KeyUpEvent),
    ModifiersChanged(ModifiersChangedEvent),

    MouseMoved(MouseMovedEvent),
    MouseDragged(MouseDraggedEvent),
    MouseEntered(MouseEnteredEvent),
    MouseExited(MouseExitedEvent),
    MouseDown(MouseDownEvent),
    MouseUp(MouseUpEvent),
    ScrollWheel(ScrollWheelEvent),

    WindowConfigure(WindowConfigureEvent),
    WindowResize(WindowResizeEvent),
    WindowMove(WindowMoveEvent),
    WindowFocusChange(WindowFocusChangeEvent),
    /// The user asked to close the window.
    ///
    /// This is advisory: nothing is torn down until the host calls
    /// [`ActiveEventLoop::destroy_window`].
    ///
    /// [`ActiveEventLoop::destroy_window`]: crate::event_loop::ActiveEventLoop::destroy_window
    WindowCloseRequest,
    WindowFullScreenToggle(WindowFullScreenToggleEvent),
    WindowScreenChange(WindowScreenChangeEvent),
    WindowDraw(WindowDrawEvent),
    WindowScaleChanged(WindowScaleChangedEvent),
    WindowOcclusionChange(WindowOcclusionChangeEvent),

    TextInputAvailability(TextInputAvailabilityEvent),
    /// One composition batch, see [`ComposingText::apply`] for how to apply it.
    ///
    /// [`ComposingText::apply`]: crate::text_input::ComposingText::apply
    TextInput(TextInputEvent),

    DataTransferAvailable(DataTransferAvailableEvent),
    DataTransfer(DataTransferEvent),
    DataTransferCancelled(DataTransferCancelledEvent),
    /// The drag hovering the window left it, or was cancelled.
    DragAndDropLeave,
    DropPerformed(DropPerformedEvent),
    DragAndDropFinished(DragAndDropFinishedEvent),

    DisplayConfigurationChange(DisplayConfigurationChangeEvent),
    AppearanceChange(AppearanceChangeEvent),
}

impl Event {
    /// Whether the event originates from a keyboard, a pointer or an input method.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::KeyDown(_)
                | Self::KeyUp(_)
                | Self::ModifiersChanged(_)
                | Self::MouseMoved(_)
                | Self::MouseDragged(_)
                | Self::MouseEntered(_)
                | Self::MouseExited(_)
                | Self::MouseDown(_)
                | Self::MouseUp(_)
                | Self::ScrollWheel(_)
                | Self::TextInput(_)
        )
    }
}

macro_rules! impl_from_payload {
    ($($payload:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for Event {
                fn from(value: $payload) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload! {
    KeyDownEvent => KeyDown,
    KeyUpEvent => KeyUp,
    ModifiersChangedEvent => ModifiersChanged,
    MouseMovedEvent => MouseMoved,
    MouseDraggedEvent => MouseDragged,
    MouseEnteredEvent => MouseEntered,
    MouseExitedEvent => MouseExited,
    MouseDownEvent => MouseDown,
    MouseUpEvent => MouseUp,
    ScrollWheelEvent => ScrollWheel,
    WindowConfigureEvent => WindowConfigure,
    WindowResizeEvent => WindowResize,
    WindowMoveEvent => WindowMove,
    WindowFocusChangeEvent => WindowFocusChange,
    WindowFullScreenToggleEvent => WindowFullScreenToggle,
    WindowScreenChangeEvent => WindowScreenChange,
    WindowDrawEvent => WindowDraw,
    WindowScaleChangedEvent => WindowScaleChanged,
    WindowOcclusionChangeEvent => WindowOcclusionChange,
    TextInputAvailabilityEvent => TextInputAvailability,
    TextInputEvent => TextInput,
    DataTransferAvailableEvent => DataTransferAvailable,
    DataTransferEvent => DataTransfer,
    DataTransferCancelledEvent => DataTransferCancelled,
    DropPerformedEvent => DropPerformed,
    DragAndDropFinishedEvent => DragAndDropFinished,
    DisplayConfigurationChangeEvent => DisplayConfigurationChange,
    AppearanceChangeEvent => AppearanceChange,
}
