//! Types used in window construction and control.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
#[doc(inline)]
pub use cursor_icon::{CursorIcon as PointerShape, ParseError as PointerShapeParseError};
use dpi::LogicalSize;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a window. Unique for each window.
///
/// Ids are issued from one process-wide sequence and are never handed out twice, even after the
/// window they named was destroyed. They are unrelated to any native handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowId(u64);

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

impl WindowId {
    /// Returns a dummy id, useful for unit testing.
    ///
    /// The only guarantee made about the return value of this function is that it will always be
    /// equal to itself and to future values returned by this function. It is never equal to an id
    /// issued by [`WindowId::next_unique`].
    pub const fn dummy() -> Self {
        WindowId(0)
    }

    /// Issue the next id of the process-wide sequence.
    ///
    /// Backends call this once per created window.
    pub fn next_unique() -> Self {
        // NOTE: 2^64 windows would have to be created for this to wrap.
        Self(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this id was handed out by [`WindowId::next_unique`] already.
    ///
    /// Used to tell a retired id apart from one that was never issued.
    pub fn was_issued(self) -> bool {
        self.0 != 0 && self.0 < NEXT_WINDOW_ID.load(Ordering::Relaxed)
    }
}

impl From<WindowId> for u64 {
    fn from(window_id: WindowId) -> Self {
        window_id.0
    }
}

impl From<u64> for WindowId {
    fn from(raw_id: u64) -> Self {
        Self(raw_id)
    }
}

/// Where a window is in its life.
///
/// ```text
/// Created ─▶ Configured ⇄ {Focused, Resizing, Fullscreen, Occluded} ─▶ CloseRequested ─▶ Destroyed
/// ```
///
/// The parenthesized states are flags on top of `Configured` and are reported separately through
/// the window's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowLifecycle {
    /// The native surface exists but hasn't received its first configure yet.
    Created,
    /// Size, decorations and capabilities are known.
    Configured,
    /// The platform asked to close the window. The host decides whether to destroy it.
    CloseRequested,
    /// The window was destroyed. Its id is retired.
    Destroyed,
}

/// Which edge or corner an interactive resize is dragging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowResizeEdge {
    /// Nothing is being dragged.
    #[default]
    None,
    /// The top edge is being dragged.
    Top,
    /// The bottom edge is being dragged.
    Bottom,
    /// The left edge is being dragged.
    Left,
    /// The top left corner is being dragged.
    TopLeft,
    /// The bottom left corner is being dragged.
    BottomLeft,
    /// The right edge is being dragged.
    Right,
    /// The top right corner is being dragged.
    TopRight,
    /// The bottom right corner is being dragged.
    BottomRight,
}

impl WindowResizeEdge {
    /// Which sides of the window move when the pointer moves by `(dx, dy)`.
    ///
    /// Returns the multipliers applied to the delta for the width and the height, and whether the
    /// origin follows the pointer on each axis.
    pub fn factors(self) -> ((f64, bool), (f64, bool)) {
        use WindowResizeEdge::*;
        let horizontal = match self {
            Left | TopLeft | BottomLeft => (-1.0, true),
            Right | TopRight | BottomRight => (1.0, false),
            _ => (0.0, false),
        };
        let vertical = match self {
            Top | TopLeft | TopRight => (-1.0, true),
            Bottom | BottomLeft | BottomRight => (1.0, false),
            _ => (0.0, false),
        };
        (horizontal, vertical)
    }
}

impl From<WindowResizeEdge> for PointerShape {
    fn from(edge: WindowResizeEdge) -> Self {
        use WindowResizeEdge::*;
        match edge {
            None => PointerShape::Default,
            Top => PointerShape::NResize,
            Bottom => PointerShape::SResize,
            Left => PointerShape::WResize,
            Right => PointerShape::EResize,
            TopLeft => PointerShape::NwResize,
            TopRight => PointerShape::NeResize,
            BottomLeft => PointerShape::SwResize,
            BottomRight => PointerShape::SeResize,
        }
    }
}

/// Who draws the title bar and the borders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecorationMode {
    /// The application draws its own decorations.
    #[default]
    ClientSide,
    /// The window manager draws the decorations.
    ServerSide,
}

bitflags! {
    /// What the window manager allows the window to do.
    ///
    /// These vary per platform and per compositor and are surfaced with the first configure,
    /// never assumed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct WindowCapabilities: u8 {
        /// A window menu can be shown with [`show_window_menu`].
        ///
        /// [`show_window_menu`]: crate::event_loop::ActiveEventLoop::show_window_menu
        const WINDOW_MENU = 1 << 0;
        const MAXIMIZE = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const MINIMIZE = 1 << 3;
    }
}

impl Default for WindowCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// The theme variant to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Theme {
    /// Use the light variant.
    Light,

    /// Use the dark variant.
    Dark,
}

/// Attributes used when creating a window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowAttributes {
    pub title: String,
    pub app_id: Option<String>,
    /// Initial size. When `None` the backend picks one.
    pub size: Option<LogicalSize<f64>>,
    pub min_size: Option<LogicalSize<f64>>,
    pub max_size: Option<LogicalSize<f64>>,
    /// Decoration mode to ask the window manager for. It may decide otherwise.
    pub preferred_decoration_mode: Option<DecorationMode>,
    pub pointer_shape: PointerShape,
}

impl Default for WindowAttributes {
    #[inline]
    fn default() -> WindowAttributes {
        WindowAttributes {
            title: "fenestra window".to_owned(),
            app_id: None,
            size: None,
            min_size: None,
            max_size: None,
            preferred_decoration_mode: None,
            pointer_shape: PointerShape::Default,
        }
    }
}

impl WindowAttributes {
    /// Requests the window to be of specific dimensions.
    #[inline]
    pub fn with_size(mut self, size: LogicalSize<f64>) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the minimum dimensions a window can have.
    #[inline]
    pub fn with_min_size(mut self, min_size: LogicalSize<f64>) -> Self {
        self.min_size = Some(min_size);
        self
    }

    /// Sets the maximum dimensions a window can have.
    #[inline]
    pub fn with_max_size(mut self, max_size: LogicalSize<f64>) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the initial title of the window in the title bar.
    ///
    /// The default is `"fenestra window"`.
    #[inline]
    pub fn with_title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = title.into();
        self
    }

    /// The application id the window manager groups windows by.
    #[inline]
    pub fn with_app_id<T: Into<String>>(mut self, app_id: T) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    #[inline]
    pub fn with_decoration_mode(mut self, mode: DecorationMode) -> Self {
        self.preferred_decoration_mode = Some(mode);
        self
    }

    #[inline]
    pub fn with_pointer_shape(mut self, shape: PointerShape) -> Self {
        self.pointer_shape = shape;
        self
    }
}

/// Clamp `size` between the optional bounds, the way window managers apply size hints.
pub fn clamp_size(
    size: LogicalSize<f64>,
    min: Option<LogicalSize<f64>>,
    max: Option<LogicalSize<f64>>,
) -> LogicalSize<f64> {
    let mut width = size.width;
    let mut height = size.height;
    if let Some(max) = max {
        width = width.min(max.width);
        height = height.min(max.height);
    }
    if let Some(min) = min {
        width = width.max(min.width);
        height = height.max(min.height);
    }
    LogicalSize::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let first = WindowId::next_unique();
        let second = WindowId::next_unique();
        assert_ne!(first, second);
        assert!(u64::from(second) > u64::from(first));
        assert!(first.was_issued());
        assert!(!WindowId::dummy().was_issued());
        assert!(!WindowId::from(u64::MAX - 1).was_issued());
    }

    #[test]
    fn min_wins_over_max() {
        let size = clamp_size(
            LogicalSize::new(50.0, 900.0),
            Some(LogicalSize::new(100.0, 100.0)),
            Some(LogicalSize::new(80.0, 600.0)),
        );
        assert_eq!(size, LogicalSize::new(100.0, 600.0));
    }

    #[test]
    fn resize_edges() {
        assert_eq!(WindowResizeEdge::TopLeft.factors(), ((-1.0, true), (-1.0, true)));
        assert_eq!(WindowResizeEdge::Right.factors(), ((1.0, false), (0.0, false)));
        assert_eq!(PointerShape::from(WindowResizeEdge::BottomRight), PointerShape::SeResize);
    }
}
