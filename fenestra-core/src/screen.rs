//! Types describing the connected screens.
//!
//! A fresh list is produced by [`ActiveEventLoop::screens`] and carried by
//! [`Event::DisplayConfigurationChange`] whenever the display configuration changes.
//!
//! [`ActiveEventLoop::screens`]: crate::event_loop::ActiveEventLoop::screens
//! [`Event::DisplayConfigurationChange`]: crate::event::Event::DisplayConfigurationChange
use std::num::NonZeroU32;
use std::time::Duration;

use dpi::{LogicalPosition, LogicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier of a screen, as reported by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScreenId(pub u32);

/// Refresh rate assumed when a screen doesn't report one.
pub const FALLBACK_REFRESH_RATE_MILLIHERTZ: u32 = 60_000;

/// Immutable snapshot of a screen.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScreenInfo {
    pub id: ScreenId,
    pub is_primary: bool,
    /// Human-readable name, if the platform has one.
    pub name: Option<String>,
    /// Top-left corner in the desktop coordinate space, relative to the primary screen.
    pub origin: LogicalPosition<f64>,
    pub size: LogicalSize<f64>,
    pub scale_factor: f64,
    /// Maximum refresh rate in millihertz.
    pub refresh_rate_millihertz: Option<NonZeroU32>,
}

impl ScreenInfo {
    /// Time between two frames at the maximum refresh rate.
    pub fn frame_interval(&self) -> Duration {
        let millihertz =
            self.refresh_rate_millihertz.map_or(FALLBACK_REFRESH_RATE_MILLIHERTZ, NonZeroU32::get);
        Duration::from_secs_f64(1000.0 / f64::from(millihertz))
    }

    /// Whether the logical point, in desktop coordinates, is on this screen.
    pub fn contains(&self, point: LogicalPosition<f64>) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.width
            && point.y < self.origin.y + self.size.height
    }
}
