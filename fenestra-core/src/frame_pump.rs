//! Per-screen frame callbacks.
use std::fmt;

use crate::screen::ScreenId;

/// Invokes a callback once per refresh of a screen.
///
/// Created stopped by [`ActiveEventLoop::create_frame_pump`]. The callback runs on a thread
/// owned by the pump, never on the event-loop thread. Dropping the pump stops it.
///
/// [`ActiveEventLoop::create_frame_pump`]: crate::event_loop::ActiveEventLoop::create_frame_pump
pub struct FramePump {
    pump: Box<dyn FramePumpProvider>,
}

impl FramePump {
    pub fn new(pump: Box<dyn FramePumpProvider>) -> Self {
        Self { pump }
    }

    pub fn screen_id(&self) -> ScreenId {
        self.pump.screen_id()
    }

    /// Start or stop ticking. Setting the current state again does nothing.
    pub fn set_running(&self, running: bool) {
        self.pump.set_running(running);
    }

    pub fn start(&self) {
        self.set_running(true);
    }

    pub fn stop(&self) {
        self.set_running(false);
    }

    pub fn is_running(&self) -> bool {
        self.pump.is_running()
    }
}

impl fmt::Debug for FramePump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePump")
            .field("screen_id", &self.screen_id())
            .field("running", &self.is_running())
            .finish()
    }
}

pub trait FramePumpProvider: Send + Sync {
    fn screen_id(&self) -> ScreenId;

    /// See [`FramePump::set_running`].
    fn set_running(&self, running: bool);

    fn is_running(&self) -> bool;
}
