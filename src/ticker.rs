//! Frame pumps ticking on their own thread.
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use fenestra_core::error::RequestError;
use fenestra_core::frame_pump::{FramePump, FramePumpProvider};
use fenestra_core::os_error;
use fenestra_core::screen::{ScreenId, ScreenInfo};
use tracing::{debug, trace};

pub(crate) type FrameCallback = Box<dyn FnMut() + Send + 'static>;

#[derive(Debug, Default)]
struct PumpState {
    running: bool,
    ticking: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<PumpState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PumpState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, PumpState>) -> MutexGuard<'a, PumpState> {
        self.changed.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears `ticking` even when the callback panics, so `stop` never waits forever.
struct TickGuard<'a>(&'a Shared);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().ticking = false;
        self.0.changed.notify_all();
    }
}

#[derive(Debug)]
pub(crate) struct ThreadFramePump {
    screen_id: ScreenId,
    shared: Arc<Shared>,
    thread_id: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl ThreadFramePump {
    /// Spawn a stopped pump ticking at the refresh rate of `screen`.
    pub(crate) fn spawn(
        screen: &ScreenInfo,
        callback: FrameCallback,
    ) -> Result<FramePump, RequestError> {
        let interval = screen.frame_interval();
        let shared = Arc::new(Shared::default());
        let thread = thread::Builder::new()
            .name(format!("fenestra-frame-pump-{}", screen.id.0))
            .spawn({
                let shared = Arc::clone(&shared);
                move || pump_thread(&shared, interval, callback)
            })
            .map_err(|err| os_error!(err))?;

        debug!(screen_id = ?screen.id, ?interval, "frame pump created");
        Ok(FramePump::new(Box::new(Self {
            screen_id: screen.id,
            shared,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })))
    }
}

fn pump_thread(shared: &Shared, interval: Duration, mut callback: FrameCallback) {
    let mut next_tick = None;
    let mut state = shared.lock();
    loop {
        if state.shutdown {
            break;
        }
        if !state.running {
            next_tick = None;
            state = shared.wait(state);
            continue;
        }

        let now = Instant::now();
        let deadline = *next_tick.get_or_insert(now + interval);
        if now < deadline {
            state = shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        state.ticking = true;
        drop(state);
        {
            let _guard = TickGuard(shared);
            callback();
        }

        // Missed ticks are skipped rather than replayed.
        let now = Instant::now();
        let next = deadline + interval;
        next_tick = Some(if next > now { next } else { now + interval });
        state = shared.lock();
    }
    trace!("frame pump thread exiting");
}

impl FramePumpProvider for ThreadFramePump {
    fn screen_id(&self) -> ScreenId {
        self.screen_id
    }

    fn set_running(&self, running: bool) {
        let mut state = self.shared.lock();
        if state.running == running {
            return;
        }
        state.running = running;
        self.shared.changed.notify_all();
        trace!(screen_id = ?self.screen_id, running, "frame pump toggled");

        // Once stopped, no tick may still be running. The callback stopping its own pump can't
        // wait for itself.
        if !running && thread::current().id() != self.thread_id {
            while state.ticking {
                state = self.shared.wait(state);
            }
        }
    }

    fn is_running(&self) -> bool {
        self.shared.lock().running
    }
}

impl Drop for ThreadFramePump {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.running = false;
            state.shutdown = true;
        }
        self.shared.changed.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}
