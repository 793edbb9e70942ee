//! The [`EventLoop`] and everything needed to run it.
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use fenestra_core::application::ApplicationHandler;
use fenestra_core::error::EventLoopError;
use fenestra_core::os_error;
use tracing::{debug, error, trace};

use crate::dispatcher::{MainThread, Message};
use crate::platform::headless::compositor::Compositor;
use crate::platform::headless::{HeadlessConfig, HeadlessHandle};
use crate::state::LoopState;

pub use fenestra_core::event_loop::{
    ActiveEventLoop, EventLoopProxy, EventLoopProxyProvider, PumpStatus, Task,
};

thread_local! {
    static LOOP_ALIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the thread as owning an event loop until dropped.
#[derive(Debug)]
struct AliveGuard;

impl AliveGuard {
    fn acquire() -> Result<Self, EventLoopError> {
        if LOOP_ALIVE.with(|alive| alive.replace(true)) {
            return Err(EventLoopError::RecreationAttempt);
        }
        Ok(Self)
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        LOOP_ALIVE.with(|alive| alive.set(false));
    }
}

/// Delivers native notifications and dispatched tasks to an [`ApplicationHandler`].
///
/// The thread creating the event loop becomes the event-loop thread: every callback runs on it
/// and the loop can't be moved to another one. Only one event loop may be alive per thread.
///
/// To reach the loop from another thread, see [`EventLoopProxy`] and [`HeadlessHandle`].
pub struct EventLoop {
    event_loop: calloop::EventLoop<'static, VecDeque<Message>>,
    /// Messages read from the channel, not handled yet.
    incoming: VecDeque<Message>,
    state: LoopState,
    loop_running: bool,
    exit_code: Option<i32>,
    _alive: AliveGuard,
}

/// Object that allows building the event loop.
#[derive(Debug, Default)]
pub struct EventLoopBuilder {
    config: HeadlessConfig,
}

impl EventLoopBuilder {
    /// Start building a new event loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Screens, limits and defaults of the headless compositor.
    pub fn with_headless_config(&mut self, config: HeadlessConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Builds a new event loop bound to the calling thread.
    ///
    /// Fails with [`EventLoopError::RecreationAttempt`] when the thread already owns a live
    /// event loop.
    pub fn build(&mut self) -> Result<EventLoop, EventLoopError> {
        let alive = AliveGuard::acquire()?;

        let event_loop: calloop::EventLoop<'static, VecDeque<Message>> =
            calloop::EventLoop::try_new().map_err(|err| os_error!(err))?;
        let (sender, channel) = calloop::channel::channel();
        event_loop
            .handle()
            .insert_source(channel, |event, _, incoming: &mut VecDeque<Message>| {
                if let calloop::channel::Event::Msg(message) = event {
                    incoming.push_back(message);
                }
            })
            .map_err(|err| os_error!(err.error))?;

        let state =
            LoopState::new(MainThread::current(), sender, Compositor::new(self.config.clone()));
        debug!("event loop created");

        Ok(EventLoop {
            event_loop,
            incoming: VecDeque::new(),
            state,
            loop_running: false,
            exit_code: None,
            _alive: alive,
        })
    }
}

impl EventLoop {
    /// Create the event loop with the default configuration.
    ///
    /// This is a shorthand for `EventLoop::builder().build()`.
    #[inline]
    pub fn new() -> Result<Self, EventLoopError> {
        Self::builder().build()
    }

    #[inline]
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    /// Creates an [`EventLoopProxy`] that can be used to dispatch tasks to the event loop.
    pub fn create_proxy(&self) -> EventLoopProxy {
        self.state.create_proxy()
    }

    /// The native connection, to inject notifications from any thread.
    pub fn headless_handle(&self) -> HeadlessHandle {
        HeadlessHandle { sender: self.state.sender().clone(), shared: self.state.shared() }
    }

    /// Run the application until it exits, then release every native resource.
    pub fn run_app<A: ApplicationHandler>(mut self, app: A) -> Result<(), EventLoopError> {
        let result = self.run_app_on_demand(app);
        self.shutdown();
        result
    }

    /// Run the application until it exits. The loop can be run again afterwards.
    ///
    /// Windows survive between runs. [`ApplicationHandler::started`] is called on every run.
    pub fn run_app_on_demand<A: ApplicationHandler>(
        &mut self,
        mut app: A,
    ) -> Result<(), EventLoopError> {
        self.state.clear_exit();
        loop {
            match self.pump_app_events(None, &mut app) {
                PumpStatus::Exit(0) => break Ok(()),
                PumpStatus::Exit(code) => break Err(EventLoopError::ExitFailure(code)),
                PumpStatus::Continue => continue,
            }
        }
    }

    /// Handle what is ready, waiting at most `timeout` for something to arrive.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` never blocks.
    pub fn pump_app_events<A: ApplicationHandler>(
        &mut self,
        timeout: Option<Duration>,
        mut app: A,
    ) -> PumpStatus {
        let app: &mut dyn ApplicationHandler = &mut app;
        if !self.loop_running {
            self.loop_running = true;
            self.exit_code = None;
            self.state.clear_exit();
            trace!("event loop started");
            self.state.with_app(app, |app, event_loop| app.started(event_loop));
            self.state.deliver_redraws(app);
        }

        if !self.state.exiting() {
            self.poll_events_with_timeout(timeout, app);
        }

        if self.state.exiting() || self.exit_code.is_some() {
            self.stop(app);
            self.loop_running = false;
            PumpStatus::Exit(self.exit_code.take().unwrap_or(0))
        } else {
            PumpStatus::Continue
        }
    }

    fn has_pending(&self) -> bool {
        !self.incoming.is_empty() || self.state.has_pending_work()
    }

    fn poll_events_with_timeout(
        &mut self,
        timeout: Option<Duration>,
        app: &mut dyn ApplicationHandler,
    ) {
        let timeout = if self.has_pending() { Some(Duration::ZERO) } else { timeout };

        if let Err(error) =
            self.event_loop.dispatch(timeout, &mut self.incoming).map_err(std::io::Error::from)
        {
            error!("Failed to poll for events: {error:?}");
            self.exit_code = Some(error.raw_os_error().unwrap_or(1));
            return;
        }

        self.single_iteration(app);
    }

    /// Handle compositor responses and queued messages in order, then deliver draws.
    fn single_iteration(&mut self, app: &mut dyn ApplicationHandler) {
        while !self.state.exiting() {
            if let Some(event) = self.state.pop_response() {
                self.state.handle_native(app, event);
                continue;
            }

            let Some(message) = self.incoming.pop_front() else {
                break;
            };
            match message {
                Message::Native(event) => self.state.handle_native(app, event),
                Message::Task(task) => self.state.with_app(app, |_, event_loop| task(event_loop)),
            }
        }

        if !self.state.exiting() {
            self.state.deliver_redraws(app);
        }
    }

    /// Wind the current run down. Native notifications stay queued for the next run, tasks don't.
    fn stop(&mut self, app: &mut dyn ApplicationHandler) {
        self.state.with_app(app, |app, event_loop| app.will_terminate(event_loop));
        self.state.cancel_negotiations();

        if let Err(error) = self.event_loop.dispatch(Some(Duration::ZERO), &mut self.incoming) {
            debug!("Failed to drain the queue on exit: {error:?}");
        }
        let queued = self.incoming.len();
        self.incoming.retain(|message| matches!(message, Message::Native(_)));
        let dropped = queued - self.incoming.len();
        if dropped > 0 {
            debug!(dropped, "queued tasks dropped, the event loop stopped");
        }
        trace!("event loop stopped");
    }

    /// Destroy every window and close the native connection.
    ///
    /// Proxies and handles outliving the loop turn into no-ops.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.state.disconnect();
        let dropped = self.incoming.len();
        if dropped > 0 {
            debug!(dropped, "queued messages dropped on shutdown");
        }
        debug!("event loop shut down");
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("state", &self.state)
            .field("loop_running", &self.loop_running)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_loop_per_thread() {
        let event_loop = EventLoop::new().unwrap();
        assert!(matches!(EventLoop::new(), Err(EventLoopError::RecreationAttempt)));
        drop(event_loop);
        assert!(EventLoop::new().is_ok());
    }

    #[test]
    fn loops_on_other_threads_are_independent() {
        let _event_loop = EventLoop::new().unwrap();
        std::thread::spawn(|| EventLoop::new().map(drop)).join().unwrap().unwrap();
    }
}
