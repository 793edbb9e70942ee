//! The main-thread dispatcher.
//!
//! Native notifications and tasks submitted from other threads share one channel, so they reach
//! the event-loop thread in a single global order.
use std::fmt;
use std::sync::mpsc::SendError;
use std::thread::{self, ThreadId};

use calloop::channel::Sender;
use fenestra_core::event_loop::{EventLoopProxyProvider, Task};
use tracing::debug;

use crate::platform::headless::NativeEvent;

pub(crate) enum Message {
    Native(NativeEvent),
    Task(Task),
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(event) => f.debug_tuple("Native").field(event).finish(),
            Self::Task(_) => f.write_str("Task(..)"),
        }
    }
}

/// Identity of the event-loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MainThread(ThreadId);

impl MainThread {
    /// Claim the calling thread.
    pub(crate) fn current() -> Self {
        Self(thread::current().id())
    }

    pub(crate) fn is_current(self) -> bool {
        thread::current().id() == self.0
    }

    /// Panic when called from another thread.
    #[track_caller]
    pub(crate) fn assert_current(self, operation: &str) {
        if !self.is_current() {
            panic!("`{operation}` must be called on the event-loop thread");
        }
    }
}

pub(crate) struct ProxyProvider {
    pub(crate) sender: Sender<Message>,
    pub(crate) main_thread: MainThread,
}

impl EventLoopProxyProvider for ProxyProvider {
    fn send_task(&self, task: Task) {
        if let Err(SendError(_)) = self.sender.send(Message::Task(task)) {
            debug!("task dropped, the event loop is gone");
        }
    }

    fn is_event_loop_thread(&self) -> bool {
        self.main_thread.is_current()
    }
}

impl fmt::Debug for ProxyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyProvider").field("main_thread", &self.main_thread).finish()
    }
}
