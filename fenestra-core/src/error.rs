//! Common error types.

use std::{error, fmt};

use crate::screen::ScreenId;
use crate::window::WindowId;

/// A general error that may occur while running or building the event loop.
#[derive(Debug)]
pub enum EventLoopError {
    /// The operation is not supported by the backend.
    NotSupported(NotSupportedError),
    /// The native connection failed.
    Os(OsError),
    /// The event loop can't be re-created.
    RecreationAttempt,
    /// Application has exit with an error status.
    ExitFailure(i32),
}

impl fmt::Display for EventLoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecreationAttempt => write!(f, "EventLoop can't be recreated"),
            Self::Os(err) => err.fmt(f),
            Self::ExitFailure(status) => write!(f, "Exit Failure: {status}"),
            Self::NotSupported(err) => err.fmt(f),
        }
    }
}

impl error::Error for EventLoopError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        if let Self::Os(err) = self {
            err.source()
        } else {
            None
        }
    }
}

impl From<OsError> for EventLoopError {
    fn from(value: OsError) -> Self {
        Self::Os(value)
    }
}

impl From<NotSupportedError> for EventLoopError {
    fn from(value: NotSupportedError) -> Self {
        Self::NotSupported(value)
    }
}

/// A failure of a request made through [`ActiveEventLoop`].
///
/// Protocol violations (a stale serial, a text-input request without an active session) are
/// reported as [`RequestError::Ignored`], a benign race between the host and the platform.
/// Requests against a window that has already been destroyed are not errors at all, they are
/// no-ops.
///
/// [`ActiveEventLoop`]: crate::event_loop::ActiveEventLoop
#[derive(Debug)]
pub enum RequestError {
    /// The request is not supported by the backend.
    NotSupported(NotSupportedError),
    /// The request was ignored by the platform or violated the protocol.
    Ignored,
    /// The window id was never issued by this process.
    UnknownWindow(WindowId),
    /// No screen with this id is currently connected.
    UnknownScreen(ScreenId),
    /// The native platform refused the request.
    Os(OsError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported(err) => err.fmt(f),
            Self::Ignored => write!(f, "The request was ignored"),
            Self::UnknownWindow(id) => write!(f, "Unknown window: {id:?}"),
            Self::UnknownScreen(id) => write!(f, "Unknown screen: {id:?}"),
            Self::Os(err) => err.fmt(f),
        }
    }
}

impl error::Error for RequestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        if let Self::Os(err) = self {
            err.source()
        } else {
            None
        }
    }
}

impl From<NotSupportedError> for RequestError {
    fn from(value: NotSupportedError) -> Self {
        Self::NotSupported(value)
    }
}

impl From<OsError> for RequestError {
    fn from(value: OsError) -> Self {
        Self::Os(value)
    }
}

/// The error type for when the requested operation is not supported by the backend.
#[derive(Clone)]
pub struct NotSupportedError {
    reason: &'static str,
}

impl NotSupportedError {
    #[inline]
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

impl fmt::Debug for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotSupportedError").field("reason", &self.reason).finish()
    }
}

impl fmt::Display for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.reason)
    }
}

impl error::Error for NotSupportedError {}

/// The error type for when the native platform cannot perform the requested operation.
#[derive(Debug)]
pub struct OsError {
    line: u32,
    file: &'static str,
    error: Box<dyn error::Error + Send + Sync + 'static>,
}

impl OsError {
    #[allow(dead_code)]
    pub fn new(
        line: u32,
        file: &'static str,
        error: impl Into<Box<dyn error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self { line, file, error: error.into() }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("os error at {}:{}: {}", self.file, self.line, self.error))
    }
}

impl error::Error for OsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Build an [`OsError`] pointing at the call site.
#[macro_export]
macro_rules! os_error {
    ($error:expr) => {{
        $crate::error::OsError::new(line!(), file!(), $error)
    }};
}
