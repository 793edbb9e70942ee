//! Platform-independent contract of fenestra.
//!
//! This crate holds the event model, the identifiers and attributes of windows and screens, the
//! text-input and data-transfer types, and the traits connecting a backend to the host
//! application: [`ApplicationHandler`] is implemented by the host, [`ActiveEventLoop`] by the
//! backend.
//!
//! Most users want the `fenestra` crate, which re-exports everything here and provides the event
//! loop.
//!
//! [`ApplicationHandler`]: crate::application::ApplicationHandler
//! [`ActiveEventLoop`]: crate::event_loop::ActiveEventLoop

#[macro_use]
pub mod error;

pub mod application;
pub mod data_transfer;
pub mod event;
pub mod event_loop;
pub mod frame_pump;
pub mod keyboard;
pub mod screen;
pub mod text_input;
pub mod window;
