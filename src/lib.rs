//! fenestra is a windowing and input layer for applications that draw their own content.
//!
//! The host implements [`ApplicationHandler`] and hands it to an [`EventLoop`]. Windows are
//! created and driven through the [`ActiveEventLoop`] given to every callback, and everything
//! that happens to them arrives as an [`Event`], on the thread that created the event loop.
//!
//! ```no_run
//! use fenestra::application::ApplicationHandler;
//! use fenestra::event::Event;
//! use fenestra::event_loop::{ActiveEventLoop, EventLoop};
//! use fenestra::window::{WindowAttributes, WindowId};
//!
//! #[derive(Default)]
//! struct App {
//!     window: Option<WindowId>,
//! }
//!
//! impl ApplicationHandler for App {
//!     fn started(&mut self, event_loop: &dyn ActiveEventLoop) {
//!         let attributes = WindowAttributes::default().with_title("fenestra");
//!         self.window = event_loop.create_window(attributes).ok();
//!     }
//!
//!     fn event(
//!         &mut self,
//!         event_loop: &dyn ActiveEventLoop,
//!         window_id: Option<WindowId>,
//!         event: &Event,
//!     ) -> bool {
//!         match event {
//!             Event::WindowCloseRequest => {
//!                 if let Some(window_id) = window_id {
//!                     let _ = event_loop.destroy_window(window_id);
//!                 }
//!                 event_loop.exit();
//!             },
//!             Event::WindowDraw(_) => {
//!                 // Draw the window here.
//!             },
//!             _ => return false,
//!         }
//!         true
//!     }
//! }
//!
//! let event_loop = EventLoop::new().unwrap();
//! event_loop.run_app(App::default()).unwrap();
//! ```
//!
//! # Threads
//!
//! The event loop and every window operation are bound to the thread that created the loop.
//! Other threads reach it through an [`EventLoopProxy`], which queues tasks in one global order,
//! or inject native notifications through a [`HeadlessHandle`].
//!
//! # Backend
//!
//! The only backend is [`platform::headless`], an in-process compositor modelled on Wayland:
//! configure events, text-input batches, and lazily read data offers.
//!
//! [`ApplicationHandler`]: application::ApplicationHandler
//! [`ActiveEventLoop`]: event_loop::ActiveEventLoop
//! [`Event`]: event::Event
//! [`EventLoop`]: event_loop::EventLoop
//! [`EventLoopProxy`]: event_loop::EventLoopProxy
//! [`HeadlessHandle`]: platform::headless::HeadlessHandle

// Re-export DPI types so that users don't have to put it in Cargo.toml.
#[doc(inline)]
pub use dpi;
pub use fenestra_core::{
    application, data_transfer, error, event, frame_pump, keyboard, screen, text_input, window,
};

pub mod event_loop;
pub mod platform;

mod dispatcher;
mod ime;
mod negotiator;
mod registry;
mod state;
mod ticker;
