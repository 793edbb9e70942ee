//! Backends.
//!
//! - `headless`: an in-process compositor, driven by notifications sent through a
//!   [`HeadlessHandle`](headless::HeadlessHandle).

pub mod headless;
