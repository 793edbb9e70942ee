//! End user application handling.

use crate::data_transfer::{DataSource, DragAndDropQuery, DragAndDropQueryResponse};
use crate::event::Event;
use crate::event_loop::ActiveEventLoop;
use crate::window::WindowId;

/// The handler of the application events.
///
/// All methods are called on the event-loop thread, one at a time, in the order the underlying
/// notifications arrived.
pub trait ApplicationHandler {
    /// Emitted each time the event loop starts running, before any other callback of that run.
    ///
    /// This is the place to create the initial windows.
    fn started(&mut self, event_loop: &dyn ActiveEventLoop) {
        let _ = event_loop;
    }

    /// Emitted for every translated native notification.
    ///
    /// `window_id` is `None` for application-wide events such as
    /// [`Event::DisplayConfigurationChange`] or [`Event::DataTransfer`].
    ///
    /// The event is only borrowed for the duration of the call. Return whether the event was
    /// consumed; unconsumed key presses are left to the platform's default handling.
    fn event(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        window_id: Option<WindowId>,
        event: &Event,
    ) -> bool;

    /// The platform asks the application to quit, for example on session logout.
    ///
    /// Return `false` to keep running. Not consulted for [`ActiveEventLoop::exit`].
    fn should_terminate(&mut self, event_loop: &dyn ActiveEventLoop) -> bool {
        let _ = event_loop;
        true
    }

    /// Emitted when the event loop is about to stop, while windows still exist.
    fn will_terminate(&mut self, event_loop: &dyn ActiveEventLoop) {
        let _ = event_loop;
    }

    /// A drag is hovering one of the windows: which MIME types and actions would be accepted at
    /// this location?
    ///
    /// Asked again on every motion, the answer is never cached.
    fn drag_and_drop_query(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        query: &DragAndDropQuery,
    ) -> DragAndDropQueryResponse {
        let _ = (event_loop, query);
        DragAndDropQueryResponse::reject()
    }

    /// Produce the payload of a source this application owns, for one of the offered MIME types.
    ///
    /// Only called for the current source and for MIME types that were offered. Returning `None`
    /// sends an empty reply.
    fn data_transfer_data(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        source: DataSource,
        mime_type: &str,
    ) -> Option<Vec<u8>> {
        let _ = (event_loop, source, mime_type);
        None
    }
}

#[deny(clippy::missing_trait_methods)]
impl<A: ?Sized + ApplicationHandler> ApplicationHandler for &mut A {
    #[inline]
    fn started(&mut self, event_loop: &dyn ActiveEventLoop) {
        (**self).started(event_loop);
    }

    #[inline]
    fn event(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        window_id: Option<WindowId>,
        event: &Event,
    ) -> bool {
        (**self).event(event_loop, window_id, event)
    }

    #[inline]
    fn should_terminate(&mut self, event_loop: &dyn ActiveEventLoop) -> bool {
        (**self).should_terminate(event_loop)
    }

    #[inline]
    fn will_terminate(&mut self, event_loop: &dyn ActiveEventLoop) {
        (**self).will_terminate(event_loop);
    }

    #[inline]
    fn drag_and_drop_query(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        query: &DragAndDropQuery,
    ) -> DragAndDropQueryResponse {
        (**self).drag_and_drop_query(event_loop, query)
    }

    #[inline]
    fn data_transfer_data(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        source: DataSource,
        mime_type: &str,
    ) -> Option<Vec<u8>> {
        (**self).data_transfer_data(event_loop, source, mime_type)
    }
}

#[deny(clippy::missing_trait_methods)]
impl<A: ?Sized + ApplicationHandler> ApplicationHandler for Box<A> {
    #[inline]
    fn started(&mut self, event_loop: &dyn ActiveEventLoop) {
        (**self).started(event_loop);
    }

    #[inline]
    fn event(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        window_id: Option<WindowId>,
        event: &Event,
    ) -> bool {
        (**self).event(event_loop, window_id, event)
    }

    #[inline]
    fn should_terminate(&mut self, event_loop: &dyn ActiveEventLoop) -> bool {
        (**self).should_terminate(event_loop)
    }

    #[inline]
    fn will_terminate(&mut self, event_loop: &dyn ActiveEventLoop) {
        (**self).will_terminate(event_loop);
    }

    #[inline]
    fn drag_and_drop_query(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        query: &DragAndDropQuery,
    ) -> DragAndDropQueryResponse {
        (**self).drag_and_drop_query(event_loop, query)
    }

    #[inline]
    fn data_transfer_data(
        &mut self,
        event_loop: &dyn ActiveEventLoop,
        source: DataSource,
        mime_type: &str,
    ) -> Option<Vec<u8>> {
        (**self).data_transfer_data(event_loop, source, mime_type)
    }
}
