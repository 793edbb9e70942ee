//! Negotiation of clipboard, primary selection and drag-and-drop transfers.
//!
//! The destination side keeps the offers announced by the compositor and never reads them
//! before the host asked for data. The source side remembers what this application offered so
//! that requests can be checked against the current serial before the host is called.
use std::collections::HashMap;

use dpi::LogicalPosition;
use fenestra_core::data_transfer::{
    pick_mime_type, DataSource, DataTransferSerial, DragAndDropAction, DragAndDropActions,
    DragAndDropQuery, DragAndDropQueryResponse,
};
use fenestra_core::event::{
    DataTransferAvailableEvent, DataTransferCancelledEvent, DragAndDropFinishedEvent, Event,
};
use fenestra_core::window::WindowId;
use tracing::{debug, trace, warn};

use crate::platform::headless::DataOffer;

/// A paste waiting to be served once the current callback returned.
#[derive(Debug)]
pub(crate) enum Fetch {
    /// Read from another client's offer.
    Offer { serial: DataTransferSerial, mime_type: String, offer: DataOffer },
    /// The application owns the selection and serves itself.
    Owned { serial: DataTransferSerial, source: DataSource, mime_type: String },
}

/// The outcome of a drop.
#[derive(Debug)]
pub(crate) enum DropOutcome {
    /// No drag is hovering any window.
    Idle,
    /// The drag is over, nothing is transferred.
    Left(WindowId),
    Perform {
        window_id: WindowId,
        offer: DataOffer,
        mime_type: String,
        action: DragAndDropAction,
        location_in_window: LogicalPosition<f64>,
    },
}

#[derive(Debug)]
struct DragSession {
    serial: u32,
    window_id: WindowId,
    position: LogicalPosition<f64>,
    offer: DataOffer,
    source_actions: DragAndDropActions,
    accepted: Option<(String, DragAndDropAction)>,
}

#[derive(Debug)]
struct OwnedSource {
    serial: DataTransferSerial,
    mime_types: Vec<String>,
    /// Window a drag started from.
    origin: Option<WindowId>,
}

#[derive(Debug, Default)]
pub(crate) struct Negotiator {
    offers: HashMap<DataSource, DataOffer>,
    drag: Option<DragSession>,
    owned: HashMap<DataSource, OwnedSource>,
}

impl Negotiator {
    /// A new selection was announced, `None` when it was cleared.
    pub(crate) fn selection(&mut self, source: DataSource, offer: Option<DataOffer>) -> Event {
        let mime_types =
            offer.as_ref().map(|offer| offer.mime_types().to_vec()).unwrap_or_default();
        match offer {
            Some(offer) => self.offers.insert(source, offer),
            None => self.offers.remove(&source),
        };
        trace!(?source, ?mime_types, "selection offer");
        Event::DataTransferAvailable(DataTransferAvailableEvent { source, mime_types })
    }

    /// MIME types a paste of `source` could ask for.
    pub(crate) fn mime_types(&self, source: DataSource) -> Vec<String> {
        if let Some(owned) = self.owned.get(&source) {
            return owned.mime_types.clone();
        }
        self.offers.get(&source).map(|offer| offer.mime_types().to_vec()).unwrap_or_default()
    }

    /// Plan a paste of `source`. `None` when no offered type is supported.
    pub(crate) fn paste(
        &self,
        source: DataSource,
        serial: DataTransferSerial,
        supported_mime_types: &[&str],
    ) -> Option<Fetch> {
        if let Some(owned) = self.owned.get(&source) {
            let mime_type = pick_mime_type(supported_mime_types, &owned.mime_types)?;
            return Some(Fetch::Owned { serial, source, mime_type });
        }

        let offer = self.offers.get(&source)?;
        let mime_type = pick_mime_type(supported_mime_types, offer.mime_types())?;
        Some(Fetch::Offer { serial, mime_type, offer: offer.clone() })
    }

    /// Remember a source this application put on the clipboard, the primary selection or a drag.
    pub(crate) fn own(
        &mut self,
        source: DataSource,
        serial: DataTransferSerial,
        mime_types: Vec<String>,
        origin: Option<WindowId>,
    ) {
        debug!(?source, ?serial, "source owned");
        // Our source replaced whatever another client had on this selection.
        self.offers.remove(&source);
        self.owned.insert(source, OwnedSource { serial, mime_types, origin });
    }

    /// Check a request for the data of an owned source.
    ///
    /// Stale serials and MIME types that were never offered are refused.
    pub(crate) fn serve(
        &self,
        source: DataSource,
        serial: DataTransferSerial,
        mime_type: &str,
    ) -> bool {
        let Some(owned) = self.owned.get(&source) else {
            warn!(?source, ?serial, "data requested for a source we don't own");
            return false;
        };
        if owned.serial != serial {
            warn!(?source, ?serial, current = ?owned.serial, "data requested with a stale serial");
            return false;
        }
        if !owned.mime_types.iter().any(|mime| mime == mime_type) {
            warn!(?source, mime_type, "data requested for a MIME type we never offered");
            return false;
        }
        true
    }

    /// An owned clipboard or primary selection was replaced.
    pub(crate) fn source_cancelled(
        &mut self,
        source: DataSource,
        serial: DataTransferSerial,
    ) -> Option<Event> {
        if self.owned.get(&source).map(|owned| owned.serial) != Some(serial) {
            trace!(?source, ?serial, "cancellation of a stale source");
            return None;
        }
        self.owned.remove(&source);
        Some(Event::DataTransferCancelled(DataTransferCancelledEvent { source }))
    }

    /// A drag started by this application ended. Returns the window it started from.
    pub(crate) fn drag_source_finished(
        &mut self,
        serial: DataTransferSerial,
        action: Option<DragAndDropAction>,
    ) -> Option<(Option<WindowId>, Event)> {
        let source = DataSource::DragAndDrop;
        if self.owned.get(&source).map(|owned| owned.serial) != Some(serial) {
            trace!(?serial, "end of a stale drag");
            return None;
        }
        let owned = self.owned.remove(&source)?;
        Some((owned.origin, Event::DragAndDropFinished(DragAndDropFinishedEvent { action })))
    }

    /// A drag entered `window_id`. The host must be queried for what it accepts.
    pub(crate) fn drag_enter(
        &mut self,
        serial: u32,
        window_id: WindowId,
        position: LogicalPosition<f64>,
        offer: DataOffer,
        source_actions: DragAndDropActions,
    ) -> DragAndDropQuery {
        let query = DragAndDropQuery {
            window_id,
            location_in_window: position,
            mime_types: offer.mime_types().to_vec(),
        };
        self.drag = Some(DragSession {
            serial,
            window_id,
            position,
            offer,
            source_actions,
            accepted: None,
        });
        query
    }

    pub(crate) fn drag_motion(
        &mut self,
        position: LogicalPosition<f64>,
    ) -> Option<DragAndDropQuery> {
        let drag = self.drag.as_mut()?;
        drag.position = position;
        Some(DragAndDropQuery {
            window_id: drag.window_id,
            location_in_window: position,
            mime_types: drag.offer.mime_types().to_vec(),
        })
    }

    /// Accept or reject the hovering drag according to the host's answer.
    pub(crate) fn respond(&mut self, response: &DragAndDropQueryResponse) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let accepted = response.negotiate(drag.offer.mime_types(), drag.source_actions);
        match &accepted {
            Some((mime_type, action)) => drag.offer.accept(Some(mime_type), Some(*action)),
            None => drag.offer.accept(None, None),
        }
        trace!(?accepted, "drag negotiated");
        drag.accepted = accepted;
    }

    /// The drag left the window it hovered.
    pub(crate) fn drag_leave(&mut self) -> Option<WindowId> {
        self.drag.take().map(|drag| drag.window_id)
    }

    /// The user released the drag. Only a drop matching the latest enter is performed.
    pub(crate) fn drop(&mut self, serial: u32) -> DropOutcome {
        let Some(drag) = self.drag.take() else {
            warn!(serial, "drop without a drag");
            return DropOutcome::Idle;
        };
        if drag.serial != serial {
            warn!(serial, expected = drag.serial, "drop serial doesn't match the drag");
            return DropOutcome::Left(drag.window_id);
        }
        match drag.accepted {
            Some((mime_type, action)) => DropOutcome::Perform {
                window_id: drag.window_id,
                offer: drag.offer,
                mime_type,
                action,
                location_in_window: drag.position,
            },
            None => {
                debug!(serial, "drop rejected");
                DropOutcome::Left(drag.window_id)
            },
        }
    }

    /// Forget drags hovering a destroyed window. Returns whether one was dropped.
    pub(crate) fn window_destroyed(&mut self, window_id: WindowId) -> bool {
        if self.drag.as_ref().is_some_and(|drag| drag.window_id == window_id) {
            self.drag = None;
            return true;
        }
        false
    }

    /// Cancel everything in flight. Returns the sources that were owned.
    ///
    /// Selections offered by other clients outlive the run.
    pub(crate) fn cancel_all(&mut self) -> Vec<DataSource> {
        if let Some(drag) = self.drag.take() {
            drag.offer.accept(None, None);
        }
        let sources: Vec<_> = self.owned.drain().map(|(source, _)| source).collect();
        if !sources.is_empty() {
            debug!(?sources, "negotiations cancelled");
        }
        sources
    }

    /// Drop the selection offers along with the connection that announced them.
    pub(crate) fn forget_offers(&mut self) {
        self.offers.clear();
    }
}

#[cfg(test)]
mod tests {
    use fenestra_core::data_transfer::SupportedActionsForMime;

    use super::*;
    use crate::platform::headless::InMemoryOffer;

    fn text_offer() -> (DataOffer, std::sync::Arc<InMemoryOffer>) {
        InMemoryOffer::new().with_payload("text/plain", "hello").into_offer()
    }

    fn accept_text() -> DragAndDropQueryResponse {
        DragAndDropQueryResponse {
            supported_actions_per_mime: vec![SupportedActionsForMime {
                mime_type: "text/plain".into(),
                supported_actions: DragAndDropActions::COPY,
                preferred_action: DragAndDropAction::Copy,
            }],
        }
    }

    #[test]
    fn paste_picks_host_order() {
        let mut negotiator = Negotiator::default();
        let (offer, _) = InMemoryOffer::new()
            .with_payload("text/plain", "a")
            .with_payload("text/html", "<b>a</b>")
            .into_offer();
        negotiator.selection(DataSource::Clipboard, Some(offer));

        let fetch = negotiator.paste(DataSource::Clipboard, DataTransferSerial(7), &[
            "image/png",
            "text/html",
            "text/plain",
        ]);
        assert!(matches!(fetch, Some(Fetch::Offer { mime_type, .. }) if mime_type == "text/html"));
        assert!(negotiator.paste(DataSource::Clipboard, DataTransferSerial(7), &["image/png"]).is_none());
        assert!(negotiator.paste(DataSource::PrimarySelection, DataTransferSerial(7), &["text/plain"]).is_none());
    }

    #[test]
    fn owned_selection_serves_itself() {
        let mut negotiator = Negotiator::default();
        negotiator.own(DataSource::Clipboard, DataTransferSerial(3), vec!["text/plain".into()], None);

        let fetch = negotiator.paste(DataSource::Clipboard, DataTransferSerial(1), &["text/plain"]);
        assert!(matches!(fetch, Some(Fetch::Owned { source: DataSource::Clipboard, .. })));

        assert!(negotiator.serve(DataSource::Clipboard, DataTransferSerial(3), "text/plain"));
        assert!(!negotiator.serve(DataSource::Clipboard, DataTransferSerial(2), "text/plain"));
        assert!(!negotiator.serve(DataSource::Clipboard, DataTransferSerial(3), "text/html"));

        assert!(negotiator.source_cancelled(DataSource::Clipboard, DataTransferSerial(2)).is_none());
        assert!(negotiator.source_cancelled(DataSource::Clipboard, DataTransferSerial(3)).is_some());
        assert!(negotiator.mime_types(DataSource::Clipboard).is_empty());
    }

    #[test]
    fn cancelling_keeps_foreign_selections() {
        let mut negotiator = Negotiator::default();
        let (clipboard, _) = text_offer();
        let (primary, _) = text_offer();
        negotiator.selection(DataSource::Clipboard, Some(clipboard));
        negotiator.selection(DataSource::PrimarySelection, Some(primary));
        negotiator.own(DataSource::PrimarySelection, DataTransferSerial(2), vec!["a/b".into()], None);

        assert_eq!(negotiator.cancel_all(), [DataSource::PrimarySelection]);
        assert_eq!(negotiator.mime_types(DataSource::Clipboard), ["text/plain"]);
        // Our source had replaced the foreign primary selection.
        assert!(negotiator.mime_types(DataSource::PrimarySelection).is_empty());

        negotiator.forget_offers();
        assert!(negotiator.mime_types(DataSource::Clipboard).is_empty());
    }

    #[test]
    fn drop_needs_matching_serial() {
        let window_id = WindowId::next_unique();
        let mut negotiator = Negotiator::default();
        let (offer, provider) = text_offer();

        negotiator.drag_enter(5, window_id, LogicalPosition::new(1.0, 1.0), offer, DragAndDropActions::COPY);
        negotiator.respond(&accept_text());
        assert_eq!(provider.accepted(), Some((Some("text/plain".into()), Some(DragAndDropAction::Copy))));

        assert!(matches!(negotiator.drop(4), DropOutcome::Left(id) if id == window_id));
        assert!(matches!(negotiator.drop(5), DropOutcome::Idle));
        assert_eq!(provider.receive_count(), 0);
    }

    #[test]
    fn drop_performs_accepted_type() {
        let window_id = WindowId::next_unique();
        let mut negotiator = Negotiator::default();
        let (offer, _) = text_offer();

        negotiator.drag_enter(1, window_id, LogicalPosition::new(0.0, 0.0), offer, DragAndDropActions::all());
        negotiator.drag_motion(LogicalPosition::new(4.0, 2.0));
        negotiator.respond(&accept_text());
        match negotiator.drop(1) {
            DropOutcome::Perform { mime_type, action, location_in_window, .. } => {
                assert_eq!(mime_type, "text/plain");
                assert_eq!(action, DragAndDropAction::Copy);
                assert_eq!(location_in_window, LogicalPosition::new(4.0, 2.0));
            },
            outcome => panic!("unexpected {outcome:?}"),
        }
    }

    #[test]
    fn rejected_drag_is_not_performed() {
        let window_id = WindowId::next_unique();
        let mut negotiator = Negotiator::default();
        let (offer, provider) = text_offer();

        negotiator.drag_enter(1, window_id, LogicalPosition::new(0.0, 0.0), offer, DragAndDropActions::MOVE);
        negotiator.respond(&accept_text());
        assert_eq!(provider.accepted(), Some((None, None)));
        assert!(matches!(negotiator.drop(1), DropOutcome::Left(_)));
    }
}
