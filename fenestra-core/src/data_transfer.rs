//! Clipboard, primary selection and drag-and-drop types.
//!
//! Data is always negotiated by MIME type and fetched lazily: an offer only lists what it can
//! provide, and bytes are produced once a consumer asks for one specific type.
use bitflags::bitflags;
use dpi::LogicalPosition;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::window::WindowId;

/// Where a data transfer comes from or goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataSource {
    Clipboard,
    DragAndDrop,
    /// The "middle click" selection.
    PrimarySelection,
}

/// Serial identifying one offer or one owned source.
///
/// A serial that no longer matches the current offer or source is stale, and requests made with
/// it are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataTransferSerial(pub u32);

/// What happens to dragged data once dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DragAndDropAction {
    Copy,
    Move,
    /// Let the user pick once dropped.
    Ask,
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct DragAndDropActions: u8 {
        const COPY = 1 << 0;
        const MOVE = 1 << 1;
        const ASK = 1 << 2;
    }
}

impl From<DragAndDropAction> for DragAndDropActions {
    fn from(action: DragAndDropAction) -> Self {
        match action {
            DragAndDropAction::Copy => Self::COPY,
            DragAndDropAction::Move => Self::MOVE,
            DragAndDropAction::Ask => Self::ASK,
        }
    }
}

impl DragAndDropActions {
    /// The single action this set represents, preferring copy over move over ask.
    pub fn first(self) -> Option<DragAndDropAction> {
        if self.contains(Self::COPY) {
            Some(DragAndDropAction::Copy)
        } else if self.contains(Self::MOVE) {
            Some(DragAndDropAction::Move)
        } else if self.contains(Self::ASK) {
            Some(DragAndDropAction::Ask)
        } else {
            None
        }
    }
}

/// A drag hovering a window, asking the host what it would accept.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragAndDropQuery {
    pub window_id: WindowId,
    pub location_in_window: LogicalPosition<f64>,
    /// MIME types the drag offers.
    pub mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SupportedActionsForMime {
    pub mime_type: String,
    pub supported_actions: DragAndDropActions,
    pub preferred_action: DragAndDropAction,
}

/// The host's answer to a [`DragAndDropQuery`], most preferred MIME type first.
///
/// An empty response rejects the drag at that location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragAndDropQueryResponse {
    pub supported_actions_per_mime: Vec<SupportedActionsForMime>,
}

impl DragAndDropQueryResponse {
    pub fn reject() -> Self {
        Self::default()
    }

    /// Pick the first MIME type, in host order, that the offer carries and that has an action in
    /// common with `source_actions`.
    pub fn negotiate<S: AsRef<str>>(
        &self,
        offered: &[S],
        source_actions: DragAndDropActions,
    ) -> Option<(String, DragAndDropAction)> {
        self.supported_actions_per_mime.iter().find_map(|supported| {
            if !offered.iter().any(|mime| mime.as_ref() == supported.mime_type) {
                return None;
            }
            let common = supported.supported_actions & source_actions;
            let action = if common.contains(supported.preferred_action.into()) {
                supported.preferred_action
            } else {
                common.first()?
            };
            Some((supported.mime_type.clone(), action))
        })
    }
}

/// Pick the first of `supported`, in host order, that `offered` carries.
pub fn pick_mime_type<S: AsRef<str>, O: AsRef<str>>(
    supported: &[S],
    offered: &[O],
) -> Option<String> {
    supported
        .iter()
        .map(AsRef::as_ref)
        .find(|wanted| offered.iter().any(|mime| mime.as_ref() == *wanted))
        .map(str::to_owned)
}

/// Fetched data of one MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataTransferContent {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mime: &str, actions: DragAndDropActions, preferred: DragAndDropAction) -> SupportedActionsForMime {
        SupportedActionsForMime {
            mime_type: mime.into(),
            supported_actions: actions,
            preferred_action: preferred,
        }
    }

    #[test]
    fn negotiation_follows_host_order() {
        let response = DragAndDropQueryResponse {
            supported_actions_per_mime: vec![
                entry("text/uri-list", DragAndDropActions::all(), DragAndDropAction::Move),
                entry("text/plain", DragAndDropActions::COPY, DragAndDropAction::Copy),
            ],
        };

        let offered = ["text/plain", "text/uri-list"];
        assert_eq!(
            response.negotiate(&offered, DragAndDropActions::all()),
            Some(("text/uri-list".into(), DragAndDropAction::Move))
        );
        assert_eq!(
            response.negotiate(&offered, DragAndDropActions::COPY),
            Some(("text/uri-list".into(), DragAndDropAction::Copy))
        );
        assert_eq!(response.negotiate(&["image/png"], DragAndDropActions::all()), None);
    }

    #[test]
    fn no_common_action_skips_mime() {
        let response = DragAndDropQueryResponse {
            supported_actions_per_mime: vec![
                entry("text/uri-list", DragAndDropActions::MOVE, DragAndDropAction::Move),
                entry("text/plain", DragAndDropActions::COPY, DragAndDropAction::Copy),
            ],
        };
        assert_eq!(
            response.negotiate(&["text/plain", "text/uri-list"], DragAndDropActions::COPY),
            Some(("text/plain".into(), DragAndDropAction::Copy))
        );
        assert_eq!(DragAndDropQueryResponse::reject().negotiate(&["text/plain"], DragAndDropActions::all()), None);
    }

    #[test]
    fn pick_first_supported() {
        let offered = vec!["text/html".to_owned(), "text/plain;charset=utf-8".to_owned()];
        assert_eq!(
            pick_mime_type(&["text/plain;charset=utf-8", "text/html"], &offered).as_deref(),
            Some("text/plain;charset=utf-8")
        );
        assert_eq!(pick_mime_type(&["image/png"], &offered), None);
    }
}
