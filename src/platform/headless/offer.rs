//! Data offered by other clients.
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fenestra_core::data_transfer::DragAndDropAction;

/// The other end of a selection or drag offer.
///
/// Bytes are only produced on request, for one MIME type at a time.
pub trait DataOfferProvider: Send + Sync + fmt::Debug {
    /// Read the offered data as `mime_type`, `None` when the transfer failed.
    fn receive(&self, mime_type: &str) -> Option<Vec<u8>>;

    /// The destination changed what it would accept from a drag.
    fn accept(&self, mime_type: Option<&str>, action: Option<DragAndDropAction>) {
        let _ = (mime_type, action);
    }

    /// The destination finished a drop with `action`.
    fn finish(&self, action: DragAndDropAction) {
        let _ = action;
    }
}

/// An offer as announced by the compositor: the MIME types and a way to fetch them.
#[derive(Clone, Debug)]
pub struct DataOffer {
    mime_types: Vec<String>,
    provider: Arc<dyn DataOfferProvider>,
}

impl DataOffer {
    pub fn new(mime_types: Vec<String>, provider: Arc<dyn DataOfferProvider>) -> Self {
        Self { mime_types, provider }
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Fetch the data, refusing MIME types the offer never announced.
    pub fn receive(&self, mime_type: &str) -> Option<Vec<u8>> {
        if !self.mime_types.iter().any(|mime| mime == mime_type) {
            tracing::warn!(mime_type, "receive for a MIME type the offer doesn't carry");
            return None;
        }
        self.provider.receive(mime_type)
    }

    pub(crate) fn accept(&self, mime_type: Option<&str>, action: Option<DragAndDropAction>) {
        self.provider.accept(mime_type, action);
    }

    pub(crate) fn finish(&self, action: DragAndDropAction) {
        self.provider.finish(action);
    }
}

/// A [`DataOfferProvider`] serving fixed payloads and remembering how it was used.
#[derive(Debug, Default)]
pub struct InMemoryOffer {
    payloads: HashMap<String, Vec<u8>>,
    receives: AtomicUsize,
    accepted: Mutex<Option<(Option<String>, Option<DragAndDropAction>)>>,
    finished: Mutex<Option<DragAndDropAction>>,
}

impl InMemoryOffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.payloads.insert(mime_type.into(), data.into());
        self
    }

    /// Wrap into a [`DataOffer`] announcing every payload.
    pub fn into_offer(self) -> (DataOffer, Arc<InMemoryOffer>) {
        let mut mime_types: Vec<String> = self.payloads.keys().cloned().collect();
        mime_types.sort();
        let provider = Arc::new(self);
        (DataOffer::new(mime_types, provider.clone()), provider)
    }

    /// How many times data was fetched.
    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    /// The last [`DataOfferProvider::accept`] call.
    pub fn accepted(&self) -> Option<(Option<String>, Option<DragAndDropAction>)> {
        self.accepted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn finished(&self) -> Option<DragAndDropAction> {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DataOfferProvider for InMemoryOffer {
    fn receive(&self, mime_type: &str) -> Option<Vec<u8>> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        self.payloads.get(mime_type).cloned()
    }

    fn accept(&self, mime_type: Option<&str>, action: Option<DragAndDropAction>) {
        *self.accepted.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((mime_type.map(str::to_owned), action));
    }

    fn finish(&self, action: DragAndDropAction) {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = Some(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_only_announced_types() {
        let (offer, provider) =
            InMemoryOffer::new().with_payload("text/plain", b"hello".to_vec()).into_offer();
        assert_eq!(offer.mime_types(), ["text/plain".to_owned()]);
        assert_eq!(offer.receive("text/html"), None);
        assert_eq!(provider.receive_count(), 0);
        assert_eq!(offer.receive("text/plain").as_deref(), Some(&b"hello"[..]));
        assert_eq!(provider.receive_count(), 1);
    }
}
