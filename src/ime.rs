//! The text-input session of the key window.
use std::collections::HashSet;
use std::mem;

use fenestra_core::error::RequestError;
use fenestra_core::event::{Event, TextInputAvailabilityEvent};
use fenestra_core::text_input::{
    ComposingText, TextInputContext, TextInputDeleteSurroundingText, TextInputEvent,
    TextInputPreedit,
};
use fenestra_core::window::WindowId;
use tracing::{debug, trace, warn};

use crate::platform::headless::compositor::TextInputRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SessionState {
    #[default]
    Disabled,
    Enabled,
    Composing,
    Committing,
}

/// What to tell the compositor after a batch was applied.
#[derive(Debug, PartialEq)]
pub(crate) struct SurroundingReport {
    pub(crate) text: String,
    pub(crate) cursor: usize,
}

#[derive(Debug, Default)]
pub(crate) struct TextInputSession {
    state: SessionState,
    window: Option<WindowId>,
    available: HashSet<WindowId>,
    pending: TextInputEvent,
    composing: ComposingText,
}

fn request_of(context: &TextInputContext) -> TextInputRequest {
    TextInputRequest {
        surrounding_text: context.surrounding_text().to_owned(),
        cursor: context.cursor_byte(),
        anchor: context.selection_start_byte(),
        content_purpose: context.content_purpose,
        multiline: context.is_multiline,
        cursor_rectangle: (context.cursor_position, context.cursor_size),
    }
}

/// Native offsets use `-1` for "none".
fn offset(byte: i32) -> Option<usize> {
    usize::try_from(byte).ok()
}

impl TextInputSession {
    pub(crate) fn composing(&self) -> Option<&ComposingText> {
        (self.state != SessionState::Disabled).then_some(&self.composing)
    }

    /// An input method became available on `window_id`.
    pub(crate) fn enter(&mut self, window_id: WindowId) -> Option<Event> {
        self.available
            .insert(window_id)
            .then_some(Event::TextInputAvailability(TextInputAvailabilityEvent { available: true }))
    }

    /// The input method went away from `window_id`. Returns the event to deliver and whether an
    /// active session was disabled.
    pub(crate) fn leave(&mut self, window_id: WindowId) -> (Option<Event>, bool) {
        let event = self.available.remove(&window_id).then_some(Event::TextInputAvailability(
            TextInputAvailabilityEvent { available: false },
        ));
        let disabled = self.window == Some(window_id) && self.disable();
        (event, disabled)
    }

    pub(crate) fn enable(
        &mut self,
        key_window: Option<WindowId>,
        context: &TextInputContext,
    ) -> Result<(WindowId, TextInputRequest), RequestError> {
        let Some(window_id) = key_window.filter(|window_id| self.available.contains(window_id))
        else {
            warn!(?key_window, "text input enabled without an input method on the key window");
            return Err(RequestError::Ignored);
        };

        self.state = SessionState::Enabled;
        self.window = Some(window_id);
        self.pending = TextInputEvent::default();
        self.composing = ComposingText::from_context(context);
        debug!(?window_id, "text input enabled");
        Ok((window_id, request_of(context)))
    }

    /// The host changed its text. A preedit being composed survives.
    pub(crate) fn update(
        &mut self,
        context: &TextInputContext,
    ) -> Result<TextInputRequest, RequestError> {
        if self.state == SessionState::Disabled {
            warn!("text input updated while disabled");
            return Err(RequestError::Ignored);
        }

        let preedit = self.composing.preedit().cloned();
        self.composing = ComposingText::from_context(context);
        if preedit.is_some() {
            self.composing.apply(&TextInputEvent { preedit, ..Default::default() });
        }
        Ok(request_of(context))
    }

    /// Returns whether a session was active.
    pub(crate) fn disable(&mut self) -> bool {
        if self.state == SessionState::Disabled {
            return false;
        }
        self.state = SessionState::Disabled;
        self.window = None;
        self.pending = TextInputEvent::default();
        self.composing.cancel();
        debug!("text input disabled");
        true
    }

    pub(crate) fn preedit_string(&mut self, text: Option<String>, begin: i32, end: i32) {
        self.pending.preedit = text.map(|text| TextInputPreedit {
            text,
            cursor_begin_byte: offset(begin),
            cursor_end_byte: offset(end),
        });
        if self.state == SessionState::Enabled {
            self.state = SessionState::Composing;
        }
    }

    pub(crate) fn commit_string(&mut self, text: Option<String>) {
        self.pending.commit = text;
        if self.state != SessionState::Disabled {
            self.state = SessionState::Committing;
        }
    }

    pub(crate) fn delete_surrounding_text(&mut self, before: u32, after: u32) {
        self.pending.delete_surrounding_text = Some(TextInputDeleteSurroundingText {
            before_length_in_bytes: before as usize,
            after_length_in_bytes: after as usize,
        });
    }

    /// Close the current batch.
    ///
    /// Returns the window and event to deliver, plus the surrounding text to report when the
    /// committed text changed.
    pub(crate) fn done(
        &mut self,
        serial: u32,
    ) -> Option<(WindowId, Event, Option<SurroundingReport>)> {
        let batch = mem::take(&mut self.pending);
        let Some(window_id) = self.window else {
            if !batch.is_empty() {
                debug!(serial, "text input batch dropped, the session is disabled");
            }
            return None;
        };

        let was_composing = self.composing.preedit().is_some();
        if batch.is_empty() && !was_composing {
            trace!(serial, "empty text input batch");
            return None;
        }

        let changed = self.composing.apply(&batch);
        self.state = if self.composing.preedit().is_some() {
            SessionState::Composing
        } else {
            SessionState::Enabled
        };

        let report = changed.then(|| SurroundingReport {
            text: self.composing.text().to_owned(),
            cursor: self.composing.cursor(),
        });
        Some((window_id, Event::TextInput(batch), report))
    }

    /// Forget a destroyed window. Returns whether its session was disabled.
    pub(crate) fn window_destroyed(&mut self, window_id: WindowId) -> bool {
        self.available.remove(&window_id);
        self.window == Some(window_id) && self.disable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_session(text: &str) -> (TextInputSession, WindowId) {
        let window_id = WindowId::next_unique();
        let mut session = TextInputSession::default();
        session.enter(window_id);
        let cursor = text.chars().count();
        let context = TextInputContext::new(text.into(), cursor, cursor).unwrap();
        session.enable(Some(window_id), &context).unwrap();
        (session, window_id)
    }

    #[test]
    fn enable_needs_availability_on_key_window() {
        let window_id = WindowId::next_unique();
        let mut session = TextInputSession::default();
        let context = TextInputContext::new(String::new(), 0, 0).unwrap();

        assert!(matches!(session.enable(Some(window_id), &context), Err(RequestError::Ignored)));
        assert!(matches!(session.enable(None, &context), Err(RequestError::Ignored)));
        assert!(matches!(session.update(&context), Err(RequestError::Ignored)));

        session.enter(window_id);
        assert!(session.enable(Some(window_id), &context).is_ok());
        assert_eq!(session.state, SessionState::Enabled);
    }

    #[test]
    fn batches_wait_for_done() {
        let (mut session, window_id) = enabled_session("");

        session.preedit_string(Some("ni".into()), 2, 2);
        assert_eq!(session.state, SessionState::Composing);
        let (target, _, report) = session.done(1).unwrap();
        assert_eq!(target, window_id);
        assert_eq!(report, None);

        session.commit_string(Some("你".into()));
        assert_eq!(session.state, SessionState::Committing);
        let (_, event, report) = session.done(2).unwrap();
        assert!(matches!(event, Event::TextInput(TextInputEvent { preedit: None, .. })));
        assert_eq!(report, Some(SurroundingReport { text: "你".into(), cursor: 3 }));
        assert_eq!(session.state, SessionState::Enabled);
    }

    #[test]
    fn hidden_cursor_and_dropped_batches() {
        let (mut session, _) = enabled_session("a");
        session.preedit_string(Some("b".into()), -1, -1);
        session.done(1);
        assert_eq!(session.composing().unwrap().display_cursor(), None);

        assert!(session.disable());
        session.commit_string(Some("x".into()));
        assert!(session.done(2).is_none());
        assert!(session.composing().is_none());
    }

    #[test]
    fn update_keeps_preedit() {
        let (mut session, _) = enabled_session("ab");
        session.preedit_string(Some("c".into()), 1, 1);
        session.done(1);

        let context = TextInputContext::new("xyz".into(), 3, 3).unwrap();
        session.update(&context).unwrap();
        let composing = session.composing().unwrap();
        assert_eq!(composing.display_text(), "xyzc");
    }

    #[test]
    fn leave_disables() {
        let (mut session, window_id) = enabled_session("");
        let (event, disabled) = session.leave(window_id);
        assert!(matches!(
            event,
            Some(Event::TextInputAvailability(TextInputAvailabilityEvent { available: false }))
        ));
        assert!(disabled);
        assert_eq!(session.state, SessionState::Disabled);
    }
}
