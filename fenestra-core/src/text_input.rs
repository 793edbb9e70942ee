//! Text input (IME) types and the host-side composition model.
use std::fmt;

use dpi::{LogicalPosition, LogicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of data entered into the focused text field.
///
/// Input methods may use it to pick a layout or to hide suggestions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextInputContentPurpose {
    /// Default input, allowing all characters.
    #[default]
    Normal,
    /// Only alphabetic characters.
    Alpha,
    /// Only digits.
    Digits,
    /// A number, including decimal separator and sign.
    Number,
    Phone,
    Url,
    Email,
    /// The name of a person.
    Name,
    /// Treated as sensitive.
    Password,
    /// A password composed only of digits, treated as sensitive.
    Pin,
    Date,
    Time,
    DateTime,
    Terminal,
}

impl TextInputContentPurpose {
    /// Whether input methods should avoid learning from the text.
    pub fn is_sensitive(self) -> bool {
        matches!(self, Self::Password | Self::Pin)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum TextInputContextError {
    /// Text exceeds [`TextInputContext::MAX_TEXT_BYTES`].
    TextTooLong,
    /// Cursor past the end of the text.
    CursorBadPosition,
    /// Selection start past the end of the text.
    SelectionBadPosition,
}

impl fmt::Display for TextInputContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextTooLong => write!(f, "surrounding text exceeds maximum length"),
            Self::CursorBadPosition => write!(f, "cursor is not at a valid text index"),
            Self::SelectionBadPosition => {
                write!(f, "selection start is not at a valid text index")
            },
        }
    }
}

impl std::error::Error for TextInputContextError {}

/// State of the focused text field, as the host sees it.
///
/// Offsets are counted in Unicode scalar values. They are converted to byte offsets when handed
/// to the native input method, see [`TextInputContext::cursor_byte`].
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextInputContext {
    /// An excerpt of the text in the field, excluding any preedit.
    surrounding_text: String,
    cursor_codepoint: usize,
    /// The other end of the selection. Equal to the cursor when nothing is selected.
    selection_start_codepoint: usize,
    pub is_multiline: bool,
    pub content_purpose: TextInputContentPurpose,
    /// Area of the caret in window-local logical coordinates, used to place candidate popups.
    pub cursor_position: LogicalPosition<f64>,
    pub cursor_size: LogicalSize<f64>,
    /// Set when the update only mirrors a change the input method itself made.
    pub change_caused_by_input_method: bool,
}

impl TextInputContext {
    /// The maximum size of the text excerpt, in bytes.
    pub const MAX_TEXT_BYTES: usize = 4000;

    /// Describe the text around the cursor.
    ///
    /// A text field containing `foo|bar` where `|` denotes the caret corresponds to:
    ///
    /// ```
    /// # use fenestra_core::text_input::TextInputContext;
    /// let ctx = TextInputContext::new("foobar".into(), 3, 3).unwrap();
    /// assert_eq!(ctx.cursor_byte(), 3);
    /// ```
    pub fn new(
        surrounding_text: String,
        cursor_codepoint: usize,
        selection_start_codepoint: usize,
    ) -> Result<Self, TextInputContextError> {
        if surrounding_text.len() > Self::MAX_TEXT_BYTES {
            return Err(TextInputContextError::TextTooLong);
        }

        let len = surrounding_text.chars().count();
        if cursor_codepoint > len {
            return Err(TextInputContextError::CursorBadPosition);
        }
        if selection_start_codepoint > len {
            return Err(TextInputContextError::SelectionBadPosition);
        }

        Ok(Self {
            surrounding_text,
            cursor_codepoint,
            selection_start_codepoint,
            is_multiline: false,
            content_purpose: TextInputContentPurpose::Normal,
            cursor_position: LogicalPosition::new(0.0, 0.0),
            cursor_size: LogicalSize::new(0.0, 0.0),
            change_caused_by_input_method: false,
        })
    }

    pub fn with_content_purpose(mut self, purpose: TextInputContentPurpose) -> Self {
        self.content_purpose = purpose;
        self
    }

    pub fn with_multiline(mut self, is_multiline: bool) -> Self {
        self.is_multiline = is_multiline;
        self
    }

    pub fn with_cursor_area(
        mut self,
        position: LogicalPosition<f64>,
        size: LogicalSize<f64>,
    ) -> Self {
        self.cursor_position = position;
        self.cursor_size = size;
        self
    }

    pub fn with_change_caused_by_input_method(mut self, caused: bool) -> Self {
        self.change_caused_by_input_method = caused;
        self
    }

    pub fn surrounding_text(&self) -> &str {
        &self.surrounding_text
    }

    pub fn cursor_codepoint(&self) -> usize {
        self.cursor_codepoint
    }

    pub fn selection_start_codepoint(&self) -> usize {
        self.selection_start_codepoint
    }

    /// The cursor as a byte offset into [`Self::surrounding_text`].
    pub fn cursor_byte(&self) -> usize {
        codepoint_to_byte(&self.surrounding_text, self.cursor_codepoint)
    }

    /// The selection start as a byte offset into [`Self::surrounding_text`].
    pub fn selection_start_byte(&self) -> usize {
        codepoint_to_byte(&self.surrounding_text, self.selection_start_codepoint)
    }
}

fn codepoint_to_byte(text: &str, codepoint: usize) -> usize {
    text.char_indices().nth(codepoint).map_or(text.len(), |(byte, _)| byte)
}

/// Text being composed, not yet part of the field's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextInputPreedit {
    pub text: String,
    /// Start of the cursor (or highlighted range) inside `text`, in bytes.
    ///
    /// `None` for both bounds when the cursor should be hidden.
    pub cursor_begin_byte: Option<usize>,
    pub cursor_end_byte: Option<usize>,
}

/// Bytes to remove around the cursor, ignoring any preedit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextInputDeleteSurroundingText {
    pub before_length_in_bytes: usize,
    pub after_length_in_bytes: usize,
}

/// One atomic composition batch reported by the input method.
///
/// An empty or absent commit together with a present preedit means composition is still in
/// progress. Cancellation is never expressed as an empty commit: the session gets disabled
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextInputEvent {
    pub preedit: Option<TextInputPreedit>,
    pub commit: Option<String>,
    pub delete_surrounding_text: Option<TextInputDeleteSurroundingText>,
}

impl TextInputEvent {
    /// Whether the batch leaves a composition in progress.
    pub fn is_composing(&self) -> bool {
        self.preedit.as_ref().is_some_and(|p| !p.text.is_empty())
            && self.commit.as_deref().map_or(true, str::is_empty)
    }

    pub fn is_empty(&self) -> bool {
        self.preedit.is_none() && self.commit.is_none() && self.delete_surrounding_text.is_none()
    }
}

/// An editable buffer with an optional preedit at the cursor.
///
/// [`ComposingText::apply`] is the reference for how a [`TextInputEvent`] must be applied.
/// Hosts that keep their own text model should produce the same result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposingText {
    text: String,
    /// Byte offset into `text`.
    cursor: usize,
    preedit: Option<TextInputPreedit>,
}

impl ComposingText {
    /// Start from `text` with the cursor at byte `cursor`.
    ///
    /// The cursor is clamped to the text and moved back to the nearest char boundary.
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        let text = text.into();
        let cursor = floor_char_boundary(&text, cursor.min(text.len()));
        Self { text, cursor, preedit: None }
    }

    /// Start from what the host reported in `context`.
    pub fn from_context(context: &TextInputContext) -> Self {
        Self::new(context.surrounding_text(), context.cursor_byte())
    }

    /// Committed text, excluding the preedit.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor in [`Self::text`], in bytes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn preedit(&self) -> Option<&TextInputPreedit> {
        self.preedit.as_ref()
    }

    /// The text as displayed, with the preedit spliced in at the cursor.
    pub fn display_text(&self) -> String {
        let mut shown = self.text.clone();
        if let Some(preedit) = &self.preedit {
            shown.insert_str(self.cursor, &preedit.text);
        }
        shown
    }

    /// The displayed cursor range in [`Self::display_text`], `None` when hidden.
    pub fn display_cursor(&self) -> Option<(usize, usize)> {
        match &self.preedit {
            None => Some((self.cursor, self.cursor)),
            Some(preedit) => {
                let begin = preedit.cursor_begin_byte?;
                let end = preedit.cursor_end_byte.unwrap_or(begin);
                Some((self.cursor + begin, self.cursor + end))
            },
        }
    }

    /// Apply one batch in the mandatory order:
    ///
    /// 1. remove the existing preedit,
    /// 2. delete the requested surrounding bytes,
    /// 3. insert the commit at the cursor,
    /// 4. report the surrounding text,
    /// 5. insert the new preedit at the cursor,
    /// 6. place the cursor inside the preedit.
    ///
    /// Returns `true` when the committed text changed, in which case the surrounding text must
    /// be reported back to the input method (step 4).
    pub fn apply(&mut self, event: &TextInputEvent) -> bool {
        // 1.
        self.preedit = None;

        let mut changed = false;

        // 2.
        if let Some(delete) = event.delete_surrounding_text {
            let start = floor_char_boundary(
                &self.text,
                self.cursor.saturating_sub(delete.before_length_in_bytes),
            );
            let end = ceil_char_boundary(
                &self.text,
                self.cursor.saturating_add(delete.after_length_in_bytes).min(self.text.len()),
            );
            if start < end {
                self.text.replace_range(start..end, "");
                changed = true;
            }
            self.cursor = start;
        }

        // 3.
        if let Some(commit) = event.commit.as_deref().filter(|c| !c.is_empty()) {
            self.text.insert_str(self.cursor, commit);
            self.cursor += commit.len();
            changed = true;
        }

        // 4. is up to the caller.

        // 5. + 6.
        if let Some(preedit) = event.preedit.as_ref().filter(|p| !p.text.is_empty()) {
            let clamp = |byte: Option<usize>| {
                byte.map(|b| floor_char_boundary(&preedit.text, b.min(preedit.text.len())))
            };
            self.preedit = Some(TextInputPreedit {
                text: preedit.text.clone(),
                cursor_begin_byte: clamp(preedit.cursor_begin_byte),
                cursor_end_byte: clamp(preedit.cursor_end_byte),
            });
        }

        changed
    }

    /// Drop the composition without committing it.
    pub fn cancel(&mut self) {
        self.preedit = None;
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
