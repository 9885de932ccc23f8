//! # Form Session State
//!
//! Holds the in-progress form-filling state for one conversation. Each
//! WebSocket connection owns exactly one [`FormSession`]; the session is
//! mutated in place by every interpreted command and reset (not dropped)
//! on submit, so the same value is reused for the next form.
//!
//! ## Invariants:
//! - `fields` is non-empty only while `active_form` is set
//! - opening a form and submitting a form both reset `fields`

use std::collections::HashMap;
use std::mem;

use serde::Serialize;

/// The form-filling state for one conversation.
///
/// ## Lifecycle:
/// Starts idle (no form open, no fields). `open()` moves it to collecting,
/// `set_field()` captures values while collecting, and `take_submission()`
/// hands the captured fields out and returns the session to idle. The
/// session itself lives as long as its connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormSession {
    /// Identifier of the currently open form, `None` while idle
    active_form: Option<String>,

    /// Captured field values, keyed by field name
    fields: HashMap<String, String>,
}

impl FormSession {
    /// Create a new idle session with no form open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a form is currently open and collecting fields.
    pub fn is_collecting(&self) -> bool {
        self.active_form.is_some()
    }

    /// Identifier of the open form, if any.
    pub fn active_form(&self) -> Option<&str> {
        self.active_form.as_deref()
    }

    /// Read-only view of the captured fields.
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Open a form, discarding any previously captured fields.
    ///
    /// Reopening while a form is already open is allowed and resets the
    /// capture, matching the "fill a form restarts the form" behavior.
    pub fn open(&mut self, form: &str) {
        self.active_form = Some(form.to_string());
        self.fields.clear();
    }

    /// Store a captured value under a field name.
    ///
    /// Values are stored as captured, unvalidated; a later capture for the
    /// same field overwrites the earlier one.
    pub fn set_field(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.to_string());
    }

    /// Close the form and hand out everything captured so far.
    ///
    /// ## State Transition:
    /// Collecting → Idle. The returned map is the submission payload; the
    /// session is left empty and ready for the next form.
    pub fn take_submission(&mut self) -> HashMap<String, String> {
        self.active_form = None;
        mem::take(&mut self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = FormSession::new();
        assert!(!session.is_collecting());
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_open_discards_previous_fields() {
        let mut session = FormSession::new();
        session.open("default");
        session.set_field("name", "john smith");

        session.open("default");
        assert!(session.is_collecting());
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_take_submission_resets_to_idle() {
        let mut session = FormSession::new();
        session.open("default");
        session.set_field("name", "john smith");
        session.set_field("email", "john@example.com");

        let data = session.take_submission();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("name").map(String::as_str), Some("john smith"));

        assert!(!session.is_collecting());
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_set_field_overwrites() {
        let mut session = FormSession::new();
        session.open("default");
        session.set_field("name", "john");
        session.set_field("name", "jane");
        assert_eq!(session.fields().get("name").map(String::as_str), Some("jane"));
    }
}
