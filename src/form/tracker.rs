//! # Command Tracker
//!
//! Maps one free-text command to one [`Action`], updating the session as a
//! side effect. Intent recognition is deliberately simple: an ordered list
//! of trigger substrings evaluated first-match-wins against the lowercased
//! command. The serialized shape of [`Action`] is the wire contract the
//! browser consumes, so the serde attributes here are load-bearing.
//!
//! ## Matching Priority:
//! 1. "fill a form": opens or reopens the default form from any state
//! 2. "name is" / "email is" / "submit": only while a form is open
//! 3. anything else: no-op
//!
//! The open-form phrase is checked against the whole command before the
//! field phrases, so a command like "email is x, let's fill a form" reopens
//! the form instead of capturing the email. That precedence is part of the
//! observable behavior and is pinned by a test below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::form::{FormSession, DEFAULT_FORM};

/// Trigger phrase that opens (or restarts) the default form.
const OPEN_FORM_PHRASE: &str = "fill a form";

/// Trigger phrase that submits the open form.
const SUBMIT_PHRASE: &str = "submit";

/// Field-capture trigger phrases, evaluated in order.
const FIELD_PHRASES: [(&str, &str); 2] = [("name", "name is"), ("email", "email is")];

/// The structured result of interpreting one command.
///
/// Serializes to the exact JSON the frontend dispatches on, e.g.
/// `{"action":"update_field","field":"name","value":"john smith"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// A form was opened; captured fields were reset
    OpenForm { form: String },

    /// A field value was captured into the open form
    UpdateField { field: String, value: String },

    /// The open form was submitted with everything captured so far
    SubmitForm { data: HashMap<String, String> },

    /// The command matched no trigger phrase (or no form was open)
    Noop,
}

/// Interpret one command against the session and return the action taken.
///
/// The command is lowercased before matching, and captured values are the
/// lowercased remainder after the first occurrence of the trigger phrase,
/// trimmed. Empty values are accepted. Every input resolves to exactly one
/// action; there is no error path.
pub fn handle_command(session: &mut FormSession, command: &str) -> Action {
    let command = command.to_lowercase();

    if command.contains(OPEN_FORM_PHRASE) {
        session.open(DEFAULT_FORM);
        return Action::OpenForm {
            form: DEFAULT_FORM.to_string(),
        };
    }

    if session.is_collecting() {
        for (field, phrase) in FIELD_PHRASES {
            if let Some((_, remainder)) = command.split_once(phrase) {
                let value = remainder.trim();
                session.set_field(field, value);
                return Action::UpdateField {
                    field: field.to_string(),
                    value: value.to_string(),
                };
            }
        }

        if command.contains(SUBMIT_PHRASE) {
            return Action::SubmitForm {
                data: session.take_submission(),
            };
        }
    }

    Action::Noop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting_session() -> FormSession {
        let mut session = FormSession::new();
        session.open(DEFAULT_FORM);
        session
    }

    #[test]
    fn test_fill_a_form_opens_from_idle() {
        let mut session = FormSession::new();
        let action = handle_command(&mut session, "I want to fill a form");

        assert_eq!(
            action,
            Action::OpenForm {
                form: "default".to_string()
            }
        );
        assert_eq!(session.active_form(), Some("default"));
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_fill_a_form_resets_collected_fields() {
        let mut session = collecting_session();
        handle_command(&mut session, "my name is John Smith");

        let action = handle_command(&mut session, "let's fill a form again");
        assert_eq!(
            action,
            Action::OpenForm {
                form: "default".to_string()
            }
        );
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_name_capture_is_lowercased_and_trimmed() {
        let mut session = collecting_session();
        let action = handle_command(&mut session, "My name is John Smith");

        assert_eq!(
            action,
            Action::UpdateField {
                field: "name".to_string(),
                value: "john smith".to_string(),
            }
        );
        assert_eq!(
            session.fields().get("name").map(String::as_str),
            Some("john smith")
        );
    }

    #[test]
    fn test_email_capture() {
        let mut session = collecting_session();
        let action = handle_command(&mut session, "my email is John@Example.com");

        assert_eq!(
            action,
            Action::UpdateField {
                field: "email".to_string(),
                value: "john@example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_value_is_accepted() {
        let mut session = collecting_session();
        let action = handle_command(&mut session, "my name is");

        assert_eq!(
            action,
            Action::UpdateField {
                field: "name".to_string(),
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_submit_emits_data_and_returns_to_idle() {
        let mut session = collecting_session();
        handle_command(&mut session, "my name is John Smith");

        let action = handle_command(&mut session, "please submit");
        match action {
            Action::SubmitForm { data } => {
                assert_eq!(data.get("name").map(String::as_str), Some("john smith"));
                assert_eq!(data.len(), 1);
            }
            other => panic!("expected SubmitForm, got {:?}", other),
        }

        assert!(!session.is_collecting());
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_field_phrase_ignored_while_idle() {
        let mut session = FormSession::new();
        let action = handle_command(&mut session, "my name is Jane");

        assert_eq!(action, Action::Noop);
        assert_eq!(session, FormSession::new());
    }

    #[test]
    fn test_unrecognized_command_is_noop() {
        let mut session = collecting_session();
        let before = session.clone();

        let action = handle_command(&mut session, "hello there");
        assert_eq!(action, Action::Noop);
        assert_eq!(session, before);
    }

    #[test]
    fn test_submit_ignored_while_idle() {
        let mut session = FormSession::new();
        let action = handle_command(&mut session, "please submit");
        assert_eq!(action, Action::Noop);
    }

    #[test]
    fn test_reopen_is_idempotent_on_state() {
        let mut session = FormSession::new();

        let first = handle_command(&mut session, "fill a form");
        handle_command(&mut session, "my name is John");
        let second = handle_command(&mut session, "fill a form");

        assert_eq!(first, second);
        assert!(session.is_collecting());
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_open_phrase_outranks_field_capture() {
        // "fill a form" is matched against the whole command before the
        // field phrases, so the email here is discarded and the form reset.
        let mut session = collecting_session();
        let action = handle_command(&mut session, "email is x@y.com, let's fill a form now");

        assert_eq!(
            action,
            Action::OpenForm {
                form: "default".to_string()
            }
        );
        assert!(session.fields().is_empty());
    }

    #[test]
    fn test_extraction_splits_on_first_occurrence() {
        let mut session = collecting_session();
        let action = handle_command(&mut session, "name is where my name is written");

        assert_eq!(
            action,
            Action::UpdateField {
                field: "name".to_string(),
                value: "where my name is written".to_string(),
            }
        );
    }

    #[test]
    fn test_action_wire_format() {
        let open = serde_json::to_value(Action::OpenForm {
            form: "default".to_string(),
        })
        .unwrap();
        assert_eq!(
            open,
            serde_json::json!({"action": "open_form", "form": "default"})
        );

        let noop = serde_json::to_value(Action::Noop).unwrap();
        assert_eq!(noop, serde_json::json!({"action": "noop"}));

        let update = serde_json::to_value(Action::UpdateField {
            field: "name".to_string(),
            value: "john smith".to_string(),
        })
        .unwrap();
        assert_eq!(
            update,
            serde_json::json!({"action": "update_field", "field": "name", "value": "john smith"})
        );

        let mut data = HashMap::new();
        data.insert("name".to_string(), "john smith".to_string());
        let submit = serde_json::to_value(Action::SubmitForm { data }).unwrap();
        assert_eq!(
            submit,
            serde_json::json!({"action": "submit_form", "data": {"name": "john smith"}})
        );
    }
}
