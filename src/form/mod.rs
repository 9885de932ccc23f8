//! # Form Filling Module
//!
//! The conversational form-filling core. A [`FormSession`] tracks one
//! conversation's in-progress form (open form identifier plus captured
//! fields), and [`tracker::handle_command`] maps a free-text command to
//! exactly one [`Action`] while updating that session in place.
//!
//! ## Command Vocabulary:
//! - **"fill a form"**: open (or reopen) the default form
//! - **"name is ..." / "email is ..."**: capture a field value
//! - **"submit"**: emit the collected fields and close the form
//!
//! Anything else resolves to a no-op. There is no validation of captured
//! values and no error path; the interpreter is total over its input.

pub mod session;
pub mod tracker;

pub use session::FormSession;
pub use tracker::{handle_command, Action};

/// Identifier of the only form schema the assistant knows how to fill.
pub const DEFAULT_FORM: &str = "default";

/// Field names the default form collects, in spoken-trigger order.
pub const DEFAULT_FORM_FIELDS: [&str; 2] = ["name", "email"];
