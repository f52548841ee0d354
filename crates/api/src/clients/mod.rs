//! Outbound HTTP clients.

pub mod notes;

pub use notes::HttpNotesAssistant;
