//! Provider integrations.
pub mod openai;
