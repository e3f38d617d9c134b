//! Incremental parsing of server-sent-event response bodies.
mod decoder;
mod extract;

pub use decoder::LineDecoder;
pub use extract::{Delta, DeltaExtractor, DeltaStatus, ExtractError, Extracted};
