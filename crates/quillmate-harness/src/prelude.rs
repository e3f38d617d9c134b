//! Common imports for typical harness usage.
pub use crate::{
    AbortHandle, AiConfig, AiError, AiModel, ChatRequest, Delta, DeltaStatus, Harness,
    NewModel, ProviderKind, StopReason, StreamListener, StreamSummary, TextCollector,
};
