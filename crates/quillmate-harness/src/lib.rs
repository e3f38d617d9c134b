//! Model catalog, provider adapters and streaming response consumption for
//! the quillmate editor assistant.
//!
//! # Streaming into a listener
//!
//! ```no_run
//! use quillmate_harness::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), AiError> {
//! let harness = Harness::builder().config(AiConfig::from_env()).build()?;
//! harness.set_current_model("gpt-4o")?;
//!
//! let text = harness
//!     .complete(ChatRequest::new("Summarize the following text:").selected_text("..."))
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

/// Persisted model list and current selection.
pub mod catalog;
/// Provider credentials and request defaults.
pub mod config;
/// Read loop driving a response body into a listener.
pub mod consumer;
/// Public error types.
pub mod errors;
/// Harness entry point and builder.
pub mod harness;
/// Listener contract for stream lifecycle events.
pub mod listener;
/// Model and provider identifiers.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contract and request types.
pub mod provider;
/// Settings storage.
pub mod settings;
/// Line framing and delta extraction for SSE bodies.
pub mod stream;
/// Vendor-specific integrations.
pub mod vendors;

pub use catalog::ModelCatalog;
pub use config::{AiConfig, RequestDefaults};
pub use consumer::{AbortHandle, StreamConsumer, StreamSummary};
pub use errors::{AiError, CatalogError, ProviderError, SettingsError};
pub use harness::{Harness, HarnessBuilder, PreparedCall};
pub use listener::{StopReason, StreamListener, TextCollector};
pub use model::{AiModel, NewModel, ProviderKind};
pub use provider::{ByteStream, ChatProvider, ChatRequest, ProviderRequest};
pub use settings::{JsonFileSettingsStore, MemorySettingsStore, SettingsStore};
pub use stream::{Delta, DeltaExtractor, DeltaStatus, Extracted, LineDecoder};
