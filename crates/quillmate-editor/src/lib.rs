//! Editor side of the quillmate assistant: a document contract, streamed
//! document updates with Markdown re-rendering, and the command dispatcher
//! behind "improve", "summarize", "translate" and "fix grammar".

pub mod command;
pub mod document;
pub mod markdown;
pub mod observability;
pub mod region;
pub mod session;

pub use command::{CommandDispatcher, CommandError, CommandOutcome, EditorCommand};
pub use document::{
    Document, DocumentError, MarkState, Position, RegionMark, SharedDocument, TextDocument,
    TextRange, shared,
};
pub use markdown::{MarkdownError, MarkdownRenderer, PulldownMarkdownRenderer};
pub use observability::init_observability;
pub use region::{RegionClaim, RegionGuard};
pub use session::DocumentSession;
