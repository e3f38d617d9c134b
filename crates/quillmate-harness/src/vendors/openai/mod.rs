//! OpenAI-compatible Chat Completions streaming, shared by the `openai` and
//! `deepseek` provider kinds.
mod adapter;
mod config;

pub use adapter::OpenAiCompatibleProvider;
pub use config::OpenAiCompatibleConfig;
