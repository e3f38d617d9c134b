use std::pin::Pin;

use crate::errors::ProviderError;
use crate::model::{AiModel, ProviderKind};
use crate::stream::DeltaExtractor;

/// Response body as a pull-based stream of byte chunks.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ProviderError>> + Send + 'static>>;

/// A user-level request: instruction prompt plus the text it applies to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub selected_text: String,
    /// Language code for translation requests (for example `en`).
    pub target_language: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = text.into();
        self
    }

    pub fn target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    /// Text sent as the single user message: the prompt, a blank line, then
    /// the selected text.
    pub fn user_content(&self) -> String {
        if self.selected_text.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.prompt, self.selected_text)
        }
    }
}

/// Fully resolved request handed to an adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRequest {
    pub run_id: uuid::Uuid,
    pub model: AiModel,
    pub user_content: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Contract implemented by each provider integration.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Wire dialect of the streamed body.
    fn extractor(&self) -> DeltaExtractor {
        DeltaExtractor::openai()
    }

    /// Sends the request and returns the streamed body once the provider has
    /// answered with a success status.
    async fn open_stream(&self, req: &ProviderRequest) -> Result<ByteStream, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_content_joins_prompt_and_selection() {
        let req = ChatRequest::new("Summarize the following text:").selected_text("Rust is fast.");
        assert_eq!(
            req.user_content(),
            "Summarize the following text:\n\nRust is fast."
        );
        assert_eq!(ChatRequest::new("Hi").user_content(), "Hi");
    }
}
