use serde::{Deserialize, Serialize};

/// Whether more output follows a delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaStatus {
    Streaming,
    /// The provider reported a finish reason on this delta.
    Done,
}

/// One incremental unit of model output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub role: String,
    pub content: String,
    pub status: DeltaStatus,
    pub index: Option<u32>,
}

impl Delta {
    pub fn streaming(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
            status: DeltaStatus::Streaming,
            index: None,
        }
    }

    pub fn done(content: impl Into<String>) -> Self {
        Self {
            status: DeltaStatus::Done,
            ..Self::streaming(content)
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == DeltaStatus::Done
    }
}

/// Meaningful result of one event line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extracted {
    Delta(Delta),
    /// The terminal token was received; nothing after it is read.
    Terminal,
}

/// An event payload that could not be parsed. Recoverable: the line is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed event payload: {message}")]
pub struct ExtractError {
    pub message: String,
    pub payload: String,
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChoicePayload>,
}

#[derive(Deserialize)]
struct ChoicePayload {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    delta: Option<DeltaPayload>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct DeltaPayload {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Interprets decoded event lines for one wire dialect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaExtractor {
    prefix: String,
    terminal_token: String,
}

impl Default for DeltaExtractor {
    fn default() -> Self {
        Self::openai()
    }
}

impl DeltaExtractor {
    pub fn new(prefix: impl Into<String>, terminal_token: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            terminal_token: terminal_token.into(),
        }
    }

    /// OpenAI-compatible chat completion chunks: `data: {...}` and `data: [DONE]`.
    pub fn openai() -> Self {
        Self::new("data:", "[DONE]")
    }

    /// Returns `Ok(None)` for lines without the event prefix (comments,
    /// `event:` lines, keep-alives) and for payloads carrying no choice.
    pub fn extract(&self, line: &str) -> Result<Option<Extracted>, ExtractError> {
        let Some(rest) = line.trim_start().strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };
        let payload = rest.trim();
        if payload.is_empty() {
            return Ok(None);
        }
        if payload == self.terminal_token {
            return Ok(Some(Extracted::Terminal));
        }

        let chunk: ChunkPayload = serde_json::from_str(payload).map_err(|e| ExtractError {
            message: e.to_string(),
            payload: payload.to_string(),
        })?;
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(None);
        };
        let (role, content) = match choice.delta {
            Some(delta) => (delta.role, delta.content),
            None => (None, None),
        };
        Ok(Some(Extracted::Delta(Delta {
            role: role.unwrap_or_else(|| "assistant".to_string()),
            content: content.unwrap_or_default(),
            status: if choice.finish_reason.is_some() {
                DeltaStatus::Done
            } else {
                DeltaStatus::Streaming
            },
            index: choice.index,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(line: &str) -> Result<Option<Extracted>, ExtractError> {
        DeltaExtractor::openai().extract(line)
    }

    #[test]
    fn lines_without_prefix_are_ignored() {
        assert_eq!(extract("").unwrap(), None);
        assert_eq!(extract(": keep-alive").unwrap(), None);
        assert_eq!(extract("event: msg").unwrap(), None);
        assert_eq!(extract("data:").unwrap(), None);
    }

    #[test]
    fn terminal_token_is_recognized_regardless_of_whitespace() {
        for line in ["data: [DONE]", "data:[DONE]", "  data:   [DONE]  ", "data: [DONE]\r"] {
            assert_eq!(extract(line).unwrap(), Some(Extracted::Terminal), "{line:?}");
        }
    }

    #[test]
    fn content_index_and_role_are_extracted() {
        let line = r#"data: {"choices":[{"index":2,"delta":{"role":"assistant","content":"Hi"},"finish_reason":null}]}"#;
        assert_eq!(
            extract(line).unwrap(),
            Some(Extracted::Delta(Delta {
                role: "assistant".into(),
                content: "Hi".into(),
                status: DeltaStatus::Streaming,
                index: Some(2),
            }))
        );
    }

    #[test]
    fn finish_reason_marks_done_with_empty_content() {
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        let Some(Extracted::Delta(delta)) = extract(line).unwrap() else {
            panic!("expected delta");
        };
        assert!(delta.is_done());
        assert_eq!(delta.content, "");
    }

    #[test]
    fn empty_choices_yield_nothing() {
        assert_eq!(extract(r#"data: {"choices":[]}"#).unwrap(), None);
        assert_eq!(extract(r#"data: {"id":"x"}"#).unwrap(), None);
    }

    #[test]
    fn malformed_json_is_a_local_error() {
        let err = extract(r#"data: {"choices":[{"delta":"#).unwrap_err();
        assert_eq!(err.payload, r#"{"choices":[{"delta":"#);
    }

    #[test]
    fn custom_dialect_prefix() {
        let extractor = DeltaExtractor::new("payload=", "END");
        assert_eq!(extractor.extract("payload=END").unwrap(), Some(Extracted::Terminal));
        assert_eq!(extractor.extract("data: [DONE]").unwrap(), None);
    }
}
