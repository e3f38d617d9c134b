use futures::StreamExt as _;
use tracing::debug;

use crate::errors::{AiError, ProviderError};
use crate::model::ProviderKind;
use crate::provider::{ByteStream, ChatProvider, ProviderRequest};

use super::config::OpenAiCompatibleConfig;

/// Streaming adapter for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    client: reqwest::Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Creates an adapter serving models of `kind`.
    pub fn new(kind: ProviderKind, config: OpenAiCompatibleConfig) -> Result<Self, AiError> {
        config.validate().map_err(|e| match e {
            AiError::Config(message) => AiError::Config(format!("{kind}: {message}")),
            other => other,
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AiError::Config(format!("failed to build {kind} client: {e}")))?;
        Ok(Self {
            kind,
            client,
            config,
        })
    }

    pub fn openai(config: OpenAiCompatibleConfig) -> Result<Self, AiError> {
        Self::new(ProviderKind::OpenAi, config)
    }

    pub fn deepseek(config: OpenAiCompatibleConfig) -> Result<Self, AiError> {
        Self::new(ProviderKind::DeepSeek, config)
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn open_stream(&self, req: &ProviderRequest) -> Result<ByteStream, ProviderError> {
        let kind = self.kind;
        let body = build_request_body(req);
        debug!(run_id = %req.run_id, provider = %kind, model = %req.model.id, "starting chat completions stream");

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(kind, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                kind,
                format!("chat completions request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(content_type) = content_type
            && !content_type.starts_with("text/event-stream")
        {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::protocol(
                kind,
                format!("expected an event stream, got {content_type}: {body}"),
            ));
        }

        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| ProviderError::transport(kind, format!("streaming read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }
}

pub(crate) fn build_request_body(req: &ProviderRequest) -> serde_json::Value {
    serde_json::json!({
        "model": req.model.id,
        "messages": [{ "role": "user", "content": req.user_content }],
        "temperature": req.temperature,
        "max_tokens": req.max_tokens,
        "stream": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AiModel;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            model: AiModel::new("gpt-4o", "GPT-4o", ProviderKind::OpenAi),
            user_content: "Polish the following text:\n\nhelo".into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    #[test]
    fn request_body_streams_single_user_message() {
        let body = build_request_body(&request());
        assert_eq!(body["stream"], serde_json::json!(true));
        assert_eq!(body["model"], serde_json::json!("gpt-4o"));
        assert_eq!(body["max_tokens"], serde_json::json!(2000));
        assert_eq!(body["messages"][0]["role"], serde_json::json!("user"));
        assert_eq!(
            body["messages"][0]["content"],
            serde_json::json!("Polish the following text:\n\nhelo")
        );
    }

    #[test]
    fn blank_key_is_rejected_at_construction() {
        let err = OpenAiCompatibleProvider::openai(OpenAiCompatibleConfig::new(""))
            .err()
            .expect("blank key");
        assert!(matches!(err, AiError::Config(message) if message.starts_with("openai")));
    }

    #[tokio::test]
    async fn streams_body_on_success() {
        let server = MockServer::start().await;
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"stream": true, "model": "gpt-4o"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::openai(
            OpenAiCompatibleConfig::new("test-key").base_url(format!("{}/v1", server.uri())),
        )
        .expect("provider");
        let mut stream = provider.open_stream(&request()).await.expect("stream");
        let mut raw = Vec::new();
        while let Some(chunk) = stream.next().await {
            raw.extend_from_slice(&chunk.expect("chunk"));
        }
        assert_eq!(String::from_utf8(raw).expect("utf8"), sse);
    }

    #[tokio::test]
    async fn non_stream_success_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": {"message": "stream unsupported"}})),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::openai(
            OpenAiCompatibleConfig::new("test-key").base_url(format!("{}/v1", server.uri())),
        )
        .expect("provider");
        let err = match provider.open_stream(&request()).await {
            Ok(_) => panic!("json body should not be streamed"),
            Err(err) => err,
        };
        assert!(matches!(err, ProviderError::Protocol { .. }));
        assert_eq!(err.status_code(), None);
        assert!(err.message().contains("application/json"));
        assert!(err.message().contains("stream unsupported"));
    }

    #[tokio::test]
    async fn error_status_is_a_provider_error_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::deepseek(
            OpenAiCompatibleConfig::deepseek("bad").base_url(format!("{}/v1", server.uri())),
        )
        .expect("provider");
        let err = match provider.open_stream(&request()).await {
            Ok(_) => panic!("401 should fail"),
            Err(err) => err,
        };
        assert_eq!(err.provider_kind(), ProviderKind::DeepSeek);
        assert_eq!(err.status_code(), Some(401));
        assert!(err.message().contains("invalid api key"));
    }
}
