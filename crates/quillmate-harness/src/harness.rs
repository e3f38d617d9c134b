use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info};

use crate::catalog::ModelCatalog;
use crate::config::AiConfig;
use crate::consumer::{AbortHandle, StreamConsumer, StreamSummary};
use crate::errors::{AiError, CatalogError};
use crate::listener::{StopReason, StreamListener, TextCollector};
use crate::model::{AiModel, NewModel, ProviderKind};
use crate::provider::{ChatProvider, ChatRequest, ProviderRequest};
use crate::settings::{MemorySettingsStore, SettingsStore};
use crate::vendors::openai::OpenAiCompatibleProvider;

pub(crate) struct HarnessInner {
    config: AiConfig,
    catalog: RwLock<ModelCatalog>,
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

/// Entry point owning provider configuration, the model catalog and the
/// registered provider adapters.
#[derive(Clone)]
pub struct Harness {
    inner: Arc<HarnessInner>,
}

impl Harness {
    /// Starts a builder for registering providers and creating a `Harness`.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    pub fn config(&self) -> &AiConfig {
        &self.inner.config
    }

    fn catalog(&self) -> RwLockReadGuard<'_, ModelCatalog> {
        self.inner.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog_mut(&self) -> RwLockWriteGuard<'_, ModelCatalog> {
        self.inner
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Built-in then custom models.
    pub fn models(&self) -> Vec<AiModel> {
        self.catalog().all_models()
    }

    pub fn current_model(&self) -> Option<AiModel> {
        self.catalog().current_model().cloned()
    }

    pub fn set_current_model(&self, id: &str) -> Result<(), CatalogError> {
        self.catalog_mut().set_current_model(id)
    }

    pub fn add_custom_model(&self, model: NewModel) -> Result<(), CatalogError> {
        self.catalog_mut().add_custom_model(model)
    }

    pub fn remove_custom_model(&self, id: &str) -> Result<(), CatalogError> {
        self.catalog_mut().remove_custom_model(id)
    }

    /// Resolves the current model and its adapter without any network I/O.
    pub fn resolve(&self) -> Result<(AiModel, Arc<dyn ChatProvider>), AiError> {
        let model = {
            let catalog = self.catalog();
            match catalog.current_model() {
                Some(model) => model.clone(),
                None => {
                    error!(selected = ?catalog.current_model_id(), "no AI model selected");
                    return Err(AiError::Config("no AI model selected".into()));
                }
            }
        };
        if let Some(provider) = self.inner.providers.get(&model.provider) {
            return Ok((model, provider.clone()));
        }
        match model.provider {
            ProviderKind::OpenAi | ProviderKind::DeepSeek => {
                error!(provider = %model.provider, model = %model.id, "provider credentials missing");
                Err(AiError::Config(format!(
                    "{} API key is not configured (model {})",
                    model.provider, model.name
                )))
            }
            provider => {
                error!(%provider, model = %model.id, "provider has no integration");
                Err(AiError::Unsupported {
                    provider,
                    model: model.id,
                })
            }
        }
    }

    /// Resolves the current model and prepares a cancellable call.
    ///
    /// Configuration problems are reported here, before any request is sent.
    pub fn prepare(&self, request: ChatRequest) -> Result<PreparedCall, AiError> {
        if request.prompt.trim().is_empty() {
            return Err(AiError::Validation("prompt must not be empty".into()));
        }
        let (model, provider) = self.resolve()?;
        let defaults = &self.inner.config.defaults;
        let consumer =
            StreamConsumer::new(provider.kind(), provider.extractor()).timeout(defaults.timeout);
        info!(run_id = %consumer.run_id(), model = %model.id, provider = %model.provider, "using model");
        let request = ProviderRequest {
            run_id: consumer.run_id(),
            model,
            user_content: request.user_content(),
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
        };
        Ok(PreparedCall {
            provider,
            request,
            consumer,
        })
    }

    /// Streams the current model's answer into `listener`.
    pub async fn stream_chat<L>(
        &self,
        request: ChatRequest,
        listener: &mut L,
    ) -> Result<StreamSummary, AiError>
    where
        L: StreamListener + ?Sized,
    {
        self.prepare(request)?.run(listener).await
    }

    /// Runs a call to completion and returns the concatenated text.
    ///
    /// A body that ends without a finish marker is an error; the partial
    /// text is dropped.
    pub async fn complete(&self, request: ChatRequest) -> Result<String, AiError> {
        let mut collector = TextCollector::new();
        let summary = self.stream_chat(request, &mut collector).await?;
        if summary.reason == StopReason::Truncated {
            return Err(AiError::Truncated {
                deltas: summary.deltas,
            });
        }
        Ok(collector.into_text())
    }
}

/// A resolved call that has not been sent yet.
pub struct PreparedCall {
    provider: Arc<dyn ChatProvider>,
    request: ProviderRequest,
    consumer: StreamConsumer,
}

impl PreparedCall {
    pub fn model(&self) -> &AiModel {
        &self.request.model
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.consumer.abort_handle()
    }

    pub async fn run<L>(self, listener: &mut L) -> Result<StreamSummary, AiError>
    where
        L: StreamListener + ?Sized,
    {
        let Self {
            provider,
            request,
            consumer,
        } = self;
        consumer
            .drive(provider.open_stream(&request), listener)
            .await
    }
}

/// Builder used to configure a `Harness`.
#[derive(Default)]
pub struct HarnessBuilder {
    config: AiConfig,
    store: Option<Arc<dyn SettingsStore>>,
    providers: Vec<Arc<dyn ChatProvider>>,
}

impl HarnessBuilder {
    /// Credentials and defaults; OpenAI and DeepSeek adapters are created
    /// from it unless registered explicitly.
    pub fn config(mut self, config: AiConfig) -> Self {
        self.config = config;
        self
    }

    /// Settings store backing the model catalog. Defaults to in-memory.
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Registers a provider adapter; one adapter per provider kind.
    pub fn register_provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Builds the harness and validates provider registration (including duplicates).
    pub fn build(self) -> Result<Harness, AiError> {
        let mut providers: HashMap<ProviderKind, Arc<dyn ChatProvider>> = HashMap::new();
        for provider in self.providers {
            let kind = provider.kind();
            if providers.insert(kind, provider).is_some() {
                return Err(AiError::Config(format!(
                    "duplicate provider registration: {kind}"
                )));
            }
        }
        if let Some(openai) = &self.config.openai
            && !providers.contains_key(&ProviderKind::OpenAi)
        {
            let provider = OpenAiCompatibleProvider::openai(openai.clone())?;
            providers.insert(ProviderKind::OpenAi, Arc::new(provider));
        }
        if let Some(deepseek) = &self.config.deepseek
            && !providers.contains_key(&ProviderKind::DeepSeek)
        {
            let provider = OpenAiCompatibleProvider::deepseek(deepseek.clone())?;
            providers.insert(ProviderKind::DeepSeek, Arc::new(provider));
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySettingsStore::new()));
        Ok(Harness {
            inner: Arc::new(HarnessInner {
                config: self.config,
                catalog: RwLock::new(ModelCatalog::load(store)),
                providers,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::ByteStream;
    use crate::vendors::openai::OpenAiCompatibleConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        kind: ProviderKind,
        calls: Arc<AtomicUsize>,
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl ChatProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn open_stream(&self, req: &ProviderRequest) -> Result<ByteStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(req.user_content.starts_with("Fix"));
            let chunks = vec![Ok(bytes::Bytes::from_static(self.body.as_bytes()))];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    const FINISHED_BODY: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Fixed \"}}]}\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"text\"},\"finish_reason\":\"stop\"}]}\n\
                   data: [DONE]\n";

    fn fake(kind: ProviderKind, calls: &Arc<AtomicUsize>) -> Arc<dyn ChatProvider> {
        fake_with_body(kind, calls, FINISHED_BODY)
    }

    fn fake_with_body(
        kind: ProviderKind,
        calls: &Arc<AtomicUsize>,
        body: &'static str,
    ) -> Arc<dyn ChatProvider> {
        Arc::new(FakeProvider {
            kind,
            calls: calls.clone(),
            body,
        })
    }

    #[test]
    fn build_rejects_duplicate_provider_kinds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = Harness::builder()
            .register_provider(fake(ProviderKind::OpenAi, &calls))
            .register_provider(fake(ProviderKind::OpenAi, &calls))
            .build();
        assert!(
            matches!(result, Err(AiError::Config(message)) if message.contains("duplicate provider"))
        );
    }

    #[test]
    fn config_credentials_register_adapters() {
        let harness = Harness::builder()
            .config(AiConfig::default().deepseek(OpenAiCompatibleConfig::deepseek("ds")))
            .build()
            .expect("harness");
        harness.set_current_model("deepseek-v3").expect("select");
        let (model, provider) = harness.resolve().expect("resolve");
        assert_eq!(model.id, "deepseek-v3");
        assert_eq!(provider.kind(), ProviderKind::DeepSeek);
    }

    #[tokio::test]
    async fn complete_streams_from_selected_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let harness = Harness::builder()
            .register_provider(fake(ProviderKind::OpenAi, &calls))
            .build()
            .expect("harness");
        harness.set_current_model("gpt-4o").expect("select");
        let text = harness
            .complete(ChatRequest::new("Fix this:").selected_text("teh"))
            .await
            .expect("complete");
        assert_eq!(text, "Fixed text");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn complete_rejects_body_without_finish_marker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let harness = Harness::builder()
            .register_provider(fake_with_body(
                ProviderKind::OpenAi,
                &calls,
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hal\"},\"finish_reason\":null}]}\n",
            ))
            .build()
            .expect("harness");
        harness.set_current_model("gpt-4o").expect("select");
        let err = harness
            .complete(ChatRequest::new("Fix this:").selected_text("teh"))
            .await
            .unwrap_err();
        assert_eq!(err, AiError::Truncated { deltas: 1 });
    }

    #[tokio::test]
    async fn unsupported_provider_fails_before_any_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let harness = Harness::builder()
            .register_provider(fake(ProviderKind::OpenAi, &calls))
            .build()
            .expect("harness");
        let mut collector = TextCollector::new();
        let err = harness
            .stream_chat(ChatRequest::new("Fix this:"), &mut collector)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AiError::Unsupported {
                provider: ProviderKind::Anthropic,
                model: "claude-3.7-sonnet".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(collector.stop_reason(), None);
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let harness = Harness::builder().build().expect("harness");
        harness.set_current_model("gpt-4.1").expect("select");
        assert!(matches!(harness.resolve(), Err(AiError::Config(m)) if m.contains("openai")));
    }

    #[test]
    fn dangling_selection_is_a_config_error() {
        let store = Arc::new(MemorySettingsStore::new());
        store
            .set(crate::settings::CURRENT_MODEL_KEY, "removed-model")
            .expect("seed");
        let harness = Harness::builder().settings(store).build().expect("harness");
        assert!(matches!(harness.resolve(), Err(AiError::Config(_))));
    }

    #[test]
    fn custom_models_are_unsupported() {
        let harness = Harness::builder().build().expect("harness");
        harness
            .add_custom_model(NewModel {
                id: "mine".into(),
                name: "Mine".into(),
                ..Default::default()
            })
            .expect("add");
        harness.set_current_model("mine").expect("select");
        assert!(matches!(
            harness.resolve(),
            Err(AiError::Unsupported {
                provider: ProviderKind::Custom,
                ..
            })
        ));
    }
}
