use std::fmt;

/// Model vendor a catalog entry is served by.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
    Wenxin,
    Spark,
    /// User-added model without a dedicated integration.
    Custom,
}

impl ProviderKind {
    /// Returns the stable lowercase tag used in persisted settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::DeepSeek => "deepseek",
            Self::Wenxin => "wenxin",
            Self::Spark => "spark",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable model entry.
///
/// Serialized as `{id, name, provider, isNew?, icon?}` so the persisted custom
/// model list stays readable by other front ends.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiModel {
    /// Unique model identifier, also sent to the provider as the model name.
    pub id: String,
    /// Display name.
    pub name: String,
    pub provider: ProviderKind,
    /// Shows a "new" badge in model pickers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl AiModel {
    /// Creates a model entry without badge or icon.
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider,
            is_new: None,
            icon: None,
        }
    }

    /// Marks the model as new.
    pub fn new_badge(mut self) -> Self {
        self.is_new = Some(true);
        self
    }

    /// Sets the icon identifier.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Input for adding a custom model; the provider is always `custom`.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_new: Option<bool>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl From<NewModel> for AiModel {
    fn from(value: NewModel) -> Self {
        Self {
            id: value.id,
            name: value.name,
            provider: ProviderKind::Custom,
            is_new: value.is_new,
            icon: value.icon,
        }
    }
}

/// Model selected when nothing has been persisted yet.
pub const DEFAULT_MODEL_ID: &str = "claude-3.7-sonnet";

/// Models shipped with the editor. The first entry is the fallback selection
/// after the current custom model is removed.
pub fn built_in_models() -> Vec<AiModel> {
    vec![
        AiModel::new("claude-3.5-sonnet", "Claude-3.5-Sonnet", ProviderKind::Anthropic)
            .icon("anthropic-icon"),
        AiModel::new("claude-3.7-sonnet", "Claude-3.7-Sonnet", ProviderKind::Anthropic)
            .icon("anthropic-icon"),
        AiModel::new("gemini-2.5-pro", "Gemini-2.5-Pro", ProviderKind::Google)
            .new_badge()
            .icon("gemini-icon"),
        AiModel::new("gpt-4.1", "GPT-4.1", ProviderKind::OpenAi)
            .new_badge()
            .icon("openai-icon"),
        AiModel::new("gpt-4o", "GPT-4o", ProviderKind::OpenAi).icon("openai-icon"),
        AiModel::new("deepseek-v3-0324", "DeepSeek-V3-0324", ProviderKind::DeepSeek)
            .icon("deepseek-icon"),
        AiModel::new("deepseek-v3", "DeepSeek-V3", ProviderKind::DeepSeek).icon("deepseek-icon"),
        AiModel::new(
            "deepseek-reasoner-r1",
            "DeepSeek-Reasoner (R1)",
            ProviderKind::DeepSeek,
        )
        .icon("deepseek-icon"),
    ]
}
