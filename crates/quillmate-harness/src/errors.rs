use std::time::Duration;

use crate::model::ProviderKind;

/// Errors returned by a provider adapter while opening or reading a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider answered with an application-level failure (HTTP status, auth, etc.).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or body I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderKind,
        message: String,
    },
    /// Response shape was not something the adapter can consume.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderKind,
        message: String,
    },
}

impl ProviderError {
    /// Creates a provider-level error.
    pub fn provider(
        provider: ProviderKind,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Transport {
            provider,
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider,
            message: message.into(),
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_kind(&self) -> ProviderKind {
        match self {
            Self::Provider { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Protocol { provider, .. } => *provider,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message, .. }
            | Self::Protocol { message, .. } => message,
        }
    }

    /// HTTP status code when the provider rejected the request.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Failure reading or writing persisted settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(String),
    #[error("settings file is not valid JSON: {0}")]
    Format(String),
}

/// Validation failures from model catalog mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("model with id {0} already exists")]
    DuplicateModel(String),
    #[error("custom model {0} not found")]
    NotFound(String),
    #[error("unknown model id: {0}")]
    UnknownModel(String),
    #[error("invalid model: {0}")]
    Invalid(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Top-level error type for the public harness API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    /// Missing model selection or provider credentials; raised before any network I/O.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
    /// The selected model belongs to a provider without an adapter.
    #[error("provider {provider} is not supported (model {model})")]
    Unsupported { provider: ProviderKind, model: String },
    /// Request or stream failure reported by the provider adapter.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The body ended before a finish marker; the text received is partial.
    #[error("response ended without a finish marker after {deltas} deltas")]
    Truncated { deltas: u64 },
    /// The call was cancelled through its abort handle.
    #[error("cancelled")]
    Cancelled,
    /// The call exceeded its configured timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

impl From<SettingsError> for AiError {
    fn from(value: SettingsError) -> Self {
        AiError::Catalog(CatalogError::Settings(value))
    }
}
