//! Known models plus the current selection, persisted through a
//! [`SettingsStore`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::CatalogError;
use crate::model::{AiModel, DEFAULT_MODEL_ID, NewModel, built_in_models};
use crate::settings::{CURRENT_MODEL_KEY, CUSTOM_MODELS_KEY, SettingsStore};

/// Model list and selection state owned by the application root.
pub struct ModelCatalog {
    built_in: Vec<AiModel>,
    custom: Vec<AiModel>,
    current_model_id: Option<String>,
    store: Arc<dyn SettingsStore>,
}

impl ModelCatalog {
    /// Loads custom models and the current selection from `store`.
    ///
    /// A stored custom list that cannot be read is logged and treated as
    /// empty; the selection falls back to [`DEFAULT_MODEL_ID`].
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let custom = match store.get(CUSTOM_MODELS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<AiModel>>(&raw).unwrap_or_else(|e| {
                error!(error = %e, "failed to parse stored custom models");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to load custom models");
                Vec::new()
            }
        };
        let current_model_id = match store.get(CURRENT_MODEL_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => Some(id),
            Ok(_) => Some(DEFAULT_MODEL_ID.to_string()),
            Err(e) => {
                error!(error = %e, "failed to load current model id");
                Some(DEFAULT_MODEL_ID.to_string())
            }
        };
        Self {
            built_in: built_in_models(),
            custom,
            current_model_id,
            store,
        }
    }

    /// Built-in models followed by custom models.
    pub fn all_models(&self) -> Vec<AiModel> {
        self.built_in.iter().chain(&self.custom).cloned().collect()
    }

    pub fn custom_models(&self) -> &[AiModel] {
        &self.custom
    }

    pub fn find(&self, id: &str) -> Option<&AiModel> {
        self.built_in.iter().chain(&self.custom).find(|m| m.id == id)
    }

    pub fn current_model_id(&self) -> Option<&str> {
        self.current_model_id.as_deref()
    }

    /// The selected model, if the selected id still names a known model.
    pub fn current_model(&self) -> Option<&AiModel> {
        self.current_model_id.as_deref().and_then(|id| self.find(id))
    }

    /// Selects `id` and persists the choice. Unknown ids leave the selection
    /// unchanged.
    pub fn set_current_model(&mut self, id: &str) -> Result<(), CatalogError> {
        if self.find(id).is_none() {
            warn!(model = id, "attempted to select unknown model");
            return Err(CatalogError::UnknownModel(id.to_string()));
        }
        self.store.set(CURRENT_MODEL_KEY, id)?;
        self.current_model_id = Some(id.to_string());
        info!(model = id, "current model changed");
        Ok(())
    }

    /// Adds a user model with provider `custom`.
    ///
    /// Ids must be unique across built-in and custom models. Nothing is
    /// mutated when validation or persistence fails.
    pub fn add_custom_model(&mut self, model: NewModel) -> Result<(), CatalogError> {
        if model.id.trim().is_empty() {
            return Err(CatalogError::Invalid("model id must not be empty".into()));
        }
        if model.name.trim().is_empty() {
            return Err(CatalogError::Invalid("model name must not be empty".into()));
        }
        if self.find(&model.id).is_some() {
            error!(model = %model.id, "duplicate model id");
            return Err(CatalogError::DuplicateModel(model.id));
        }
        let model = AiModel::from(model);
        let name = model.name.clone();
        self.custom.push(model);
        if let Err(e) = self.save_custom_models() {
            self.custom.pop();
            return Err(e);
        }
        info!(model = %name, "custom model added");
        Ok(())
    }

    /// Removes a custom model. Removing the selected model resets the
    /// selection to the first built-in model. A failed write leaves both the
    /// list and the selection as they were.
    pub fn remove_custom_model(&mut self, id: &str) -> Result<(), CatalogError> {
        let Some(index) = self.custom.iter().position(|m| m.id == id) else {
            warn!(model = id, "custom model not found for removal");
            return Err(CatalogError::NotFound(id.to_string()));
        };
        let reset = if self.current_model_id.as_deref() == Some(id) {
            let fallback = self.built_in.first().map(|m| m.id.clone());
            if let Some(fallback) = &fallback {
                self.store.set(CURRENT_MODEL_KEY, fallback)?;
            }
            Some(fallback)
        } else {
            None
        };

        let removed = self.custom.remove(index);
        if let Err(e) = self.save_custom_models() {
            self.custom.insert(index, removed);
            if let Some(Some(_)) = reset
                && let Err(restore) = self.store.set(CURRENT_MODEL_KEY, id)
            {
                error!(model = id, error = %restore, "failed to restore current model id");
            }
            return Err(e);
        }
        if let Some(fallback) = reset {
            info!(model = ?fallback, "current model reset");
            self.current_model_id = fallback;
        }
        info!(model = id, "custom model removed");
        Ok(())
    }

    fn save_custom_models(&self) -> Result<(), CatalogError> {
        let raw = serde_json::to_string(&self.custom)
            .map_err(|e| CatalogError::Invalid(format!("failed to serialize custom models: {e}")))?;
        self.store.set(CUSTOM_MODELS_KEY, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use crate::model::ProviderKind;
    use crate::settings::MemorySettingsStore;
    use std::sync::Mutex;

    fn catalog() -> (ModelCatalog, Arc<MemorySettingsStore>) {
        let store = Arc::new(MemorySettingsStore::new());
        (ModelCatalog::load(store.clone()), store)
    }

    fn new_model(id: &str) -> NewModel {
        NewModel {
            id: id.into(),
            name: format!("My {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_to_claude_selection() {
        let (catalog, _) = catalog();
        assert_eq!(catalog.current_model_id(), Some(DEFAULT_MODEL_ID));
        assert_eq!(
            catalog.current_model().map(|m| m.provider),
            Some(ProviderKind::Anthropic)
        );
    }

    #[test]
    fn duplicate_of_built_in_id_is_rejected_without_touching_store() {
        let (mut catalog, store) = catalog();
        let err = catalog.add_custom_model(new_model("gpt-4o")).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateModel("gpt-4o".into()));
        assert!(catalog.custom_models().is_empty());
        assert_eq!(store.get(CUSTOM_MODELS_KEY).unwrap(), None);
    }

    #[test]
    fn added_model_is_custom_and_persisted() {
        let (mut catalog, store) = catalog();
        catalog.add_custom_model(new_model("local-llama")).unwrap();
        let model = catalog.find("local-llama").expect("added");
        assert_eq!(model.provider, ProviderKind::Custom);

        let reloaded = ModelCatalog::load(store);
        assert_eq!(reloaded.custom_models().len(), 1);
        assert_eq!(reloaded.all_models().last().map(|m| m.id.as_str()), Some("local-llama"));
    }

    #[test]
    fn removing_current_custom_model_resets_to_first_built_in() {
        let (mut catalog, store) = catalog();
        catalog.add_custom_model(new_model("mine")).unwrap();
        catalog.set_current_model("mine").unwrap();
        catalog.remove_custom_model("mine").unwrap();
        assert_eq!(catalog.current_model_id(), Some("claude-3.5-sonnet"));
        assert_eq!(
            store.get(CURRENT_MODEL_KEY).unwrap().as_deref(),
            Some("claude-3.5-sonnet")
        );
    }

    #[test]
    fn remove_missing_model_reports_not_found() {
        let (mut catalog, _) = catalog();
        assert_eq!(
            catalog.remove_custom_model("gpt-4o"),
            Err(CatalogError::NotFound("gpt-4o".into()))
        );
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let (mut catalog, store) = catalog();
        assert!(matches!(
            catalog.set_current_model("nope"),
            Err(CatalogError::UnknownModel(_))
        ));
        assert_eq!(catalog.current_model_id(), Some(DEFAULT_MODEL_ID));
        assert_eq!(store.get(CURRENT_MODEL_KEY).unwrap(), None);
    }

    #[test]
    fn malformed_stored_list_loads_as_empty() {
        let store = Arc::new(MemorySettingsStore::new());
        store.set(CUSTOM_MODELS_KEY, "[{broken").unwrap();
        store.set(CURRENT_MODEL_KEY, "gpt-4o").unwrap();
        let catalog = ModelCatalog::load(store);
        assert!(catalog.custom_models().is_empty());
        assert_eq!(catalog.current_model_id(), Some("gpt-4o"));
    }

    struct FailingStore;

    impl SettingsStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, SettingsError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), SettingsError> {
            Err(SettingsError::Io("disk full".into()))
        }
    }

    /// Memory store that rejects writes to one key once armed.
    struct FailKeyStore {
        inner: MemorySettingsStore,
        fail_key: Mutex<Option<&'static str>>,
    }

    impl SettingsStore for FailKeyStore {
        fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
            if self.fail_key.lock().unwrap().is_some_and(|k| k == key) {
                return Err(SettingsError::Io("disk full".into()));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_list_write_keeps_model_and_selection() {
        let store = Arc::new(FailKeyStore {
            inner: MemorySettingsStore::new(),
            fail_key: Mutex::new(None),
        });
        let mut catalog = ModelCatalog::load(store.clone());
        catalog.add_custom_model(new_model("mine")).unwrap();
        catalog.set_current_model("mine").unwrap();

        *store.fail_key.lock().unwrap() = Some(CUSTOM_MODELS_KEY);
        let err = catalog.remove_custom_model("mine").unwrap_err();
        assert!(matches!(err, CatalogError::Settings(_)));
        assert!(catalog.find("mine").is_some());
        assert_eq!(catalog.current_model_id(), Some("mine"));
        assert_eq!(store.get(CURRENT_MODEL_KEY).unwrap().as_deref(), Some("mine"));
    }

    #[test]
    fn failed_selection_reset_keeps_model() {
        let store = Arc::new(FailKeyStore {
            inner: MemorySettingsStore::new(),
            fail_key: Mutex::new(None),
        });
        let mut catalog = ModelCatalog::load(store.clone());
        catalog.add_custom_model(new_model("mine")).unwrap();
        catalog.set_current_model("mine").unwrap();

        *store.fail_key.lock().unwrap() = Some(CURRENT_MODEL_KEY);
        assert!(catalog.remove_custom_model("mine").is_err());
        assert_eq!(catalog.custom_models().len(), 1);
        assert_eq!(catalog.current_model_id(), Some("mine"));
        let reloaded = ModelCatalog::load(store);
        assert!(reloaded.find("mine").is_some());
    }

    #[test]
    fn failed_persist_rolls_back_add() {
        let mut catalog = ModelCatalog::load(Arc::new(FailingStore));
        let err = catalog.add_custom_model(new_model("mine")).unwrap_err();
        assert!(matches!(err, CatalogError::Settings(_)));
        assert!(catalog.find("mine").is_none());
    }
}
