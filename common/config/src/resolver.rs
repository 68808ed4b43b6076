//! Resolves a loaded [`AppConfig`] into the concrete values other crates
//! consume, failing fast on structural problems a malformed file can't
//! surface until something tries to use it.

use crate::error::ConfigError;
use crate::error::config_error::DuplicateProviderSnafu;
use crate::error::config_error::NoProvidersSnafu;
use crate::error::config_error::UnknownModelSnafu;
use crate::types::AppConfig;
use crate::types::ModelConfig;
use crate::types::ProviderConfig;
use snafu::ensure;
use std::collections::HashSet;

/// The provider/model pair a fresh run should use absent any thread-level
/// override (§10.3).
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub provider: ProviderConfig,
    pub model: ModelConfig,
}

pub fn resolve_default_model(config: &AppConfig) -> Result<ResolvedModel, ConfigError> {
    ensure!(!config.providers.is_empty(), NoProvidersSnafu);

    let mut seen = HashSet::new();
    for provider in &config.providers {
        ensure!(
            seen.insert(provider.id.clone()),
            DuplicateProviderSnafu {
                provider_id: provider.id.clone(),
            }
        );
    }

    let wanted_model_id = config.current_model_id.as_deref();
    for provider in &config.providers {
        for model in &provider.models {
            let matches = match wanted_model_id {
                Some(id) => id == model.id,
                None => true,
            };
            if matches {
                return Ok(ResolvedModel {
                    provider: provider.clone(),
                    model: model.clone(),
                });
            }
        }
    }

    if let Some(model_id) = wanted_model_id {
        return UnknownModelSnafu {
            provider_id: config.providers[0].id.clone(),
            model_id: model_id.to_string(),
        }
        .fail();
    }

    UnknownModelSnafu {
        provider_id: config.providers[0].id.clone(),
        model_id: "<none configured>".to_string(),
    }
    .fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderType;

    fn provider_with_model(id: &str, model_id: &str) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            provider_type: ProviderType::Openai,
            base_url: None,
            api_key_env: None,
            models: vec![ModelConfig {
                id: model_id.to_string(),
                display_name: model_id.to_string(),
                context_window: Some(128_000),
                supports_tools: true,
            }],
        }
    }

    #[test]
    fn no_providers_is_an_error() {
        let config = AppConfig::default();
        assert!(resolve_default_model(&config).is_err());
    }

    #[test]
    fn picks_first_model_when_no_preference() {
        let mut config = AppConfig::default();
        config.providers.push(provider_with_model("openai", "gpt-test"));
        let resolved = resolve_default_model(&config).unwrap();
        assert_eq!(resolved.model.id, "gpt-test");
    }

    #[test]
    fn honors_current_model_id() {
        let mut config = AppConfig::default();
        config.providers.push(provider_with_model("openai", "gpt-test"));
        config.providers.push(provider_with_model("anthropic", "claude-test"));
        config.current_model_id = Some("claude-test".to_string());
        let resolved = resolve_default_model(&config).unwrap();
        assert_eq!(resolved.provider.id, "anthropic");
    }

    #[test]
    fn unknown_model_id_is_an_error() {
        let mut config = AppConfig::default();
        config.providers.push(provider_with_model("openai", "gpt-test"));
        config.current_model_id = Some("missing-model".to_string());
        assert!(resolve_default_model(&config).is_err());
    }

    #[test]
    fn duplicate_provider_ids_are_rejected() {
        let mut config = AppConfig::default();
        config.providers.push(provider_with_model("openai", "gpt-test"));
        config.providers.push(provider_with_model("openai", "gpt-other"));
        assert!(resolve_default_model(&config).is_err());
    }
}
