//! Concrete [`Provider`](runloop_provider_api::Provider) implementations,
//! one per vendor wire protocol, plus a helper to build a populated
//! [`ProviderRegistry`](runloop_provider_api::ProviderRegistry) from
//! `runloop-config`'s `ProviderConfig` list.

pub mod error;
mod anthropic;
mod moonshot;
mod openai_compat;
mod sse;

pub use anthropic::AnthropicProvider;
pub use error::AdapterError;
pub use moonshot::MOONSHOT_BASE_URL;
pub use moonshot::moonshot_provider;
pub use openai_compat::OpenAiCompatProvider;

use runloop_config::ProviderConfig;
use runloop_config::ProviderType;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderRegistry;
use snafu::ensure;
use std::sync::Arc;

/// Build a registry with one adapter per configured provider, resolving
/// each provider's API key from the environment variable it names.
pub fn build_registry(providers: &[ProviderConfig]) -> Result<ProviderRegistry, AdapterError> {
    let registry = ProviderRegistry::new();
    for provider_config in providers {
        let api_key = resolve_api_key(provider_config)?;
        let adapter: Arc<dyn Provider> = match provider_config.provider_type {
            ProviderType::Openai => Arc::new(OpenAiCompatProvider::new(
                provider_config.id.clone(),
                provider_config.base_url.clone().unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key,
            )),
            ProviderType::OpenaiCompatible => Arc::new(OpenAiCompatProvider::new(
                provider_config.id.clone(),
                provider_config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key,
            )),
            ProviderType::Anthropic => Arc::new(match &provider_config.base_url {
                Some(base_url) => AnthropicProvider::with_base_url(base_url.clone(), api_key),
                None => AnthropicProvider::new(api_key),
            }),
            ProviderType::Moonshot => Arc::new(moonshot_provider(api_key)),
        };
        registry.register(adapter);
    }
    Ok(registry)
}

fn resolve_api_key(provider_config: &ProviderConfig) -> Result<String, AdapterError> {
    let env_var = provider_config
        .api_key_env
        .clone()
        .unwrap_or_else(|| format!("{}_API_KEY", provider_config.id.to_uppercase()));
    let api_key = std::env::var(&env_var).unwrap_or_default();
    ensure!(
        !api_key.is_empty(),
        error::adapter_error::MissingApiKeySnafu {
            provider: provider_config.id.clone(),
            env_var,
        }
    );
    Ok(api_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_config::ModelConfig;

    fn provider_config() -> ProviderConfig {
        ProviderConfig {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            provider_type: ProviderType::Openai,
            base_url: None,
            api_key_env: Some("RUNLOOP_TEST_OPENAI_KEY".to_string()),
            models: vec![ModelConfig {
                id: "gpt-test".to_string(),
                display_name: "GPT Test".to_string(),
                context_window: None,
                supports_tools: true,
            }],
        }
    }

    #[test]
    fn missing_api_key_is_an_error() {
        unsafe {
            std::env::remove_var("RUNLOOP_TEST_OPENAI_KEY");
        }
        let result = build_registry(&[provider_config()]);
        assert!(result.is_err());
    }

    #[test]
    fn registers_one_adapter_per_provider() {
        unsafe {
            std::env::set_var("RUNLOOP_TEST_OPENAI_KEY", "sk-test");
        }
        let registry = build_registry(&[provider_config()]).unwrap();
        assert_eq!(registry.list(), vec!["openai".to_string()]);
        unsafe {
            std::env::remove_var("RUNLOOP_TEST_OPENAI_KEY");
        }
    }
}
