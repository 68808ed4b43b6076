use crate::error::ProviderError;
use crate::error::provider_error::UnknownProviderSnafu;
use crate::provider::Provider;
use snafu::OptionExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::debug;

/// Thread-safe registry of available provider adapters, keyed by
/// [`Provider::name`].
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, "registering provider");
        let mut providers = self.providers.write().expect("provider registry lock poisoned");
        providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        let providers = self.providers.read().expect("provider registry lock poisoned");
        providers.get(name).cloned().context(UnknownProviderSnafu { name })
    }

    pub fn list(&self) -> Vec<String> {
        let providers = self.providers.read().expect("provider registry lock poisoned");
        providers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError as Err;
    use crate::provider::ProviderEventStream;
    use crate::request::ProviderRequest;
    use async_trait::async_trait;

    struct StubProvider(&'static str);

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.0
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, Err> {
            unimplemented!("stub")
        }
    }

    #[test]
    fn register_and_get_round_trips() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider("openai")));
        assert!(registry.get("openai").is_ok());
        assert_eq!(registry.list(), vec!["openai".to_string()]);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("nope").is_err());
    }
}
