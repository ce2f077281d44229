//! Tenant email configuration lookup

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use courier_core::{DeliveryError, TenantEmailConfig};

/// Source of per-tenant email configuration.
///
/// The orchestrator treats lookup failures as soft: a tenant whose
/// configuration cannot be loaded degrades to the SMTP default instead of
/// losing the send.
#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    async fn email_config(&self, tenant_id: &str) -> Result<TenantEmailConfig, DeliveryError>;
}

/// In-memory store, seeded up front. Used in tests and by embedders that
/// manage configuration elsewhere.
#[derive(Default)]
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<String, TenantEmailConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, tenant_id: &str, config: TenantEmailConfig) {
        self.configs
            .write()
            .await
            .insert(tenant_id.to_string(), config);
    }
}

#[async_trait]
impl TenantConfigStore for InMemoryConfigStore {
    async fn email_config(&self, tenant_id: &str) -> Result<TenantEmailConfig, DeliveryError> {
        let configs = self.configs.read().await;

        match configs.get(tenant_id) {
            Some(config) => Ok(config.clone()),
            None => {
                debug!(tenant_id, "no email configuration for tenant");
                Err(DeliveryError::Configuration(format!(
                    "no email configuration for tenant '{tenant_id}'"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::ProviderKind;

    #[tokio::test]
    async fn test_lookup_roundtrip() {
        let store = InMemoryConfigStore::new();

        let config = TenantEmailConfig {
            provider: ProviderKind::Api,
            ..Default::default()
        };
        store.insert("tenant-1", config).await;

        let found = store.email_config("tenant-1").await.unwrap();
        assert_eq!(found.provider, ProviderKind::Api);
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_a_configuration_error() {
        let store = InMemoryConfigStore::new();

        assert!(matches!(
            store.email_config("nobody").await,
            Err(DeliveryError::Configuration(_))
        ));
    }
}
