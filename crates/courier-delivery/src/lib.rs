//! Delivery orchestration for the Courier email subsystem
//!
//! Ties together the tenant configuration store, the credential vault, and
//! the provider clients: retry on the primary provider with linear backoff,
//! one fallback attempt on the SMTP relay, and an audit trail for every use
//! of a decrypted credential.

pub mod audit;
pub mod config;
pub mod orchestrator;

pub use audit::{audit_line, AuditLog};
pub use config::{InMemoryConfigStore, TenantConfigStore};
pub use orchestrator::{ClientFactory, DeliveryService, ProviderClientFactory, RetryPolicy};

use courier_core::{CredentialVault, DeliveryError};
use courier_providers::{BrevoClient, ProviderClient, TemplateSummary};

/// Probes an already decrypted API key with a minimal read, without sending.
///
/// Callers holding only a stored (encrypted) key should go through
/// [`DeliveryService::validate_api_credentials`] instead.
pub async fn validate_provider_credentials(api_key: &str) -> Result<bool, DeliveryError> {
    AuditLog::new().record(
        "api key validated",
        None,
        &CredentialVault::audit_hash(api_key),
    );

    BrevoClient::new(api_key)?.validate_credentials().await
}

/// Lists the active templates visible to an already decrypted API key.
pub async fn list_provider_templates(
    api_key: &str,
) -> Result<Vec<TemplateSummary>, DeliveryError> {
    AuditLog::new().record(
        "api key used for template listing",
        None,
        &CredentialVault::audit_hash(api_key),
    );

    BrevoClient::new(api_key)?.list_templates().await
}
