//! Delivery orchestration: retry, fallback, and credential handling

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use courier_core::{
    validate_email, CredentialVault, DeliveryError, DeliveryResult, EmailMessage, ProviderKind,
    SmtpProviderConfig, TenantEmailConfig,
};
use courier_providers::{
    BrevoClient, ProviderClient, SendOptions, SendOutcome, SmtpClient, TemplateSummary,
    API_KEY_PREFIX,
};

use crate::audit::AuditLog;
use crate::config::TenantConfigStore;

/// Builds provider clients from per-call credentials. The seam exists so
/// tests can substitute scripted clients for the real transports.
pub trait ClientFactory: Send + Sync {
    fn api_client(&self, api_key: &str) -> Result<Arc<dyn ProviderClient>, DeliveryError>;
    fn smtp_client(
        &self,
        config: &SmtpProviderConfig,
    ) -> Result<Arc<dyn ProviderClient>, DeliveryError>;
}

/// Production factory backed by the real HTTP and SMTP clients.
#[derive(Debug, Clone, Default)]
pub struct ProviderClientFactory;

impl ClientFactory for ProviderClientFactory {
    fn api_client(&self, api_key: &str) -> Result<Arc<dyn ProviderClient>, DeliveryError> {
        Ok(Arc::new(BrevoClient::new(api_key)?))
    }

    fn smtp_client(
        &self,
        config: &SmtpProviderConfig,
    ) -> Result<Arc<dyn ProviderClient>, DeliveryError> {
        Ok(Arc::new(SmtpClient::new(config)?))
    }
}

/// Retry behavior for the primary provider. The delay is linear: attempt
/// `n` failing waits `base_delay * n` before attempt `n + 1`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Per-tenant email delivery with retry on the primary provider and a
/// single fallback to the SMTP relay.
pub struct DeliveryService {
    store: Arc<dyn TenantConfigStore>,
    vault: CredentialVault,
    clients: Arc<dyn ClientFactory>,
    audit: AuditLog,
    retry: RetryPolicy,
}

impl DeliveryService {
    pub fn new(
        store: Arc<dyn TenantConfigStore>,
        vault: CredentialVault,
        clients: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            store,
            vault,
            clients,
            audit: AuditLog::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Delivers one message for the tenant named in it.
    ///
    /// The primary provider is attempted up to `max_attempts` times with
    /// linear backoff; errors marked non-retryable end the loop early. When
    /// the primary is the HTTP API and the tenant has SMTP configured, a
    /// single fallback attempt follows. Exhausting both providers returns
    /// [`DeliveryError::BothProvidersFailed`] carrying both causes.
    pub async fn send_email(&self, message: &EmailMessage) -> Result<DeliveryResult, DeliveryError> {
        self.send_email_with_retries(message, self.retry.max_attempts)
            .await
    }

    /// Same as [`DeliveryService::send_email`] with a per-call retry limit
    /// overriding the service policy.
    pub async fn send_email_with_retries(
        &self,
        message: &EmailMessage,
        retries: u32,
    ) -> Result<DeliveryResult, DeliveryError> {
        validate_email(&message.to)?;

        let config = self.tenant_config(&message.tenant_id).await;

        let mut primary_kind = if config.provider == ProviderKind::Api && config.api.enabled {
            ProviderKind::Api
        } else {
            ProviderKind::Smtp
        };
        let mut fallback_available = primary_kind == ProviderKind::Api && config.smtp.enabled;

        let primary_client = match self.primary_client(primary_kind, &config, message) {
            // An API key that no longer decrypts disables that provider for
            // this call; the SMTP relay is promoted to primary.
            Err(err @ DeliveryError::Decryption(_)) if fallback_available => {
                warn!(
                    tenant_id = %message.tenant_id,
                    error = %err,
                    "API credentials unusable, promoting SMTP relay to primary"
                );
                primary_kind = ProviderKind::Smtp;
                fallback_available = false;
                self.clients.smtp_client(&config.smtp)
            }
            other => other,
        };

        let (attempts, primary_error) = match primary_client {
            Ok(client) => {
                match self
                    .send_with_retry(client.as_ref(), &config, message, retries)
                    .await
                {
                    (attempts, Ok(outcome)) => {
                        return Ok(DeliveryResult {
                            success: true,
                            provider: primary_kind,
                            message_id: Some(outcome.message_id),
                            attempts,
                            fallback_used: false,
                            error: None,
                        });
                    }
                    (attempts, Err(err)) => (attempts, err),
                }
            }
            // The primary could not even be constructed, most often a
            // credential that no longer decrypts. Counts as zero attempts.
            Err(err) => {
                warn!(tenant_id = %message.tenant_id, error = %err, "primary provider unusable");
                (0, err)
            }
        };

        if !fallback_available {
            return Err(primary_error);
        }

        info!(
            tenant_id = %message.tenant_id,
            primary_error = %primary_error,
            "primary provider exhausted, falling back to SMTP relay"
        );

        let fallback_result = match self.clients.smtp_client(&config.smtp) {
            Ok(client) => self.dispatch(client.as_ref(), &config, message).await,
            Err(err) => Err(err),
        };

        match fallback_result {
            Ok(outcome) => Ok(DeliveryResult {
                success: true,
                provider: ProviderKind::Smtp,
                message_id: Some(outcome.message_id),
                attempts,
                fallback_used: true,
                error: Some(primary_error.to_string()),
            }),
            Err(fallback_error) => Err(DeliveryError::BothProvidersFailed {
                primary: Box::new(primary_error),
                fallback: Box::new(fallback_error),
            }),
        }
    }

    /// Probes the tenant's configured API credentials without sending.
    pub async fn validate_api_credentials(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
    ) -> Result<bool, DeliveryError> {
        let config = self.store.email_config(tenant_id).await?;
        let api_key = self.decrypt_api_key(&config, tenant_id, user_id, "api key validated")?;

        self.clients.api_client(&api_key)?.validate_credentials().await
    }

    /// Lists the active templates visible to the tenant's API credentials.
    pub async fn list_api_templates(
        &self,
        tenant_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<TemplateSummary>, DeliveryError> {
        let config = self.store.email_config(tenant_id).await?;
        let api_key =
            self.decrypt_api_key(&config, tenant_id, user_id, "api key used for template listing")?;

        self.clients.api_client(&api_key)?.list_templates().await
    }

    /// Loads the tenant's configuration, degrading to the (disabled) default
    /// rather than failing the send when the lookup errors.
    async fn tenant_config(&self, tenant_id: &str) -> TenantEmailConfig {
        match self.store.email_config(tenant_id).await {
            Ok(config) => config,
            Err(err) => {
                warn!(tenant_id, error = %err, "tenant configuration unavailable, using defaults");
                TenantEmailConfig::default()
            }
        }
    }

    fn primary_client(
        &self,
        kind: ProviderKind,
        config: &TenantEmailConfig,
        message: &EmailMessage,
    ) -> Result<Arc<dyn ProviderClient>, DeliveryError> {
        match kind {
            ProviderKind::Api => {
                let api_key = self.decrypt_api_key(
                    config,
                    &message.tenant_id,
                    message.user_id.as_deref(),
                    "api key used for send",
                )?;
                self.clients.api_client(&api_key)
            }
            ProviderKind::Smtp => self.clients.smtp_client(&config.smtp),
        }
    }

    /// Decrypts the stored API key for the duration of one call and records
    /// the use in the audit trail. Only the 8-hex-char fingerprint is logged.
    fn decrypt_api_key(
        &self,
        config: &TenantEmailConfig,
        tenant_id: &str,
        user_id: Option<&str>,
        action: &str,
    ) -> Result<String, DeliveryError> {
        let api_key = self.vault.decrypt(&config.api.api_key, tenant_id)?;

        self.audit
            .record(action, user_id, &CredentialVault::audit_hash(&api_key));

        if !api_key.starts_with(API_KEY_PREFIX) {
            warn!(
                tenant_id,
                "decrypted API key does not have the expected provider prefix"
            );
        }

        Ok(api_key)
    }

    async fn send_with_retry(
        &self,
        client: &dyn ProviderClient,
        config: &TenantEmailConfig,
        message: &EmailMessage,
        max_attempts: u32,
    ) -> (u32, Result<SendOutcome, DeliveryError>) {
        let mut last_error = DeliveryError::ProviderUnavailable("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            match self.dispatch(client, config, message).await {
                Ok(outcome) => return (attempt, Ok(outcome)),
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "delivery attempt failed"
                    );

                    let retryable = err.is_retryable();
                    last_error = err;

                    if !retryable {
                        return (attempt, Err(last_error));
                    }
                    if attempt < max_attempts {
                        sleep(self.retry.base_delay * attempt).await;
                    }
                }
            }
        }

        (max_attempts, Err(last_error))
    }

    async fn dispatch(
        &self,
        client: &dyn ProviderClient,
        config: &TenantEmailConfig,
        message: &EmailMessage,
    ) -> Result<SendOutcome, DeliveryError> {
        let options = self.send_options(client.provider_kind(), config, message);

        if let Some(template_name) = &message.template_name {
            match client.provider_kind() {
                // The API hosts templates under numeric ids; the tenant's
                // mapping translates logical names. A name the mapping does
                // not know falls through to the raw content.
                ProviderKind::Api => {
                    if let Some(template_id) = config.api.templates.get(template_name) {
                        return client
                            .send_template(template_id, &message.to, &message.variables, &options)
                            .await;
                    }
                }
                // The SMTP client resolves names against its local registry
                // and rejects unknown ones itself.
                ProviderKind::Smtp => {
                    return client
                        .send_template(template_name, &message.to, &message.variables, &options)
                        .await;
                }
            }
        }

        client
            .send_raw(
                &message.to,
                &message.subject,
                &message.html,
                message.text.as_deref(),
                &options,
            )
            .await
    }

    fn send_options(
        &self,
        kind: ProviderKind,
        config: &TenantEmailConfig,
        message: &EmailMessage,
    ) -> SendOptions {
        let mut options = SendOptions {
            attachments: message.attachments.clone(),
            ..Default::default()
        };

        // The SMTP client carries its own sender configuration; the API
        // client needs the tenant's sender identity on every call.
        if kind == ProviderKind::Api && !config.api.from_email.is_empty() {
            options.from = Some(config.api.from_email.clone());
            options.from_name = config.api.from_name.clone();
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use courier_core::ApiProviderConfig;
    use courier_providers::MockClient;

    use crate::config::InMemoryConfigStore;

    /// Factory returning pre-built scripted clients.
    struct FixedFactory {
        api: MockClient,
        smtp: MockClient,
    }

    impl ClientFactory for FixedFactory {
        fn api_client(&self, _api_key: &str) -> Result<Arc<dyn ProviderClient>, DeliveryError> {
            Ok(Arc::new(self.api.clone()))
        }

        fn smtp_client(
            &self,
            _config: &SmtpProviderConfig,
        ) -> Result<Arc<dyn ProviderClient>, DeliveryError> {
            Ok(Arc::new(self.smtp.clone()))
        }
    }

    const APP_SECRET: &str = "test-application-secret";
    const TENANT: &str = "tenant-a";

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    async fn store_with_api_config() -> Arc<InMemoryConfigStore> {
        let vault = CredentialVault::new(APP_SECRET);
        let store = InMemoryConfigStore::new();

        let config = TenantEmailConfig {
            provider: ProviderKind::Api,
            api: ApiProviderConfig {
                enabled: true,
                api_key: vault.encrypt("xkeysib-test-key", TENANT).unwrap(),
                from_email: "booking@example.com".to_string(),
                from_name: Some("Bookings".to_string()),
                templates: HashMap::from([("contract".to_string(), "42".to_string())]),
            },
            smtp: SmtpProviderConfig {
                enabled: true,
                host: "smtp.example.com".to_string(),
                user: "mailer".to_string(),
                pass: "hunter2".to_string(),
                from: "noreply@example.com".to_string(),
                ..Default::default()
            },
        };
        store.insert(TENANT, config).await;

        Arc::new(store)
    }

    fn service(store: Arc<InMemoryConfigStore>, factory: FixedFactory) -> DeliveryService {
        DeliveryService::new(store, CredentialVault::new(APP_SECRET), Arc::new(factory))
            .with_retry_policy(fast_retry())
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "contact@example.com".to_string(),
            subject: "Your contract".to_string(),
            html: "<p>Hello</p>".to_string(),
            text: None,
            template_name: None,
            variables: HashMap::new(),
            attachments: Vec::new(),
            tenant_id: TENANT.to_string(),
            user_id: Some("user-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(store_with_api_config().await, factory);

        let result = service.send_email(&message()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.provider, ProviderKind::Api);
        assert_eq!(result.attempts, 1);
        assert!(!result.fallback_used);
        assert!(result.error.is_none());
        assert_eq!(api.send_call_count(), 1);
        assert_eq!(smtp.send_call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_retried_until_success() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api).failing_first(2),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let service = service(store_with_api_config().await, factory);

        let result = service.send_email(&message()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.attempts, 3);
        assert!(!result.fallback_used);
        assert_eq!(api.send_call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_primary_falls_back_to_smtp() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api).always_failing(),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(store_with_api_config().await, factory);

        let result = service.send_email(&message()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.provider, ProviderKind::Smtp);
        assert_eq!(result.attempts, 3);
        assert!(result.fallback_used);
        // The primary failure is reported alongside the successful fallback.
        assert!(result.error.is_some());
        assert_eq!(api.send_call_count(), 3);
        assert_eq!(smtp.send_call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_skips_remaining_attempts() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api)
                .always_failing()
                .with_failure(DeliveryError::InvalidCredentials),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(store_with_api_config().await, factory);

        let result = service.send_email(&message()).await.unwrap();

        // One primary attempt, no retries on a credential rejection, then
        // the fallback still runs.
        assert_eq!(result.attempts, 1);
        assert!(result.fallback_used);
        assert_eq!(api.send_call_count(), 1);
        assert_eq!(smtp.send_call_count(), 1);
    }

    #[tokio::test]
    async fn test_both_providers_failing_reports_both_causes() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api).always_failing(),
            smtp: MockClient::new(ProviderKind::Smtp)
                .always_failing()
                .with_failure(DeliveryError::ProviderUnavailable("relay refused".into())),
        };
        let service = service(store_with_api_config().await, factory);

        let err = service.send_email(&message()).await.unwrap_err();

        match err {
            DeliveryError::BothProvidersFailed { primary, fallback } => {
                assert!(matches!(*primary, DeliveryError::ProviderUnavailable(_)));
                assert!(fallback.to_string().contains("relay refused"));
            }
            other => panic!("expected BothProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_smtp_primary_has_no_fallback() {
        let vault = CredentialVault::new(APP_SECRET);
        let store = InMemoryConfigStore::new();
        store
            .insert(
                TENANT,
                TenantEmailConfig {
                    provider: ProviderKind::Smtp,
                    api: ApiProviderConfig {
                        enabled: true,
                        api_key: vault.encrypt("xkeysib-test-key", TENANT).unwrap(),
                        ..Default::default()
                    },
                    smtp: SmtpProviderConfig {
                        enabled: true,
                        host: "smtp.example.com".to_string(),
                        user: "mailer".to_string(),
                        pass: "hunter2".to_string(),
                        from: "noreply@example.com".to_string(),
                        ..Default::default()
                    },
                },
            )
            .await;

        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp).always_failing(),
        };
        let api = factory.api.clone();
        let service = service(Arc::new(store), factory);

        let err = service.send_email(&message()).await.unwrap_err();

        assert!(matches!(err, DeliveryError::ProviderUnavailable(_)));
        assert_eq!(api.send_call_count(), 0);
    }

    #[tokio::test]
    async fn test_undecryptable_key_promotes_smtp_to_primary() {
        let store = InMemoryConfigStore::new();
        store
            .insert(
                TENANT,
                TenantEmailConfig {
                    provider: ProviderKind::Api,
                    api: ApiProviderConfig {
                        enabled: true,
                        // Encrypted under a different tenant's key.
                        api_key: CredentialVault::new(APP_SECRET)
                            .encrypt("xkeysib-test-key", "other-tenant")
                            .unwrap(),
                        ..Default::default()
                    },
                    smtp: SmtpProviderConfig {
                        enabled: true,
                        host: "smtp.example.com".to_string(),
                        user: "mailer".to_string(),
                        pass: "hunter2".to_string(),
                        from: "noreply@example.com".to_string(),
                        ..Default::default()
                    },
                },
            )
            .await;

        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(Arc::new(store), factory);

        let result = service.send_email(&message()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.provider, ProviderKind::Smtp);
        // The relay is primary for this call, not a fallback.
        assert!(!result.fallback_used);
        assert_eq!(result.attempts, 1);
        assert_eq!(api.send_call_count(), 0);
        assert_eq!(smtp.send_call_count(), 1);
    }

    #[tokio::test]
    async fn test_template_name_mapped_for_api_provider() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let service = service(store_with_api_config().await, factory);

        let mut msg = message();
        msg.template_name = Some("contract".to_string());

        service.send_email(&msg).await.unwrap();

        // The logical name resolves to the provider template id.
        assert_eq!(api.last_template().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_unmapped_template_falls_back_to_raw_send() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(store_with_api_config().await, factory);

        let mut msg = message();
        msg.template_name = Some("no-such-template".to_string());

        let result = service.send_email(&msg).await.unwrap();

        // A name the tenant's mapping does not know is ignored and the raw
        // content delivers on the primary, no fallback involved.
        assert!(result.success);
        assert_eq!(result.provider, ProviderKind::Api);
        assert!(!result.fallback_used);
        assert_eq!(api.send_call_count(), 1);
        assert!(api.last_template().is_none());
        assert_eq!(api.last_subject().as_deref(), Some("Your contract"));
        assert_eq!(smtp.send_call_count(), 0);
    }

    #[tokio::test]
    async fn test_template_only_message_with_empty_body_still_delivers() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let service = service(store_with_api_config().await, factory);

        let mut msg = message();
        msg.template_name = Some("no-such-template".to_string());
        msg.html.clear();

        // The raw path forwards whatever content the message carries; an
        // empty body is the provider's call, not a local rejection.
        let result = service.send_email(&msg).await.unwrap();

        assert!(result.success);
        assert_eq!(api.send_call_count(), 1);
    }

    #[tokio::test]
    async fn test_per_call_retry_override() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api).failing_first(1),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let smtp = factory.smtp.clone();
        let service = service(store_with_api_config().await, factory);

        // One allowed attempt instead of the policy's three, then straight
        // to the fallback.
        let result = service
            .send_email_with_retries(&message(), 1)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attempts, 1);
        assert!(result.fallback_used);
        assert_eq!(api.send_call_count(), 1);
        assert_eq!(smtp.send_call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected_before_any_provider_call() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let service = service(store_with_api_config().await, factory);

        let mut msg = message();
        msg.to = "not-an-address".to_string();

        let err = service.send_email(&msg).await.unwrap_err();

        assert!(matches!(err, DeliveryError::Validation(_)));
        assert_eq!(api.send_call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tenant_degrades_to_default_config() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let service = service(Arc::new(InMemoryConfigStore::new()), factory);

        // Default config selects SMTP with an empty host; building the
        // client fails with a configuration error rather than a panic.
        let err = service.send_email(&message()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_credential_validation_probe() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let api = factory.api.clone();
        let service = service(store_with_api_config().await, factory);

        let valid = service
            .validate_api_credentials(TENANT, Some("user-1"))
            .await
            .unwrap();

        assert!(valid);
        assert_eq!(api.validate_call_count(), 1);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_audit_trail_carries_hash_but_never_the_secret() {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let service = service(store_with_api_config().await, factory);

        service.send_email(&message()).await.unwrap();

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("[AUDIT]"));
        assert!(logs.contains(&CredentialVault::audit_hash("xkeysib-test-key")));
        assert!(!logs.contains("xkeysib-test-key"));
    }

    #[tokio::test]
    async fn test_template_listing_uses_tenant_credentials() {
        let factory = FixedFactory {
            api: MockClient::new(ProviderKind::Api).with_templates(vec![TemplateSummary {
                id: "42".to_string(),
                name: "contract".to_string(),
            }]),
            smtp: MockClient::new(ProviderKind::Smtp),
        };
        let service = service(store_with_api_config().await, factory);

        let templates = service.list_api_templates(TENANT, None).await.unwrap();

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "contract");
    }
}
