//! Message, result, and tenant-configuration data model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DeliveryError;

/// The two delivery channels a tenant can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// HTTP transactional email API (primary).
    Api,
    /// SMTP relay (secondary).
    Smtp,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Api => write!(f, "api"),
            ProviderKind::Smtp => write!(f, "smtp"),
        }
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Smtp
    }
}

impl ProviderKind {
    pub fn from_str(s: &str) -> Result<Self, DeliveryError> {
        match s.to_lowercase().as_str() {
            "api" | "brevo" => Ok(ProviderKind::Api),
            "smtp" => Ok(ProviderKind::Smtp),
            _ => Err(DeliveryError::Validation(format!(
                "unknown provider type: {s}"
            ))),
        }
    }
}

/// HTTP API provider section of a tenant's configuration.
///
/// `api_key` holds the stored form (`"ENC:" + ciphertext`, or legacy
/// plaintext); it is decrypted transiently per delivery call and never
/// written back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiProviderConfig {
    pub enabled: bool,
    pub api_key: String,
    pub from_email: String,
    pub from_name: Option<String>,
    /// Logical template name -> provider template id.
    pub templates: HashMap<String, String>,
}

/// SMTP relay section of a tenant's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmtpProviderConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Direct TLS (SMTPS) when true; STARTTLS otherwise.
    pub secure: bool,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub from_name: Option<String>,
}

impl Default for SmtpProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: 587,
            secure: false,
            user: String::new(),
            pass: String::new(),
            from: String::new(),
            from_name: None,
        }
    }
}

/// Per-tenant delivery configuration, owned by the business-configuration
/// layer and read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantEmailConfig {
    pub provider: ProviderKind,
    pub api: ApiProviderConfig,
    pub smtp: SmtpProviderConfig,
}

/// An attachment carried on the SMTP path. The HTTP API path ignores
/// attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// One send request, created and consumed within a single delivery call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    /// Single recipient address.
    pub to: String,
    pub subject: String,
    #[serde(rename = "htmlContent")]
    pub html: String,
    #[serde(rename = "textContent", default)]
    pub text: Option<String>,
    /// Logical template name; resolved against the active provider's
    /// template mapping.
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Outcome of a delivery call. Only successful deliveries produce one;
/// failures surface as [`DeliveryError`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub success: bool,
    /// The provider that actually delivered the message.
    pub provider: ProviderKind,
    pub message_id: Option<String>,
    /// Attempts made on the primary provider.
    pub attempts: u32,
    pub fallback_used: bool,
    /// On a fallback delivery, the primary failure that forced it.
    pub error: Option<String>,
}
