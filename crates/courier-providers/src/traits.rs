//! Provider client trait definitions

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use courier_core::{Attachment, DeliveryError, ProviderKind};

/// Sender display name used when the tenant configures none.
pub const DEFAULT_SENDER_NAME: &str = "Courier";

/// Per-send options. Fields are merged into the provider payload only when
/// present; absent fields fall back to tenant defaults.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub from: Option<String>,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
    /// Subject override for template sends.
    pub subject: Option<String>,
    /// Carried on the SMTP path; the HTTP API path ignores attachments.
    pub attachments: Vec<Attachment>,
}

/// Successful send outcome with the provider-assigned message id.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message_id: String,
}

/// A template as exposed to callers: id and name, nothing else from the
/// provider leaks through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
}

/// Capability set shared by every delivery channel.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Sends using a provider template and substitution variables.
    async fn send_template(
        &self,
        template_id: &str,
        to: &str,
        variables: &HashMap<String, Value>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError>;

    /// Sends explicit subject and HTML content. A plain-text body is derived
    /// deterministically when none is supplied.
    async fn send_raw(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError>;

    /// Lists active templates only.
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DeliveryError>;

    /// Minimal read-only probe of the configured credentials. Provider-side
    /// rejections come back as `false`; transport failures propagate.
    async fn validate_credentials(&self) -> Result<bool, DeliveryError>;

    /// Which channel this client drives.
    fn provider_kind(&self) -> ProviderKind;
}
