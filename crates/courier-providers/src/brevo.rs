//! Brevo transactional email client (primary provider)

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use courier_core::{classify_status, html_to_text, validate_email, DeliveryError, ProviderKind};

use crate::traits::{
    ProviderClient, SendOptions, SendOutcome, TemplateSummary, DEFAULT_SENDER_NAME,
};

/// Expected prefix of a Brevo API key. A decrypted key without it usually
/// means the wrong tenant key still produced printable text.
pub const API_KEY_PREFIX: &str = "xkeysib-";

/// HTTP client for the Brevo transactional email API.
pub struct BrevoClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl BrevoClient {
    const BASE_URL: &'static str = "https://api.brevo.com/v3";

    /// Creates a client for the given (already decrypted) API key.
    pub fn new(api_key: &str) -> Result<Self, DeliveryError> {
        if api_key.is_empty() {
            return Err(DeliveryError::Validation("API key must not be empty".into()));
        }

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: Self::BASE_URL.to_string(),
        })
    }

    /// Points the client at a different endpoint; used by tests.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn sender_from(options: &SendOptions) -> Option<BrevoAddress> {
        options.from.as_ref().map(|email| BrevoAddress {
            email: email.clone(),
            name: options
                .from_name
                .clone()
                .or_else(|| Some(DEFAULT_SENDER_NAME.to_string())),
        })
    }

    fn reply_to_from(options: &SendOptions) -> Option<BrevoAddress> {
        options.reply_to.as_ref().map(|email| BrevoAddress {
            email: email.clone(),
            name: None,
        })
    }

    async fn post_email(
        &self,
        request: &SendTransactionalRequest<'_>,
    ) -> Result<SendOutcome, DeliveryError> {
        let response = self
            .client
            .post(self.api_url("/smtp/email"))
            .header("api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = read_error_message(response).await;
            error!(status, message = %message, "provider rejected transactional send");
            return Err(classify_status(status, message));
        }

        let body: SendTransactionalResponse = response.json().await.map_err(transport_error)?;

        debug!(message_id = %body.message_id, "email accepted by provider");

        Ok(SendOutcome {
            message_id: body.message_id,
        })
    }
}

// Brevo API wire types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionalRequest<'a> {
    to: Vec<BrevoAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender: Option<BrevoAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<BrevoAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a HashMap<String, Value>>,
}

#[derive(Debug, Serialize)]
struct BrevoAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendTransactionalResponse {
    message_id: String,
}

#[derive(Debug, Deserialize)]
struct TemplateListResponse {
    #[serde(default)]
    templates: Vec<BrevoTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrevoTemplate {
    id: i64,
    name: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Debug, Deserialize, Default)]
struct BrevoErrorBody {
    #[serde(default)]
    message: String,
}

fn transport_error(err: reqwest::Error) -> DeliveryError {
    DeliveryError::ProviderUnavailable(err.to_string())
}

async fn read_error_message(response: reqwest::Response) -> String {
    let fallback = "no error detail".to_string();
    match response.json::<BrevoErrorBody>().await {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => fallback,
    }
}

#[async_trait]
impl ProviderClient for BrevoClient {
    async fn send_template(
        &self,
        template_id: &str,
        to: &str,
        variables: &HashMap<String, Value>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        validate_email(to)?;

        let template_id: i64 = template_id.parse().map_err(|_| {
            DeliveryError::Validation(format!("template id '{template_id}' is not numeric"))
        })?;

        debug!(template_id, to, variables = variables.len(), "sending template email");

        let request = SendTransactionalRequest {
            to: vec![BrevoAddress {
                email: to.to_string(),
                name: None,
            }],
            sender: Self::sender_from(options),
            reply_to: Self::reply_to_from(options),
            subject: options.subject.as_deref(),
            html_content: None,
            text_content: None,
            template_id: Some(template_id),
            params: if variables.is_empty() {
                None
            } else {
                Some(variables)
            },
        };

        self.post_email(&request).await
    }

    async fn send_raw(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        validate_email(to)?;

        let text_body = text
            .map(str::to_string)
            .unwrap_or_else(|| html_to_text(html));

        debug!(to, subject, "sending raw email");

        let request = SendTransactionalRequest {
            to: vec![BrevoAddress {
                email: to.to_string(),
                name: None,
            }],
            sender: Self::sender_from(options),
            reply_to: Self::reply_to_from(options),
            subject: Some(subject),
            html_content: Some(html),
            text_content: Some(text_body),
            template_id: None,
            params: None,
        };

        self.post_email(&request).await
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DeliveryError> {
        let response = self
            .client
            .get(self.api_url("/smtp/templates"))
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = read_error_message(response).await;
            return Err(classify_status(status, message));
        }

        let body: TemplateListResponse = response.json().await.map_err(transport_error)?;

        let templates: Vec<TemplateSummary> = body
            .templates
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| TemplateSummary {
                id: t.id.to_string(),
                name: t.name,
            })
            .collect();

        debug!(count = templates.len(), "listed active provider templates");

        Ok(templates)
    }

    async fn validate_credentials(&self) -> Result<bool, DeliveryError> {
        // Minimal read-only probe. Transport failures propagate; any
        // provider-side rejection means the key is unusable.
        let response = self
            .client
            .get(self.api_url("/smtp/templates"))
            .query(&[("limit", "1")])
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Api
    }
}
