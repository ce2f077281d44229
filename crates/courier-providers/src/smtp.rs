//! SMTP relay client (secondary provider)

use std::collections::HashMap;

use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentType, Header, HeaderName, HeaderValue},
        Attachment as SmtpAttachment, Mailbox, MultiPart,
    },
    transport::smtp::{authentication::Credentials, client::TlsParametersBuilder},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use courier_core::{
    html_to_text, validate_email, DeliveryError, ProviderKind, SmtpProviderConfig,
};

use crate::templates::LocalTemplateRegistry;
use crate::traits::{
    ProviderClient, SendOptions, SendOutcome, TemplateSummary, DEFAULT_SENDER_NAME,
};

#[derive(Debug, Clone)]
struct XMailer(String);

impl Header for XMailer {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Mailer")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct XPriority(String);

impl Header for XPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Debug, Clone)]
struct XMsMailPriority(String);

impl Header for XMsMailPriority {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("X-MSMail-Priority")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// SMTP relay client. Named templates resolve against the local registry
/// since a bare relay hosts none of its own.
pub struct SmtpClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    from_name: Option<String>,
    templates: LocalTemplateRegistry,
}

impl SmtpClient {
    /// Builds the transport from a tenant SMTP configuration.
    pub fn new(config: &SmtpProviderConfig) -> Result<Self, DeliveryError> {
        if config.host.is_empty() {
            return Err(DeliveryError::Configuration(
                "SMTP host must not be empty".into(),
            ));
        }
        if config.user.is_empty() || config.pass.is_empty() {
            return Err(DeliveryError::Configuration(
                "SMTP credentials must not be empty".into(),
            ));
        }

        let credentials = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = if config.secure {
            // Implicit TLS from the first byte (SMTPS).
            let tls = TlsParametersBuilder::new(config.host.clone())
                .build()
                .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| DeliveryError::Configuration(e.to_string()))?
                .port(config.port)
                .tls(lettre::transport::smtp::client::Tls::Wrapper(tls))
                .credentials(credentials)
                .build()
        } else {
            // Plain connection, upgraded with STARTTLS when the relay offers it.
            let tls = TlsParametersBuilder::new(config.host.clone())
                .build()
                .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .tls(lettre::transport::smtp::client::Tls::Opportunistic(tls))
                .credentials(credentials)
                .build()
        };

        Ok(Self {
            transport,
            from: config.from.clone(),
            from_name: config.from_name.clone(),
            templates: LocalTemplateRegistry::builtin(),
        })
    }

    fn sender(&self, options: &SendOptions) -> Result<Mailbox, DeliveryError> {
        let email = options.from.as_deref().unwrap_or(&self.from);
        let name = options
            .from_name
            .clone()
            .or_else(|| self.from_name.clone())
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string());

        format!("{name} <{email}>")
            .parse()
            .map_err(|_| DeliveryError::Configuration(format!("invalid sender address '{email}'")))
    }

    fn recipient(to: &str) -> Result<Mailbox, DeliveryError> {
        validate_email(to)?;
        to.parse()
            .map_err(|_| DeliveryError::Validation(format!("invalid recipient address '{to}'")))
    }

    async fn dispatch(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        let message_id = format!("<{}@courier>", Uuid::new_v4());

        let mut builder = Message::builder()
            .from(self.sender(options)?)
            .to(Self::recipient(to)?)
            .subject(subject)
            .message_id(Some(message_id.clone()))
            .header(XMailer(DEFAULT_SENDER_NAME.to_string()))
            .header(XPriority("3".to_string()))
            .header(XMsMailPriority("Normal".to_string()));

        if let Some(reply_to) = &options.reply_to {
            let mailbox: Mailbox = reply_to.parse().map_err(|_| {
                DeliveryError::Validation(format!("invalid reply-to address '{reply_to}'"))
            })?;
            builder = builder.reply_to(mailbox);
        }

        let alternative =
            MultiPart::alternative_plain_html(text.to_string(), html.to_string());

        let body = if options.attachments.is_empty() {
            alternative
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for attachment in &options.attachments {
                let content_type: ContentType =
                    attachment.content_type.parse().map_err(|_| {
                        DeliveryError::Validation(format!(
                            "invalid attachment content type '{}'",
                            attachment.content_type
                        ))
                    })?;
                mixed = mixed.singlepart(
                    SmtpAttachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), content_type),
                );
            }
            mixed
        };

        let message = builder
            .multipart(body)
            .map_err(|e| DeliveryError::Validation(e.to_string()))?;

        debug!(to, subject, attachments = options.attachments.len(), "relaying email over SMTP");

        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                DeliveryError::BadRequest(e.to_string())
            } else {
                DeliveryError::ProviderUnavailable(e.to_string())
            }
        })?;

        Ok(SendOutcome { message_id })
    }
}

#[async_trait]
impl ProviderClient for SmtpClient {
    async fn send_template(
        &self,
        template_id: &str,
        to: &str,
        variables: &HashMap<String, Value>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        let rendered = self
            .templates
            .render(template_id, variables)
            .ok_or_else(|| DeliveryError::TemplateNotFound(template_id.to_string()))?;

        let subject = options.subject.as_deref().unwrap_or(&rendered.subject);
        let text = html_to_text(&rendered.html);

        self.dispatch(to, subject, &rendered.html, &text, options)
            .await
    }

    async fn send_raw(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: Option<&str>,
        options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        let text_body = text
            .map(str::to_string)
            .unwrap_or_else(|| html_to_text(html));

        self.dispatch(to, subject, html, &text_body, options).await
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DeliveryError> {
        Ok(self.templates.summaries())
    }

    async fn validate_credentials(&self) -> Result<bool, DeliveryError> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| DeliveryError::ProviderUnavailable(e.to_string()))
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Smtp
    }
}
