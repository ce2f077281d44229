//! Local template registry for the SMTP path
//!
//! The SMTP relay has no provider-hosted templates. Named templates are
//! resolved against this registry instead; each entry is a pure function
//! from substitution variables to a rendered subject and HTML body.

use std::collections::HashMap;

use serde_json::Value;

use crate::traits::{TemplateSummary, DEFAULT_SENDER_NAME};

/// A rendered local template.
#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub subject: String,
    pub html: String,
}

type RenderFn = fn(&HashMap<String, Value>) -> RenderedTemplate;

/// Registry of named local templates, populated at startup.
pub struct LocalTemplateRegistry {
    entries: Vec<(&'static str, RenderFn)>,
}

impl LocalTemplateRegistry {
    /// The built-in template set.
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                ("form-request", render_form_request as RenderFn),
                ("contract", render_contract as RenderFn),
                ("reminder", render_reminder as RenderFn),
            ],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    /// Renders a named template, or `None` when it is not registered.
    pub fn render(
        &self,
        name: &str,
        variables: &HashMap<String, Value>,
    ) -> Option<RenderedTemplate> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, render)| render(variables))
    }

    /// All registered templates; local templates are always active.
    pub fn summaries(&self) -> Vec<TemplateSummary> {
        self.entries
            .iter()
            .map(|(name, _)| TemplateSummary {
                id: (*name).to_string(),
                name: (*name).to_string(),
            })
            .collect()
    }
}

impl Default for LocalTemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn text_var<'a>(variables: &'a HashMap<String, Value>, key: &str) -> &'a str {
    variables.get(key).and_then(Value::as_str).unwrap_or("")
}

fn page(content: String) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background-color: #213547; color: white; padding: 20px; text-align: center;">
      <h1>{DEFAULT_SENDER_NAME}</h1>
    </div>
    <div style="padding: 20px; background-color: #f9f9f9;">
{content}
    </div>
    <div style="text-align: center; padding: 20px; color: #666; font-size: 12px;">
      <p>This email was sent automatically.</p>
    </div>
  </div>
</body>
</html>"#
    )
}

fn render_form_request(variables: &HashMap<String, Value>) -> RenderedTemplate {
    let contact = text_var(variables, "contactName");
    let event = text_var(variables, "eventName");
    let form_url = text_var(variables, "formUrl");
    let due_date = text_var(variables, "dueDate");

    let deadline = if due_date.is_empty() {
        String::new()
    } else {
        format!("      <p><strong>Deadline:</strong> {due_date}</p>\n")
    };

    let content = format!(
        r#"      <h2>Hello {contact},</h2>
      <p>Thank you for your interest in <strong>{event}</strong>.</p>
      <p>To finalize the arrangements, please complete the online form:</p>
      <div style="text-align: center;">
        <a href="{form_url}" style="display: inline-block; padding: 12px 24px; background-color: #007bff; color: white; text-decoration: none; border-radius: 4px;">Complete the form</a>
      </div>
{deadline}      <p>If you have any questions, do not hesitate to contact us.</p>"#
    );

    RenderedTemplate {
        subject: format!("{DEFAULT_SENDER_NAME} - Form to complete for {event}"),
        html: page(content),
    }
}

fn render_contract(variables: &HashMap<String, Value>) -> RenderedTemplate {
    let contact = text_var(variables, "contactName");
    let event = text_var(variables, "eventName");
    let signature_due = text_var(variables, "signatureDue");

    let deadline = if signature_due.is_empty() {
        String::new()
    } else {
        format!(
            "      <p>Please return the signed contract before <strong>{signature_due}</strong>.</p>\n"
        )
    };

    let content = format!(
        r#"      <h2>Hello {contact},</h2>
      <p>Please find attached the contract for <strong>{event}</strong>.</p>
{deadline}      <p>If you have any questions about this contract, do not hesitate to contact us.</p>"#
    );

    RenderedTemplate {
        subject: format!("{DEFAULT_SENDER_NAME} - Contract for {event}"),
        html: page(content),
    }
}

fn render_reminder(variables: &HashMap<String, Value>) -> RenderedTemplate {
    let contact = text_var(variables, "contactName");
    let topic = text_var(variables, "topic");
    let message = text_var(variables, "message");

    let content = format!(
        r#"      <h2>Hello {contact},</h2>
      <div>{message}</div>"#
    );

    RenderedTemplate {
        subject: format!("{DEFAULT_SENDER_NAME} - Reminder: {topic}"),
        html: page(content),
    }
}
