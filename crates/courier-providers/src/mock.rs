//! Mock provider client for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use courier_core::{DeliveryError, ProviderKind};

use crate::traits::{ProviderClient, SendOptions, SendOutcome, TemplateSummary};

/// Mock provider client for testing
///
/// Clones share counters, so a test can hand one copy to the code under test
/// and keep another to assert against. `failing_first(n)` scripts transient
/// failures: the first `n` sends fail with the configured error, later ones
/// succeed.
#[derive(Debug, Clone)]
pub struct MockClient {
    pub send_count: Arc<AtomicUsize>,
    pub template_send_count: Arc<AtomicUsize>,
    pub list_count: Arc<AtomicUsize>,
    pub validate_count: Arc<AtomicUsize>,

    kind: ProviderKind,
    fail_first: usize,
    failure: DeliveryError,
    templates: Vec<TemplateSummary>,
    last_subject: Arc<Mutex<Option<String>>>,
    last_template: Arc<Mutex<Option<String>>>,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new(ProviderKind::Api)
    }
}

impl MockClient {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            send_count: Arc::new(AtomicUsize::new(0)),
            template_send_count: Arc::new(AtomicUsize::new(0)),
            list_count: Arc::new(AtomicUsize::new(0)),
            validate_count: Arc::new(AtomicUsize::new(0)),
            kind,
            fail_first: 0,
            failure: DeliveryError::ProviderUnavailable("mock send failure".to_string()),
            templates: Vec::new(),
            last_subject: Arc::new(Mutex::new(None)),
            last_template: Arc::new(Mutex::new(None)),
        }
    }

    /// Fails the first `n` sends, then succeeds.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Fails every send.
    pub fn always_failing(mut self) -> Self {
        self.fail_first = usize::MAX;
        self
    }

    /// Overrides the error returned by scripted failures.
    pub fn with_failure(mut self, failure: DeliveryError) -> Self {
        self.failure = failure;
        self
    }

    pub fn with_templates(mut self, templates: Vec<TemplateSummary>) -> Self {
        self.templates = templates;
        self
    }

    pub fn send_call_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst) + self.template_send_count.load(Ordering::SeqCst)
    }

    pub fn validate_call_count(&self) -> usize {
        self.validate_count.load(Ordering::SeqCst)
    }

    pub fn last_subject(&self) -> Option<String> {
        self.last_subject.lock().unwrap().clone()
    }

    pub fn last_template(&self) -> Option<String> {
        self.last_template.lock().unwrap().clone()
    }

    fn outcome_for(&self, attempt_index: usize) -> Result<SendOutcome, DeliveryError> {
        if attempt_index < self.fail_first {
            return Err(self.failure.clone());
        }

        Ok(SendOutcome {
            message_id: format!("mock-message-{}", Uuid::new_v4()),
        })
    }
}

#[async_trait]
impl ProviderClient for MockClient {
    async fn send_template(
        &self,
        template_id: &str,
        _to: &str,
        _variables: &HashMap<String, Value>,
        _options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        let seen = self.send_call_count();
        self.template_send_count.fetch_add(1, Ordering::SeqCst);
        *self.last_template.lock().unwrap() = Some(template_id.to_string());

        self.outcome_for(seen)
    }

    async fn send_raw(
        &self,
        _to: &str,
        subject: &str,
        _html: &str,
        _text: Option<&str>,
        _options: &SendOptions,
    ) -> Result<SendOutcome, DeliveryError> {
        let seen = self.send_call_count();
        self.send_count.fetch_add(1, Ordering::SeqCst);
        *self.last_subject.lock().unwrap() = Some(subject.to_string());

        self.outcome_for(seen)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, DeliveryError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.templates.clone())
    }

    async fn validate_credentials(&self) -> Result<bool, DeliveryError> {
        self.validate_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.fail_first == 0)
    }

    fn provider_kind(&self) -> ProviderKind {
        self.kind
    }
}
