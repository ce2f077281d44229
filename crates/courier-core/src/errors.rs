//! Error taxonomy for the delivery subsystem

use thiserror::Error;

/// Failure taxonomy shared by the provider clients and the orchestrator.
///
/// Retry and fallback decisions are made from the variant alone; provider
/// error text is carried for diagnostics only.
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    /// Bad caller input. No network call was made and nothing is retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Stored credentials could not be decrypted. Disables that provider for
    /// the current call only; the tenant's other provider may still work.
    #[error("credential decryption failed: {0}")]
    Decryption(String),

    #[error("credential encryption failed: {0}")]
    Encryption(String),

    /// The provider rejected the request payload (HTTP 400).
    #[error("provider rejected request: {0}")]
    BadRequest(String),

    /// The provider rejected the API key (HTTP 401).
    #[error("provider credentials rejected")]
    InvalidCredentials,

    /// The tenant's sending quota is exhausted (HTTP 402).
    #[error("provider quota exceeded")]
    QuotaExceeded,

    /// The referenced template does not exist for this provider (HTTP 404).
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The provider throttled the request (HTTP 429).
    #[error("provider rate limit reached")]
    RateLimited,

    /// Transport failure or provider-side outage (5xx, timeout, connection
    /// refused).
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider response that maps to nothing else in the taxonomy.
    #[error("unrecognized provider error ({status}): {message}")]
    UnknownProvider { status: u16, message: String },

    /// The tenant has no usable provider left for this call.
    #[error("no usable email provider: {0}")]
    Configuration(String),

    /// Retries on the primary provider were exhausted and the single
    /// fallback attempt failed as well. Both causes are preserved.
    #[error("all providers failed; primary: {primary}; fallback: {fallback}")]
    BothProvidersFailed {
        primary: Box<DeliveryError>,
        fallback: Box<DeliveryError>,
    },
}

impl DeliveryError {
    /// Whether another attempt against the same provider could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryError::RateLimited
                | DeliveryError::ProviderUnavailable(_)
                | DeliveryError::UnknownProvider { .. }
        )
    }
}

/// Map a provider HTTP status to the shared taxonomy.
pub fn classify_status(status: u16, message: impl Into<String>) -> DeliveryError {
    let message = message.into();
    match status {
        400 => DeliveryError::BadRequest(message),
        401 => DeliveryError::InvalidCredentials,
        402 => DeliveryError::QuotaExceeded,
        404 => DeliveryError::TemplateNotFound(message),
        429 => DeliveryError::RateLimited,
        500..=599 => DeliveryError::ProviderUnavailable(message),
        _ => DeliveryError::UnknownProvider { status, message },
    }
}
