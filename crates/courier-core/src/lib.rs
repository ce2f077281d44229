//! Core types for the Courier delivery subsystem
//!
//! This crate carries everything the provider clients and the orchestrator
//! share: the message and tenant-configuration data model, the failure
//! taxonomy, the credential vault, and the text utilities (recipient syntax
//! validation and HTML to plain-text conversion).

pub mod errors;
pub mod message;
pub mod text;
pub mod vault;

// Re-export main types
pub use errors::{classify_status, DeliveryError};
pub use message::{
    ApiProviderConfig, Attachment, DeliveryResult, EmailMessage, ProviderKind, SmtpProviderConfig,
    TenantEmailConfig,
};
pub use text::{html_to_text, validate_email};
pub use vault::CredentialVault;
