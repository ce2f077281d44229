//! Provider clients for the Courier delivery subsystem
//!
//! Two delivery channels implement the same capability set:
//! - [`BrevoClient`], the HTTP transactional email API (primary)
//! - [`SmtpClient`], a plain SMTP relay (secondary)
//!
//! [`MockClient`] is a scriptable stand-in used by orchestrator tests.

mod brevo;
mod smtp;
mod traits;

pub mod mock;
pub mod templates;

pub use brevo::{BrevoClient, API_KEY_PREFIX};
pub use mock::MockClient;
pub use smtp::SmtpClient;
pub use templates::{LocalTemplateRegistry, RenderedTemplate};
pub use traits::*;
