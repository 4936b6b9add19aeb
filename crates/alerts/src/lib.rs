//! Email alerts for TVL changes.
//!
//! This crate provides:
//! - Environment-sourced SMTP configuration
//! - An SMTP transport over implicit TLS
//! - A notifier that never fails upward

pub mod config;
pub mod mailer;
pub mod notifier;

pub use config::{MailConfigError, MailerConfig};
pub use mailer::{MailError, MailTransport, SmtpMailer};
pub use notifier::Notifier;
