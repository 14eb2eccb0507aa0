//! Exception escalation.
//!
//! A caught action failure is fanned out to the endpoints declared on the
//! action ([`ExceptionPolicy`]) and may switch the whole server into blocking
//! mode. Mail goes through the [`MailTransport`] seam so deployments without a
//! mail host, and tests, can substitute their own delivery.

mod core;
mod mail;

pub use core::{Behavior, EndPoint, Escalator, ExceptionPolicy, ESCALATION_SENDER};
pub use mail::{MailError, MailMessage, MailTransport, NoopTransport, SmtpTransport};
