use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::mail::{split_recipients, MailMessage, MailTransport, NoopTransport};
use crate::controller::ActionError;
use crate::logging::{log_message, LogLevel};
use crate::server::ServerContext;

/// Fixed sender identity of escalation mail.
pub const ESCALATION_SENDER: &str = "server@noreply.com";

/// Where a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndPoint {
    Log,
    Email,
}

/// How the server behaves after the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    RemainActive,
    /// Reject every subsequent request until an operator resets the flag.
    BlockClients,
}

/// Post-failure escalation rule attached to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionPolicy {
    pub endpoint: EndPoint,
    pub behavior: Behavior,
    /// Mail recipients; only meaningful for [`EndPoint::Email`]
    pub recipients: Vec<String>,
}

impl Default for ExceptionPolicy {
    fn default() -> Self {
        Self::log(Behavior::RemainActive)
    }
}

impl ExceptionPolicy {
    pub fn log(behavior: Behavior) -> Self {
        Self {
            endpoint: EndPoint::Log,
            behavior,
            recipients: Vec::new(),
        }
    }

    /// Mail the failure to a comma-delimited recipient list.
    pub fn email(behavior: Behavior, recipients: &str) -> Self {
        Self {
            endpoint: EndPoint::Email,
            behavior,
            recipients: split_recipients(recipients),
        }
    }
}

/// Applies exception policies to a caught action failure.
///
/// Endpoints run first, every policy in declaration order. Behaviors are then
/// scanned in order and the first `BlockClients` sets the server's block flag
/// and ends the scan. Escalation never fails: transport errors are logged and
/// dropped.
#[derive(Clone)]
pub struct Escalator {
    transport: Arc<dyn MailTransport>,
}

impl Default for Escalator {
    fn default() -> Self {
        Self::new(Arc::new(NoopTransport))
    }
}

impl fmt::Debug for Escalator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Escalator").finish_non_exhaustive()
    }
}

impl Escalator {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn escalate(&self, policies: &[ExceptionPolicy], error: &ActionError, ctx: &ServerContext) {
        for policy in policies {
            match policy.endpoint {
                EndPoint::Log => {
                    log_message("Server Exception Thrown", LogLevel::Error, Some(error.error()));
                }
                EndPoint::Email if !policy.recipients.is_empty() => {
                    self.mail(&policy.recipients, error);
                }
                EndPoint::Email => {}
            }
        }

        if policies
            .iter()
            .any(|p| p.behavior == Behavior::BlockClients)
        {
            ctx.block_requests();
            warn!(server_id = %ctx.id, "server now blocking all inbound requests");
        }
    }

    fn mail(&self, recipients: &[String], error: &ActionError) {
        let message = MailMessage {
            recipients: recipients.to_vec(),
            sender: ESCALATION_SENDER.to_string(),
            subject: format!("Server Exception Thrown: {}", error.message()),
            body: error.trace(),
        };
        if let Err(e) = self.transport.send(&message) {
            let failure = anyhow::Error::new(e);
            log_message(
                &format!("Failed to send email to {}", recipients.join(",")),
                LogLevel::Error,
                Some(&failure),
            );
        }
    }
}
