//! Outbound mail used by the `Email` escalation endpoint.

use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::net::ToSocketAddrs;
use std::time::Duration;

use may::net::TcpStream;
use tracing::debug;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A plain-text message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub recipients: Vec<String>,
    pub sender: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    /// Build a message from a comma-delimited recipient list.
    pub fn new(
        recipients: &str,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients: split_recipients(recipients),
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

pub(crate) fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

/// Error raised while delivering mail
#[derive(Debug)]
pub enum MailError {
    /// The message has no recipients
    NoRecipients,
    /// Connecting to or talking with the mail host failed
    Io(std::io::Error),
    /// The mail host answered a command with an unexpected reply
    Rejected { command: String, reply: String },
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::NoRecipients => write!(f, "message has no recipients"),
            MailError::Io(e) => write!(f, "mail transport I/O error: {e}"),
            MailError::Rejected { command, reply } => {
                write!(f, "mail host rejected {command}: {reply}")
            }
        }
    }
}

impl std::error::Error for MailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MailError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MailError {
    fn from(e: std::io::Error) -> Self {
        MailError::Io(e)
    }
}

/// Synchronous mail delivery.
pub trait MailTransport: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Drops every message. Used when no mail host is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

impl MailTransport for NoopTransport {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        debug!(
            recipients = ?message.recipients,
            subject = %message.subject,
            "mail transport disabled, dropping message"
        );
        Ok(())
    }
}

/// Minimal SMTP client: one connection per message, no TLS, no auth.
///
/// The socket is a `may` stream, so a slow mail host parks only the calling
/// request coroutine and never the worker thread underneath it.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    host: String,
    port: u16,
}

impl SmtpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn connect(&self) -> Result<TcpStream, MailError> {
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, SMTP_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(SMTP_TIMEOUT))?;
                    stream.set_write_timeout(Some(SMTP_TIMEOUT))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(MailError::Io(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address found for {}", self.host),
            )
        })))
    }
}

struct Conversation {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Conversation {
    /// Read one (possibly multi-line) reply and check its code.
    fn expect(&mut self, command: &str, code: &str) -> Result<(), MailError> {
        let mut reply = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(MailError::Rejected {
                    command: command.to_string(),
                    reply: "connection closed".to_string(),
                });
            }
            reply.push_str(&line);
            // "250-..." continues, "250 ..." ends the reply
            if line.as_bytes().get(3) != Some(&b'-') {
                break;
            }
        }
        if reply.starts_with(code) {
            Ok(())
        } else {
            Err(MailError::Rejected {
                command: command.to_string(),
                reply: reply.trim_end().to_string(),
            })
        }
    }

    fn command(&mut self, line: &str, code: &str) -> Result<(), MailError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        let verb = line.split(':').next().unwrap_or(line);
        self.expect(verb, code)
    }
}

/// Dot-stuff the body and normalize line endings to CRLF.
fn encode_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 16);
    for line in body.lines() {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

impl MailTransport for SmtpTransport {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }
        let stream = self.connect()?;
        let mut conv = Conversation {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        };
        conv.expect("CONNECT", "220")?;
        conv.command("HELO localhost", "250")?;
        conv.command(&format!("MAIL FROM:<{}>", message.sender), "250")?;
        for rcpt in &message.recipients {
            conv.command(&format!("RCPT TO:<{rcpt}>"), "250")?;
        }
        conv.command("DATA", "354")?;
        let data = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}.",
            message.sender,
            message.recipients.join(", "),
            message.subject.replace(['\r', '\n'], " "),
            encode_body(&message.body),
        );
        conv.command(&data, "250")?;
        conv.command("QUIT", "221")?;
        debug!(host = %self.host, recipients = ?message.recipients, "mail delivered");
        Ok(())
    }
}
