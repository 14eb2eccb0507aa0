use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Strongly typed request identifier backed by ULID.
///
/// Every accepted connection gets one; it is attached to the request span and
/// to every log line emitted while the request is being handled.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}

/// Unique identity of a server instance.
///
/// Used to name the acceptor thread (`acceptor_{id}`) so that several servers
/// in one process can be told apart in logs and thread dumps.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ServerId(pub ulid::Ulid);

impl ServerId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ServerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
