//! The uniform result of every request.
//!
//! Exactly one [`Response`] is produced per request, whichever path produced
//! it: a successful action, a failed validation gate, an unresolved route, a
//! blocked server or a caught action failure.

use http::StatusCode;

/// Status description used for gate failures and missing actions.
pub const CONFLICT_DESCRIPTION: &str = "Server is unable to handle your request";
/// Message used when a gate fails without supplying a diagnostic.
pub const CONFLICT_FALLBACK_MESSAGE: &str = "Server unable to handle your request";
/// Status description used when an action fails without an exception handler.
pub const INTERNAL_ERROR_DESCRIPTION: &str =
    "Server encountered an error while handling your request";

/// HTTP-style response produced by actions and by the framework itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: StatusCode,
    /// Short status text
    pub status_description: String,
    /// Text body; `None` produces an empty payload
    pub message: Option<String>,
}

impl Response {
    pub fn new(
        status: StatusCode,
        status_description: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_description: status_description.into(),
            message: Some(message.into()),
        }
    }

    /// Response without a body.
    pub fn empty(status: StatusCode, status_description: impl Into<String>) -> Self {
        Self {
            status,
            status_description: status_description.into(),
            message: None,
        }
    }

    /// `200 OK` when the request completed, `500` otherwise.
    pub fn completed(
        completed: bool,
        status_description: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let status = if completed {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, status_description, message)
    }

    pub fn ok(status_description: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, status_description, message)
    }

    /// `409` for a rejected gate or an action that could not be invoked.
    pub fn conflict(message: Option<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            CONFLICT_DESCRIPTION,
            message.unwrap_or_else(|| CONFLICT_FALLBACK_MESSAGE.to_string()),
        )
    }

    /// `500` carrying the root-cause message of a failed action.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_DESCRIPTION,
            message,
        )
    }

    /// `503` for unresolved routes and a blocked server.
    pub fn unavailable(path: &str, message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Failed to invoke {path}..."),
            message,
        )
    }

    /// UTF-8 bytes of the message, empty when there is none.
    #[must_use]
    pub fn payload(&self) -> Vec<u8> {
        self.message
            .as_ref()
            .map(|m| m.as_bytes().to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_utf8_message() {
        let res = Response::ok("Ping", "héllo");
        assert_eq!(res.payload(), "héllo".as_bytes());
        assert!(Response::empty(StatusCode::OK, "x").payload().is_empty());
    }

    #[test]
    fn completed_maps_to_ok_or_internal_error() {
        assert_eq!(Response::completed(true, "d", "m").status, StatusCode::OK);
        assert_eq!(
            Response::completed(false, "d", "m").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_falls_back_to_generic_message() {
        let res = Response::conflict(None);
        assert_eq!(res.status, StatusCode::CONFLICT);
        assert_eq!(res.message(), CONFLICT_FALLBACK_MESSAGE);
    }

    #[test]
    fn unavailable_names_the_path() {
        let res = Response::unavailable("/a/b", "Controller does not exist.");
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.status_description, "Failed to invoke /a/b...");
    }
}
