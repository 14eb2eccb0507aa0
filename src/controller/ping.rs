use crate::params::Parameters;
use crate::response::Response;

pub const PING_MESSAGE: &str = "Alive and well!";

/// Liveness response, echoing any supplied parameters as `key | value` pairs.
///
/// A key supplied more than once is echoed with its values joined by `,`.
#[must_use]
pub fn ping(parameters: &Parameters) -> Response {
    let mut message = String::from(PING_MESSAGE);
    if !parameters.is_empty() {
        let pairs: Vec<String> = parameters
            .keys()
            .into_iter()
            .map(|key| format!("{key} | {}", parameters.joined(key).unwrap_or_default()))
            .collect();
        message.push_str(" { ");
        message.push_str(&pairs.join(", "));
        message.push_str(" }");
    }
    Response::ok("Ping", message)
}
