use serde::Deserialize;

/// Error body returned by the remote API on 4xx/5xx responses. The server is
/// inconsistent about the `message` field: plain string on some endpoints,
/// a list of per-field messages on validation failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<MessageField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageField {
    One(String),
    Many(Vec<String>),
}

impl ApiErrorBody {
    /// Flattens the message field into a single human-readable string, or
    /// `None` when the body carried no usable message.
    pub fn into_message(self) -> Option<String> {
        match self.message? {
            MessageField::One(message) if !message.is_empty() => Some(message),
            MessageField::Many(messages) if !messages.is_empty() => Some(messages.join(", ")),
            _ => None,
        }
    }
}
