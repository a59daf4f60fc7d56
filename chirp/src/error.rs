use serde_json::Value;
use thiserror::Error;

/// Fallback text when an API error carries no usable message.
const GENERIC_API_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum ChirpError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ChirpError {
    /// Message suitable for the user-facing error surface.
    pub fn user_message(&self) -> String {
        match self {
            ChirpError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    /// HTTP status of the failed call, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChirpError::Api(e) => Some(e.status),
            ChirpError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Non-2xx response from the API. `data` is the parsed body: JSON when the
/// body parses, a JSON string holding the raw text otherwise, `Null` when
/// empty.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("HTTP error {status}: {data}")]
pub struct ApiError {
    pub status: u16,
    pub data: Value,
}

impl ApiError {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    /// Extract the human-readable message the server attached.
    ///
    /// A string body is returned as-is. An object with `message` yields that
    /// message, joining array messages (validation errors) with `", "`.
    pub fn user_message(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("message") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Array(parts)) if !parts.is_empty() => parts
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => GENERIC_API_MESSAGE.to_string(),
            },
            _ => GENERIC_API_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

pub type Result<T> = std::result::Result<T, ChirpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_body_is_the_message() {
        let err = ApiError::new(400, json!("handle already taken"));
        assert_eq!(err.user_message(), "handle already taken");
    }

    #[test]
    fn test_array_message_is_joined() {
        let err = ApiError::new(
            422,
            json!({ "message": ["text must not be empty", "imageUrl must be a URL"] }),
        );
        assert_eq!(
            err.user_message(),
            "text must not be empty, imageUrl must be a URL"
        );
    }

    #[test]
    fn test_missing_message_falls_back_to_generic() {
        let err = ApiError::new(500, json!({ "statusCode": 500 }));
        assert_eq!(err.user_message(), GENERIC_API_MESSAGE);
        assert_eq!(ApiError::new(502, Value::Null).user_message(), GENERIC_API_MESSAGE);
    }

    #[test]
    fn test_chirp_error_surfaces_api_message() {
        let err: ChirpError = ApiError::new(404, json!({ "message": "Post not found" })).into();
        assert_eq!(err.user_message(), "Post not found");
        assert_eq!(err.status(), Some(404));
    }
}
