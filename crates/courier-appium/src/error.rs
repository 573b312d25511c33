//! WebDriver error handling

use serde_json::Value;
use thiserror::Error;

use courier_harness::HarnessError;

#[derive(Debug, Error)]
pub enum AppiumError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a W3C error payload
    #[error("WebDriver error '{error}' (HTTP {status}): {message}")]
    WebDriver {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Malformed response: missing {0}")]
    MissingField(&'static str),

    #[error("Screenshot decoding error: {0}")]
    Screenshot(#[from] base64::DecodeError),

    #[error("Unsupported lookup: {0}")]
    Unsupported(String),
}

impl AppiumError {
    /// Build from a non-success response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let value = parsed.as_ref().map(|v| &v["value"]);
        let error = value
            .and_then(|v| v["error"].as_str())
            .unwrap_or("unknown error")
            .to_string();
        let message = value
            .and_then(|v| v["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.chars().take(200).collect());
        AppiumError::WebDriver { status, error, message }
    }

    pub fn is_no_such_element(&self) -> bool {
        matches!(self, AppiumError::WebDriver { error, .. } if error == "no such element")
    }
}

impl From<AppiumError> for HarnessError {
    fn from(e: AppiumError) -> Self {
        match e {
            AppiumError::WebDriver { error, message, .. } if error == "no such element" => {
                HarnessError::ElementNotFound { locator: message }
            }
            AppiumError::Unsupported(what) => HarnessError::action("lookup", what),
            other => HarnessError::Session(other.to_string()),
        }
    }
}

pub type AppiumResult<T> = Result<T, AppiumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w3c_error_body_is_parsed() {
        let body = r#"{"value":{"error":"no such element","message":"An element could not be located","stacktrace":""}}"#;
        let err = AppiumError::from_response(404, body);
        assert!(err.is_no_such_element());
        assert!(matches!(HarnessError::from(err), HarnessError::ElementNotFound { .. }));
    }

    #[test]
    fn test_other_errors_map_to_session_failures() {
        let err = AppiumError::from_response(500, "upstream proxy exploded");
        assert!(!err.is_no_such_element());
        let harness = HarnessError::from(err);
        assert!(matches!(&harness, HarnessError::Session(msg) if msg.contains("upstream proxy exploded")));
        assert!(!harness.is_retryable());
    }

    #[test]
    fn test_undecodable_screenshot_keeps_its_cause() {
        use base64::Engine;

        let err = base64::engine::general_purpose::STANDARD
            .decode("not a png!")
            .map_err(AppiumError::from)
            .unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
        assert!(matches!(HarnessError::from(err), HarnessError::Session(msg) if msg.starts_with("Screenshot decoding error")));
    }
}
