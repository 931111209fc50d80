use serde_json::Value;
use strum_macros::AsRefStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request never produced a response.
    Network,
    Validation,
    Unauthorized,
    NotFound,
    Conflict,
    Server,
    /// The response body did not have the expected shape.
    Decode,
}

/// Every failure coming out of the API gateway, whatever shape the backend
/// used for its `detail` field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    /// Builds the error for a non-success response from its status code and raw body.
    pub fn from_response(status: u16, reason: Option<&str>, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            400 | 422 => ErrorKind::Validation,
            500.. => ErrorKind::Server,
            _ => ErrorKind::Validation,
        };
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| detail_message(&value))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && !trimmed.starts_with('{')).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| match reason {
                Some(reason) => format!("{status} {reason}"),
                None => format!("Request failed with status {status}"),
            });
        Self { kind, message }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = errors
            .field_errors()
            .into_keys()
            .map(|field| field.to_string())
            .collect::<Vec<_>>();
        fields.sort();
        Self::validation(format!("Missing or invalid: {}", fields.join(", ")))
    }
}

fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(detail)) => return Some(detail.clone()),
        Some(Value::Array(entries)) => {
            return Some(
                entries
                    .iter()
                    .map(validation_entry)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
        _ => {}
    }
    if let Some(Value::String(message)) = body.get("message") {
        return Some(message.clone());
    }
    match body.get("detail") {
        Some(Value::Object(detail)) => Some(match detail.get("msg") {
            Some(Value::String(msg)) => msg.clone(),
            _ => Value::Object(detail.clone()).to_string(),
        }),
        _ => None,
    }
}

fn validation_entry(entry: &Value) -> String {
    match entry {
        Value::String(text) => text.clone(),
        Value::Object(fields) => match fields.get("msg") {
            Some(Value::String(msg)) => {
                let location = fields
                    .get("loc")
                    .and_then(Value::as_array)
                    .map(|parts| {
                        parts
                            .iter()
                            .map(|part| match part {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(" → ")
                    })
                    .unwrap_or_else(|| "Error".to_string());
                format!("{location}: {msg}")
            }
            _ => entry.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"detail":"Email already registered"}"#, "Email already registered")]
    #[case(r#"{"message":"Too many requests"}"#, "Too many requests")]
    #[case(
        r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"},"bad password"]}"#,
        "body → email: value is not a valid email address; bad password"
    )]
    #[case(r#"{"detail":{"msg":"Invalid curl pattern"}}"#, "Invalid curl pattern")]
    #[case(r#"{"detail":{"code":7}}"#, r#"{"code":7}"#)]
    #[case("upstream timed out", "upstream timed out")]
    fn normalizes_detail_shapes(#[case] body: &str, #[case] expected: &str) {
        assert_eq!(ApiError::from_response(400, None, body).message, expected);
    }

    #[rstest]
    #[case(401, ErrorKind::Unauthorized)]
    #[case(404, ErrorKind::NotFound)]
    #[case(409, ErrorKind::Conflict)]
    #[case(422, ErrorKind::Validation)]
    #[case(503, ErrorKind::Server)]
    fn kind_follows_status(#[case] status: u16, #[case] kind: ErrorKind) {
        assert_eq!(ApiError::from_response(status, None, "").kind, kind);
    }

    #[test]
    fn empty_body_falls_back_to_reason() {
        let error = ApiError::from_response(502, Some("Bad Gateway"), "{}");
        assert_eq!(error.message, "502 Bad Gateway");
    }
}
