use thiserror::Error;

pub type XifyResult<T> = std::result::Result<T, XifyError>;
pub type SignResult<T> = std::result::Result<T, SignError>;

#[derive(Error, Debug)]
pub enum XifyError {
    #[error("credential {0} could not be found in the environment")]
    MissingCredential(&'static str),
    #[error("authentication failed ({status}) : {body}")]
    Authentication { status: u16, body: String },
    #[error("no authenticated session; call authenticate first")]
    NotAuthenticated,
    #[error("media upload INIT failed ({status}) : {body}")]
    UploadInit { status: u16, body: String },
    #[error("media {media_id} is not usable : {reason}")]
    UploadIncomplete { media_id: String, reason: String },
    #[error("a tweet needs text or media ids")]
    InvalidTweet,
    #[error("API request failed ({status}) : {body}")]
    Api { status: u16, body: String },
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("request failed : {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response : {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O failed : {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum SignError {
    #[error("signature could not be stored in a header : {0}")]
    InvalidHeader(String),
    #[error("specified parameter {0} could not be configured via the request parameters.")]
    UnconfigurableParameter(String),
}

impl XifyError {
    /// HTTP status reported by the platform, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            XifyError::Authentication { status, .. }
            | XifyError::UploadInit { status, .. }
            | XifyError::Api { status, .. } => Some(*status),
            XifyError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Flatten control characters and cap the length of a response body before it
/// is written to the log.
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let head: String = sanitized.chars().take(max_len).collect();
        format!("{}... [truncated, {} total bytes]", head, text.len())
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_and_truncates() {
        assert_eq!(sanitize_for_logging("a\nb\tc\u{7}", 10), "a b c?");
        assert_eq!(
            sanitize_for_logging("ééééé", 2),
            "éé... [truncated, 10 total bytes]"
        );
    }

    #[test]
    fn status_is_exposed_for_response_errors() {
        let err = XifyError::Authentication {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "authentication failed (401) : Unauthorized");
        assert_eq!(XifyError::InvalidTweet.status(), None);
        assert_eq!(
            XifyError::MissingCredential("AUTH_ACCESS_TOKEN").to_string(),
            "credential AUTH_ACCESS_TOKEN could not be found in the environment"
        );
    }
}
