//! Client configuration and credential loading.

use std::{env, fmt, time::Duration};

use tracing::{error, Span};

use crate::{Secrets, XifyError, XifyResult};

pub const CONSUMER_KEY_VAR: &str = "CONSUMER_API_KEY_TOKEN";
pub const CONSUMER_SECRET_VAR: &str = "CONSUMER_API_KEY_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "AUTH_ACCESS_TOKEN";
pub const ACCESS_SECRET_VAR: &str = "AUTH_ACCESS_SECRET";

/// Browser-like identity sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
pub const DEFAULT_API_URL: &str = "https://api.x.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.twitter.com";
/// Largest APPEND segment accepted by the upload endpoint.
pub const DEFAULT_SEGMENT_SIZE: usize = 5_000_000;

#[derive(Debug, Clone)]
pub struct XifyConfig {
    /// Base URL of the v2 API (users, tweets)
    pub api_url: String,
    /// Base URL of the v1.1 media upload API
    pub upload_url: String,
    pub user_agent: String,
    /// Timeout of the identity verification call
    pub verify_timeout: Duration,
    pub segment_size: usize,
    /// Pause after every APPEND request
    pub append_pace: Duration,
    /// Pause between the tweets of a thread
    pub thread_pace: Duration,
    /// Parent span of everything the client logs
    pub span: Span,
}

impl Default for XifyConfig {
    fn default() -> Self {
        XifyConfig {
            api_url: DEFAULT_API_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_timeout: Duration::from_secs(2),
            segment_size: DEFAULT_SEGMENT_SIZE,
            append_pace: Duration::from_secs(2),
            thread_pace: Duration::from_secs(2),
            span: Span::none(),
        }
    }
}

impl XifyConfig {
    pub fn api_url<T: Into<String>>(self, api_url: T) -> Self {
        XifyConfig {
            api_url: api_url.into(),
            ..self
        }
    }

    pub fn upload_url<T: Into<String>>(self, upload_url: T) -> Self {
        XifyConfig {
            upload_url: upload_url.into(),
            ..self
        }
    }

    pub fn user_agent<T: Into<String>>(self, user_agent: T) -> Self {
        XifyConfig {
            user_agent: user_agent.into(),
            ..self
        }
    }

    pub fn verify_timeout(self, verify_timeout: Duration) -> Self {
        XifyConfig {
            verify_timeout,
            ..self
        }
    }

    pub fn segment_size(self, segment_size: usize) -> Self {
        XifyConfig {
            segment_size,
            ..self
        }
    }

    pub fn append_pace(self, append_pace: Duration) -> Self {
        XifyConfig {
            append_pace,
            ..self
        }
    }

    pub fn thread_pace(self, thread_pace: Duration) -> Self {
        XifyConfig {
            thread_pace,
            ..self
        }
    }

    pub fn span(self, span: Span) -> Self {
        XifyConfig { span, ..self }
    }

    pub(crate) fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    pub(crate) fn upload_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.upload_url.trim_end_matches('/'), path)
    }
}

/// The four OAuth1 user-context credential strings.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl Credentials {
    pub fn new<A, B, C, D>(consumer_key: A, consumer_secret: B, access_token: C, access_secret: D) -> Self
    where
        A: Into<String>,
        B: Into<String>,
        C: Into<String>,
        D: Into<String>,
    {
        Credentials {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_secret: access_secret.into(),
        }
    }

    /// Read the credentials from the process environment.
    pub fn from_env() -> XifyResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Every absent variable is logged; the first one is returned as the error.
    pub fn from_lookup<F>(lookup: F) -> XifyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| {
            let value = lookup(name).filter(|v| !v.is_empty());
            if value.is_none() {
                error!("'{}' could not be found!", name);
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let credentials = Credentials {
            consumer_key: read(CONSUMER_KEY_VAR),
            consumer_secret: read(CONSUMER_SECRET_VAR),
            access_token: read(ACCESS_TOKEN_VAR),
            access_secret: read(ACCESS_SECRET_VAR),
        };

        match missing.first() {
            Some(name) => Err(XifyError::MissingCredential(*name)),
            None => Ok(credentials),
        }
    }

    pub fn secrets(&self) -> Secrets<'static> {
        Secrets::new(self.consumer_key.clone(), self.consumer_secret.clone())
            .token(self.access_token.clone(), self.access_secret.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}
