//! Shared fixtures for the unit tests.

use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    BearerSigner, Credentials, Pacer, RequestSigner, Session, SignError, SignResult, XifyConfig,
};

pub(crate) fn test_credentials() -> Credentials {
    Credentials::new(
        "test_consumer_key",
        "test_consumer_secret",
        "test_access_token",
        "test_access_token_secret",
    )
}

pub(crate) fn test_config(mock_server: &MockServer) -> XifyConfig {
    XifyConfig::default()
        .api_url(mock_server.uri())
        .upload_url(mock_server.uri())
}

pub(crate) async fn mount_identity(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "id": "42", "name": "Xify Bot", "username": "xifybot" }
        })))
        .mount(mock_server)
        .await;
}

pub(crate) async fn test_session(mock_server: &MockServer) -> Session {
    mount_identity(mock_server).await;
    Session::authenticate(test_config(mock_server), &test_credentials())
        .await
        .unwrap()
}

/// Refuses to sign any request carrying the query pair `key=value`, so the
/// request never leaves the client. Everything else gets a bearer token.
#[derive(Debug)]
pub(crate) struct FailingSigner {
    key: &'static str,
    value: &'static str,
    fallback: BearerSigner,
}

impl FailingSigner {
    pub(crate) fn new(key: &'static str, value: &'static str) -> Self {
        FailingSigner {
            key,
            value,
            fallback: BearerSigner::new("test-token"),
        }
    }
}

impl RequestSigner for FailingSigner {
    fn sign(&self, request: reqwest::Request) -> SignResult<reqwest::Request> {
        let refused = request
            .url()
            .query_pairs()
            .any(|(k, v)| k == self.key && v == self.value);
        if refused {
            return Err(SignError::InvalidHeader(format!(
                "refused {}={}",
                self.key, self.value
            )));
        }
        self.fallback.sign(request)
    }
}

pub(crate) async fn failing_session(
    mock_server: &MockServer,
    config: XifyConfig,
    key: &'static str,
    value: &'static str,
) -> Session {
    mount_identity(mock_server).await;
    Session::with_signer(config, FailingSigner::new(key, value))
        .await
        .unwrap()
}

/// Records each requested pause and returns at once.
#[derive(Debug, Default)]
pub(crate) struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub(crate) fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Cancels the token on the first pause and then never wakes up.
#[derive(Debug)]
pub(crate) struct CancellingPacer {
    pub(crate) token: CancellationToken,
}

#[async_trait]
impl Pacer for CancellingPacer {
    async fn pause(&self, _duration: Duration) {
        self.token.cancel();
        std::future::pending::<()>().await;
    }
}

/// In-memory log sink for a test-local `fmt` subscriber.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
