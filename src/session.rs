//! Signed session: an OAuth1-signed client plus the identity it was verified as.

use serde::Deserialize;
use tracing::{error, info, info_span, Instrument};

use crate::error::sanitize_for_logging;
use crate::{
    Client, Credentials, OAuth1Signer, RequestSigner, SignedClientProvider, XifyConfig,
    XifyError, XifyResult,
};

pub(crate) const USERS_ME_PATH: &str = "/2/users/me";

/// The account a session acts as.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// `{"data": ...}` wrapper of the v2 API.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub(crate) data: T,
}

/// A verified, signed connection to the platform.
///
/// The only way to obtain one is a successful identity check, so holding a
/// `Session` means the credentials were accepted.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    config: XifyConfig,
    identity: Identity,
}

impl Session {
    /// Build an OAuth1 client from the credentials and verify it against
    /// `GET /2/users/me`.
    pub async fn authenticate(config: XifyConfig, credentials: &Credentials) -> XifyResult<Self> {
        Self::with_signer(config, OAuth1Signer::new(credentials.secrets())).await
    }

    /// Same as [`Session::authenticate`] with any authorization scheme.
    pub async fn with_signer<S>(config: XifyConfig, signer: S) -> XifyResult<Self>
    where
        S: RequestSigner + 'static,
    {
        let span = info_span!(parent: &config.span, "authenticate");
        async move {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .build()?
                .signed(signer);

            let response = client
                .get(config.api_endpoint(USERS_ME_PATH))
                .timeout(config.verify_timeout)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                error!(
                    status = status.as_u16(),
                    body = %sanitize_for_logging(&body, 200),
                    "Failed to authenticate"
                );
                return Err(XifyError::Authentication {
                    status: status.as_u16(),
                    body,
                });
            }

            let DataEnvelope { data: identity } =
                serde_json::from_str::<DataEnvelope<Identity>>(&body)?;
            info!(
                username = %identity.username,
                user_id = %identity.id,
                display_name = %identity.name,
                "Successfully authenticated"
            );

            Ok(Session {
                client,
                config,
                identity,
            })
        }
        .instrument(span)
        .await
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &XifyConfig {
        &self.config
    }
}
