// ----------------------------------------------------------------------------
// This source code contains derived artifacts from seanmonstar's `reqwest`.
// for further information(including license information),
// please visit their repository: https://github.com/seanmonstar/reqwest .
// ----------------------------------------------------------------------------
use std::{convert::TryFrom, fmt, sync::Arc, time::Duration};

use reqwest::{
    header::HeaderName, header::HeaderValue, multipart, Client as ReqwestClient, Request,
    RequestBuilder as ReqwestRequestBuilder, Response,
};
use serde::Serialize;

use crate::{RequestSigner, XifyResult};

/// Request under construction; it is signed right before it leaves.
pub struct RequestBuilder {
    inner: ReqwestRequestBuilder,
    client: ReqwestClient,
    signer: Arc<dyn RequestSigner>,
}

impl RequestBuilder {
    pub(crate) fn new(
        inner: ReqwestRequestBuilder,
        client: ReqwestClient,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        RequestBuilder {
            inner,
            client,
            signer,
        }
    }

    // ------------------------------------------------------------------------
    // Finish building the request and send it with its signature

    /// Build the request and sign it.
    pub fn build(self) -> XifyResult<Request> {
        let request = self.inner.build()?;
        Ok(self.signer.sign(request)?)
    }

    /// Sign the request and send it.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be built or signed, or on transport errors.
    /// A non-2xx status is not an error here.
    pub async fn send(self) -> XifyResult<Response> {
        let client = self.client.clone();
        let request = self.build()?;
        Ok(client.execute(request).await?)
    }

    // ------------------------------------------------------------------------
    // Pass-through to inner builder

    fn pass_through<F>(self, f: F) -> Self
    where
        F: FnOnce(ReqwestRequestBuilder) -> ReqwestRequestBuilder,
    {
        RequestBuilder {
            inner: f(self.inner),
            ..self
        }
    }

    /// Append query parameters; they take part in the OAuth signature.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        self.pass_through(|b| b.query(query))
    }

    /// Send a form body; its pairs take part in the OAuth signature.
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> Self {
        self.pass_through(|b| b.form(form))
    }

    /// Send a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.pass_through(|b| b.json(json))
    }

    /// Send a multipart/form-data body.
    ///
    /// Note: multipart/form-data is not handled by the OAuth signer.
    pub fn multipart(self, multipart: multipart::Form) -> Self {
        self.pass_through(|b| b.multipart(multipart))
    }

    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.pass_through(|b| b.header(key, value))
    }

    /// Enables a request timeout, overriding the client-wide one.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.pass_through(|b| b.timeout(timeout))
    }

    /// `None` is returned if the body is a stream (e.g. multipart).
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(|inner| RequestBuilder {
            inner,
            client: self.client.clone(),
            signer: Arc::clone(&self.signer),
        })
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("inner", &self.inner)
            .field("signer", &self.signer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use http::header::AUTHORIZATION;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::{BearerSigner, Secrets, SignedClientProvider};

    #[test]
    fn build_signs_with_query() {
        let secrets = Secrets::new("key", "secret").token("token", "token_secret");
        let request = reqwest::Client::new()
            .oauth1(secrets)
            .post("https://upload.twitter.com/1.1/media/upload.json")
            .query(&[("command", "FINALIZE"), ("media_id", "777")])
            .build()
            .unwrap();

        let auth = request.headers().get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("OAuth "));
        assert!(auth.contains("oauth_consumer_key=\"key\""));
        assert!(auth.contains("oauth_token=\"token\""));
        assert!(auth.contains("oauth_signature="));
        assert_eq!(request.url().query(), Some("command=FINALIZE&media_id=777"));
    }

    #[test]
    fn multipart_bodies_cannot_be_cloned() {
        let client = reqwest::Client::new().signed(BearerSigner::new("t"));
        let plain = client.get("https://api.x.com/2/users/me");
        assert!(plain.try_clone().is_some());

        let form = reqwest::multipart::Form::new().part(
            "media",
            reqwest::multipart::Part::bytes(vec![1u8, 2, 3]),
        );
        let streamed = client
            .post("https://upload.twitter.com/1.1/media/upload.json")
            .multipart(form);
        assert!(streamed.try_clone().is_none());
    }

    #[tokio::test]
    async fn send_carries_signature() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(query_param("user.fields", "id"))
            .and(header("authorization", "Bearer app-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = reqwest::Client::new()
            .signed(BearerSigner::new("app-token"))
            .get(format!("{}/2/users/me", mock_server.uri()))
            .query(&[("user.fields", "id")])
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn invalid_url_is_reported_on_send() {
        let result = reqwest::Client::new()
            .signed(BearerSigner::new("t"))
            .get("not a url")
            .send()
            .await;
        assert!(matches!(result, Err(crate::XifyError::Http(_))));
    }
}
