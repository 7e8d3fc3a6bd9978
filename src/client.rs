use std::sync::Arc;

use reqwest::{Client as ReqwestClient, IntoUrl, Method};

use crate::{OAuth1Signer, RequestBuilder, RequestSigner, Secrets};

/// Attach a [`RequestSigner`] to a `reqwest::Client`.
pub trait SignedClientProvider {
    fn signed<S>(self, signer: S) -> Client
    where
        Self: Sized,
        S: RequestSigner + 'static;

    fn oauth1(self, secrets: Secrets<'static>) -> Client
    where
        Self: Sized,
    {
        self.signed(OAuth1Signer::new(secrets))
    }
}

impl SignedClientProvider for ReqwestClient {
    fn signed<S>(self, signer: S) -> Client
    where
        S: RequestSigner + 'static,
    {
        Client::new(self, signer)
    }
}

/// HTTP client whose every request passes through a signer before it is sent.
#[derive(Debug, Clone)]
pub struct Client {
    inner: ReqwestClient,
    signer: Arc<dyn RequestSigner>,
}

impl Client {
    pub fn new<S>(inner: ReqwestClient, signer: S) -> Self
    where
        S: RequestSigner + 'static,
    {
        Client {
            inner,
            signer: Arc::new(signer),
        }
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a request with the `Method` and `Url`.
    ///
    /// An unparsable URL surfaces as an error once the request is sent.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder::new(
            self.inner.request(method, url),
            self.inner.clone(),
            Arc::clone(&self.signer),
        )
    }
}
