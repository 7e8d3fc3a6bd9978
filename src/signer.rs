use std::{borrow::Cow, fmt};

use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use oauth1_request::signature_method::SignatureMethod;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use reqwest::Request;
use url::Url;

use crate::{Secrets, SignError, SignResult};

const OAUTH_IDENTIFIER: &str = "oauth_";
const REALM_IDENTIFIER: &str = "realm";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Capability that turns an outgoing request into an authorized one.
///
/// Upload and tweet code only ever see this trait, so the authorization
/// scheme can be swapped without touching them.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    fn sign(&self, request: Request) -> SignResult<Request>;
}

/// OAuth 1.0a signer.
///
/// Query parameters and `application/x-www-form-urlencoded` bodies take part
/// in the signature base string. Multipart and JSON bodies do not.
#[derive(Debug, Clone)]
pub struct OAuth1Signer<'a, TSignatureMethod = HmacSha1>
where
    TSignatureMethod: SignatureMethod + Clone,
{
    secrets: Secrets<'a>,
    parameters: OAuthParameters<'a, TSignatureMethod>,
}

impl<'a> OAuth1Signer<'a, HmacSha1> {
    pub fn new(secrets: Secrets<'a>) -> Self {
        Self::with_params(secrets, OAuthParameters::new())
    }
}

impl<'a, TSignatureMethod> OAuth1Signer<'a, TSignatureMethod>
where
    TSignatureMethod: SignatureMethod + Clone,
{
    pub fn with_params(
        secrets: Secrets<'a>,
        parameters: OAuthParameters<'a, TSignatureMethod>,
    ) -> Self {
        OAuth1Signer {
            secrets,
            parameters,
        }
    }

    /// Build the `Authorization` header value for the given request parts.
    pub fn authorization(
        &self,
        method: &Method,
        url: &Url,
        form: Option<&[u8]>,
    ) -> SignResult<String> {
        let (consumer_key, consumer_secret) = self.secrets.consumer_key_pair();
        let (token, token_secret) = self.secrets.token_option_pair();
        let options = self.parameters.build_options(token);

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        // gather query and form pairs, then sort them around the oauth_* block
        let mut pairs: Vec<(Cow<str>, Cow<str>)> = url.query_pairs().collect();
        if let Some(form) = form {
            pairs.extend(url::form_urlencoded::parse(form));
        }
        if let Some((key, _)) = pairs.iter().find(|(k, _)| k.starts_with(OAUTH_IDENTIFIER)) {
            return Err(SignError::UnconfigurableParameter(key.to_string()));
        }
        pairs.push((Cow::from(OAUTH_IDENTIFIER), Cow::from("")));
        pairs.sort();

        let mut divided = pairs.splitn(2, |(k, _)| k == &OAUTH_IDENTIFIER);
        let before_oauth = divided.next().unwrap_or_default();
        let after_oauth = divided.next().unwrap_or_default();

        let mut signer = OAuthSigner::with_signature_method(
            self.parameters.signature_method.clone(),
            method.as_str(),
            base_url,
            consumer_secret,
            token_secret,
        );
        for (key, value) in before_oauth {
            signer.parameter(key, value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in after_oauth {
            signer.parameter(key, value);
        }
        let sign = signer.finish().authorization;

        match self.parameters.realm {
            Some(ref realm) => Ok(format!(
                "{},{}=\"{}\"",
                sign,
                REALM_IDENTIFIER,
                realm.as_ref()
            )),
            None => Ok(sign),
        }
    }
}

impl<TSignatureMethod> RequestSigner for OAuth1Signer<'static, TSignatureMethod>
where
    TSignatureMethod: SignatureMethod + Clone + Send + Sync + fmt::Debug,
{
    fn sign(&self, mut request: Request) -> SignResult<Request> {
        let form = if is_form(request.headers()) {
            request.body().and_then(|body| body.as_bytes())
        } else {
            None
        };
        let authorization = self.authorization(request.method(), request.url(), form)?;
        let value = HeaderValue::from_str(&authorization)
            .map_err(|e| SignError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(request)
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with(FORM_CONTENT_TYPE))
}

/// Bearer token authorization (OAuth 2.0 app-only or user context).
#[derive(Clone)]
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    pub fn new<T: Into<String>>(token: T) -> Self {
        BearerSigner {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerSigner")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl RequestSigner for BearerSigner {
    fn sign(&self, mut request: Request) -> SignResult<Request> {
        let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| SignError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(request)
    }
}

#[derive(Debug, Clone)]
pub struct OAuthParameters<'a, TSignatureMethod>
where
    TSignatureMethod: SignatureMethod + Clone,
{
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    signature_method: TSignatureMethod,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl<'a> Default for OAuthParameters<'a, HmacSha1> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            signature_method: HmacSha1,
            timestamp: None,
            verifier: None,
            version: false,
        }
    }
}

impl<'a> OAuthParameters<'a, HmacSha1> {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<'a, T> OAuthParameters<'a, T>
where
    T: SignatureMethod + Clone,
{
    pub fn callback<V>(self, callback: V) -> Self
    where
        V: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value; a random one is generated otherwise
    pub fn nonce<V>(self, nonce: V) -> Self
    where
        V: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    pub fn realm<V>(self, realm: V) -> Self
    where
        V: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value; the current time is used otherwise
    pub fn timestamp<V>(self, timestamp: V) -> Self
    where
        V: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    pub fn verifier<V>(self, verifier: V) -> Self
    where
        V: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// When `true`, `oauth_version="1.0"` is sent. Otherwise it is omitted.
    pub fn version<V>(self, version: V) -> Self
    where
        V: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    pub fn signature_method<TSignatureMethod>(
        self,
        signature_method: TSignatureMethod,
    ) -> OAuthParameters<'a, TSignatureMethod>
    where
        TSignatureMethod: SignatureMethod + Clone,
    {
        OAuthParameters {
            signature_method,
            callback: self.callback,
            nonce: self.nonce,
            realm: self.realm,
            timestamp: self.timestamp,
            verifier: self.verifier,
            version: self.version,
        }
    }

    fn build_options<'s>(&'s self, token: Option<&'s str>) -> Options<'s> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_ref());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_ref());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_ref());
        }
        opt.version(self.version);

        opt
    }
}
