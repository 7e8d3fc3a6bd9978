use std::{borrow::Cow, fmt};

/// Consumer key pair plus the optional access token pair used for signing.
#[derive(Clone)]
pub struct Secrets<'a> {
    consumer_key: Cow<'a, str>,
    consumer_secret: Cow<'a, str>,
    token: Option<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> Secrets<'a> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
        }
    }

    pub fn token<TKey, TSecret>(self, token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: Some((token.into(), token_secret.into())),
            ..self
        }
    }

    pub fn consumer_key_pair(&self) -> (&str, &str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    pub fn token_pair(&self) -> Option<(&str, &str)> {
        self.token.as_ref().map(|(t, s)| (t.as_ref(), s.as_ref()))
    }

    pub(crate) fn token_option_pair(&self) -> (Option<&str>, Option<&str>) {
        self.token_pair()
            .map(|(t, s)| (Some(t), Some(s)))
            .unwrap_or((None, None))
    }
}

// keys and secrets never reach the logs
impl fmt::Debug for Secrets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|(t, _)| t))
            .field("token_secret", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
