/*!
xify: post to X (Twitter) from Rust.

# Overview

This library wraps [reqwest](https://crates.io/crates/reqwest) in an OAuth 1.0a
signing layer built with [oauth1-request](https://crates.io/crates/oauth1-request),
verifies the account it acts as, uploads media through the chunked
INIT / APPEND / FINALIZE / STATUS protocol and composes tweets, replies and
threads.

# How to use

## Basic usecase 1 - a tweet with an image

```no_run
# async fn run() -> xify::XifyResult<()> {
use xify::{Credentials, Xify, XifyConfig};

// CONSUMER_API_KEY_TOKEN, CONSUMER_API_KEY_SECRET,
// AUTH_ACCESS_TOKEN and AUTH_ACCESS_SECRET
let credentials = Credentials::from_env()?;

let mut xify = Xify::new(XifyConfig::default()).credentials(credentials);
let me = xify.authenticate().await?;
println!("posting as @{}", me.username);

let media_id = xify.upload_media("./storage/media/candy.png").await?;
let tweet_id = xify
    .post_tweet(Some("Hello, X!"), &[media_id], None)
    .await?;
# Ok(())
# }
```

## Basic usecase 2 - driving the pieces yourself

```no_run
# async fn run() -> xify::XifyResult<()> {
use std::time::Duration;
use xify::{media::MediaUploader, Credentials, PollOptions, Session, TokioPacer, XifyConfig};

let config = XifyConfig::default().append_pace(Duration::from_secs(1));
let session = Session::authenticate(config, &Credentials::from_env()?).await?;

let upload = MediaUploader::new(&session, &TokioPacer)
    .poll_options(PollOptions::default().max_wait(Duration::from_secs(300)))
    .create_media_id("./storage/media/clip.mp4")
    .await?;

for failure in &upload.segment_failures {
    eprintln!("segment {} failed: {}", failure.index, failure.reason);
}
let media_id = upload.into_media_id()?;
# Ok(())
# }
```

## Signing arbitrary requests

```no_run
# async fn run() -> xify::XifyResult<()> {
use xify::{Secrets, SignedClientProvider};

let secrets = Secrets::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .token("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

let resp = reqwest::Client::new()
    .oauth1(secrets)
    .get("https://api.x.com/2/users/me")
    .send()
    .await?;
# Ok(())
# }
```
*/
mod client;
mod config;
mod error;
pub mod media;
mod pacer;
mod request;
mod secrets;
mod session;
mod signer;
pub mod tweet;
mod xify;

#[cfg(test)]
mod testing;

// exposed to external program
pub use client::{Client, SignedClientProvider};
pub use config::{
    Credentials, XifyConfig, ACCESS_SECRET_VAR, ACCESS_TOKEN_VAR, CONSUMER_KEY_VAR,
    CONSUMER_SECRET_VAR, DEFAULT_API_URL, DEFAULT_SEGMENT_SIZE, DEFAULT_UPLOAD_URL,
    DEFAULT_USER_AGENT,
};
pub use error::{SignError, SignResult, XifyError, XifyResult};
pub use media::{Completion, MediaUpload, MediaUploader, PollOptions, SegmentFailure};
pub use pacer::{Pacer, TokioPacer};
pub use request::RequestBuilder;
pub use secrets::Secrets;
pub use session::{Identity, Session};
pub use signer::{BearerSigner, OAuth1Signer, OAuthParameters, RequestSigner};
pub use tweet::NewTweet;
pub use xify::Xify;
