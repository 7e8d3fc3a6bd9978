//! Tweet creation, deletion and threads.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, Instrument};

use crate::error::sanitize_for_logging;
use crate::session::DataEnvelope;
use crate::{Pacer, Session, XifyError, XifyResult};

pub(crate) const TWEETS_PATH: &str = "/2/tweets";

/// Attachments accepted by a single tweet.
pub const MAX_MEDIA_PER_TWEET: usize = 4;

/// Body of `POST /2/tweets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTweet {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<TweetReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetMedia {
    pub media_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetReply {
    pub in_reply_to_tweet_id: String,
}

impl NewTweet {
    /// Empty text and an empty id list count as absent; a tweet needs one of
    /// the two.
    pub fn new(text: Option<&str>, media_ids: &[String], reply_to: Option<&str>) -> XifyResult<Self> {
        let text = text.filter(|t| !t.is_empty()).map(str::to_string);
        if text.is_none() && media_ids.is_empty() {
            return Err(XifyError::InvalidTweet);
        }

        Ok(NewTweet {
            text,
            media: (!media_ids.is_empty()).then(|| TweetMedia {
                media_ids: media_ids.to_vec(),
            }),
            reply: reply_to
                .filter(|id| !id.is_empty())
                .map(|id| TweetReply {
                    in_reply_to_tweet_id: id.to_string(),
                }),
        })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn media_ids(&self) -> &[String] {
        self.media
            .as_ref()
            .map(|m| m.media_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply.as_ref().map(|r| r.in_reply_to_tweet_id.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DeletedTweet {
    deleted: bool,
}

/// Post a tweet and return its id.
///
/// # Errors
///
/// `InvalidTweet` without any request when there is neither text nor media;
/// `Api` when the platform refuses the tweet.
pub async fn create_tweet(
    session: &Session,
    text: Option<&str>,
    media_ids: &[String],
    reply_to: Option<&str>,
) -> XifyResult<String> {
    let tweet = NewTweet::new(text, media_ids, reply_to).map_err(|err| {
        error!("Message content or media IDs must be present when sending a tweet.");
        err
    })?;

    let span = info_span!(parent: &session.config().span, "create_tweet");
    async move {
        info!(
            media_count = tweet.media_ids().len(),
            reply_to = ?tweet.reply_to(),
            "Sending tweet"
        );
        let response = session
            .client()
            .post(session.config().api_endpoint(TWEETS_PATH))
            .json(&tweet)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                body = %sanitize_for_logging(&body, 200),
                "Failed to send tweet"
            );
            return Err(XifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let DataEnvelope {
            data: CreatedTweet { id },
        } = serde_json::from_str(&body)?;
        info!(tweet_id = %id, "Tweet was successfully sent");
        Ok(id)
    }
    .instrument(span)
    .await
}

/// Delete one of the account's tweets. `Ok(false)` means the platform
/// answered but did not delete it.
pub async fn delete_tweet(session: &Session, tweet_id: &str) -> XifyResult<bool> {
    let span = info_span!(parent: &session.config().span, "delete_tweet", tweet_id);
    async move {
        info!("Deleting tweet");
        let response = session
            .client()
            .delete(session.config().api_endpoint(&format!("{}/{}", TWEETS_PATH, tweet_id)))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                body = %sanitize_for_logging(&body, 200),
                "Failed to delete tweet"
            );
            return Err(XifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let DataEnvelope {
            data: DeletedTweet { deleted },
        } = serde_json::from_str(&body)?;
        if deleted {
            info!("Tweet was successfully deleted");
        } else {
            error!("Tweet was not deleted");
        }
        Ok(deleted)
    }
    .instrument(span)
    .await
}

/// Group media ids into chunks of at most `size`. There is always at least
/// one chunk, so an empty input still yields one (empty) tweet's worth.
pub fn chunk_media_ids(media_ids: &[String], size: usize) -> Vec<Vec<String>> {
    if media_ids.is_empty() {
        return vec![Vec::new()];
    }
    media_ids
        .chunks(size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Post one tweet per chunk of four media ids. The first carries `text`,
/// each following one replies to its predecessor.
///
/// Returns the tweet ids in posting order. The first failure ends the thread.
pub async fn post_thread(
    session: &Session,
    pacer: &dyn Pacer,
    text: Option<&str>,
    media_ids: &[String],
    pace: Duration,
) -> XifyResult<Vec<String>> {
    let chunks = chunk_media_ids(media_ids, MAX_MEDIA_PER_TWEET);
    let span = info_span!(parent: &session.config().span, "post_thread", tweets = chunks.len());

    async move {
        let mut tweet_ids: Vec<String> = Vec::with_capacity(chunks.len());
        for (position, chunk) in chunks.iter().enumerate() {
            if position > 0 {
                pacer.pause(pace).await;
            }
            let text = if position == 0 { text } else { None };
            let reply_to = tweet_ids.last().map(String::as_str);
            let id = create_tweet(session, text, chunk, reply_to).await?;
            tweet_ids.push(id);
        }
        info!(tweet_ids = ?tweet_ids, "Thread was successfully sent");
        Ok::<_, XifyError>(tweet_ids)
    }
    .instrument(span)
    .await
}
