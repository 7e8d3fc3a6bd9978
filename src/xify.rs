use std::{path::Path, sync::Arc};

use tracing::{info, info_span, Instrument};

use crate::{
    tweet, Credentials, Identity, MediaUpload, MediaUploader, Pacer, PollOptions, Session,
    TokioPacer, XifyConfig, XifyError, XifyResult,
};

/// One account, one workflow: authenticate once, then upload and post.
///
/// ```no_run
/// # async fn run() -> xify::XifyResult<()> {
/// let mut xify = xify::Xify::default();
/// xify.authenticate().await?;
///
/// let media_id = xify.upload_media("./storage/media/candy.png").await?;
/// let tweet_id = xify
///     .post_tweet(Some("Good evening!"), &[media_id], None)
///     .await?;
/// println!("{}", tweet_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Xify {
    config: XifyConfig,
    credentials: Option<Credentials>,
    pacer: Arc<dyn Pacer>,
    poll: PollOptions,
    session: Option<Session>,
}

impl Default for Xify {
    fn default() -> Self {
        Xify::new(XifyConfig::default())
    }
}

impl Xify {
    pub fn new(config: XifyConfig) -> Self {
        Xify {
            config,
            credentials: None,
            pacer: Arc::new(TokioPacer),
            poll: PollOptions::default(),
            session: None,
        }
    }

    /// Use these credentials instead of reading the environment.
    pub fn credentials(self, credentials: Credentials) -> Self {
        Xify {
            credentials: Some(credentials),
            ..self
        }
    }

    pub fn pacer(self, pacer: Arc<dyn Pacer>) -> Self {
        Xify { pacer, ..self }
    }

    pub fn poll_options(self, poll: PollOptions) -> Self {
        Xify { poll, ..self }
    }

    /// Verify the credentials and keep the resulting session.
    pub async fn authenticate(&mut self) -> XifyResult<&Identity> {
        let span = info_span!(parent: &self.config.span, "xify_authenticate");
        let session = async {
            info!("Authenticating");
            let credentials = match &self.credentials {
                Some(credentials) => credentials.clone(),
                None => Credentials::from_env()?,
            };
            let session = Session::authenticate(self.config.clone(), &credentials).await?;
            info!(username = %session.identity().username, "Authenticated");
            Ok::<_, XifyError>(session)
        }
        .instrument(span)
        .await?;
        Ok(self.session.insert(session).identity())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(Session::identity)
    }

    pub fn session(&self) -> XifyResult<&Session> {
        self.session.as_ref().ok_or(XifyError::NotAuthenticated)
    }

    fn uploader(&self) -> XifyResult<MediaUploader<'_>> {
        Ok(MediaUploader::new(self.session()?, self.pacer.as_ref()).poll_options(self.poll.clone()))
    }

    /// Upload a file and return its media id once it is ready to attach.
    pub async fn upload_media<P: AsRef<Path>>(&self, path: P) -> XifyResult<String> {
        self.upload_media_detailed(path).await?.into_media_id()
    }

    /// Upload a file and report every segment and processing outcome.
    pub async fn upload_media_detailed<P: AsRef<Path>>(&self, path: P) -> XifyResult<MediaUpload> {
        let path = path.as_ref();
        let span = info_span!(parent: &self.config.span, "xify_upload", path = %path.display());
        async {
            info!("Uploading media");
            let upload = self.uploader()?.create_media_id(path).await?;
            info!(media_id = %upload.media_id, ready = upload.is_ready(), "Media upload finished");
            Ok::<_, XifyError>(upload)
        }
        .instrument(span)
        .await
    }

    pub async fn post_tweet(
        &self,
        text: Option<&str>,
        media_ids: &[String],
        reply_to: Option<&str>,
    ) -> XifyResult<String> {
        let span = info_span!(parent: &self.config.span, "xify_post_tweet");
        async {
            info!(media_count = media_ids.len(), reply_to = ?reply_to, "Posting tweet");
            let tweet_id = tweet::create_tweet(self.session()?, text, media_ids, reply_to).await?;
            info!(tweet_id = %tweet_id, "Tweet posted");
            Ok::<_, XifyError>(tweet_id)
        }
        .instrument(span)
        .await
    }

    /// Spread `media_ids` over as many chained tweets as needed.
    pub async fn post_thread(&self, text: Option<&str>, media_ids: &[String]) -> XifyResult<Vec<String>> {
        let span = info_span!(parent: &self.config.span, "xify_post_thread");
        async {
            info!(media_count = media_ids.len(), "Posting thread");
            let tweet_ids = tweet::post_thread(
                self.session()?,
                self.pacer.as_ref(),
                text,
                media_ids,
                self.config.thread_pace,
            )
            .await?;
            info!(tweets = tweet_ids.len(), "Thread posted");
            Ok::<_, XifyError>(tweet_ids)
        }
        .instrument(span)
        .await
    }

    pub async fn delete_tweet(&self, tweet_id: &str) -> XifyResult<bool> {
        let span = info_span!(parent: &self.config.span, "xify_delete_tweet", tweet_id);
        async {
            info!("Deleting tweet");
            let deleted = tweet::delete_tweet(self.session()?, tweet_id).await?;
            info!(deleted, "Delete finished");
            Ok::<_, XifyError>(deleted)
        }
        .instrument(span)
        .await
    }
}
