//! Chunked media upload.
//!
//! An upload walks INIT → APPEND(×N) → FINALIZE and, when the platform
//! processes the asset asynchronously, polls STATUS until it reports a
//! terminal state. Only a failed INIT (or an unreadable file) is an `Err`;
//! everything after it is reported through [`MediaUpload`] so that a media
//! id that never finished is not mistaken for a usable one.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::sanitize_for_logging;
use crate::{Pacer, Session, XifyError, XifyResult};

pub(crate) const MEDIA_UPLOAD_PATH: &str = "/1.1/media/upload.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    TweetImage,
    TweetGif,
    TweetVideo,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::TweetImage => "tweet_image",
            MediaCategory::TweetGif => "tweet_gif",
            MediaCategory::TweetVideo => "tweet_video",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload category and MIME type announced at INIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaAttributes {
    pub category: MediaCategory,
    pub mime: &'static str,
}

/// Derive the upload attributes from the file extension.
///
/// The match is exact and case-sensitive; anything unrecognised is sent as
/// video.
pub fn media_attributes<P: AsRef<Path>>(path: P) -> MediaAttributes {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (category, mime) = match name.rsplit('.').next() {
        Some("png") => (MediaCategory::TweetImage, "image/png"),
        Some("jpeg") | Some("jpg") => (MediaCategory::TweetImage, "image/jpeg"),
        Some("gif") => (MediaCategory::TweetGif, "image/gif"),
        _ => (MediaCategory::TweetVideo, "video/mp4"),
    };
    MediaAttributes { category, mime }
}

/// Consecutive segments of at most `segment_size` bytes, in upload order.
pub fn segments(bytes: &[u8], segment_size: usize) -> std::slice::Chunks<'_, u8> {
    bytes.chunks(segment_size.max(1))
}

pub fn segment_count(total_bytes: usize, segment_size: usize) -> usize {
    total_bytes.div_ceil(segment_size.max(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    New,
    Initiated,
    Appending,
    AppendComplete,
    Finalizing,
    Processing,
    Succeeded,
    Failed,
}

/// Server-side state of one upload, keyed by the media id INIT returned.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub media_id: String,
    pub path: PathBuf,
    pub total_bytes: u64,
    pub attributes: MediaAttributes,
    state: UploadState,
}

impl UploadSession {
    pub fn state(&self) -> UploadState {
        self.state
    }

    fn transition(&mut self, next: UploadState) {
        debug!(media_id = %self.media_id, from = ?self.state, to = ?next, "Upload state changed");
        self.state = next;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessingError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    #[serde(default)]
    pub check_after_secs: Option<u64>,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub error: Option<ProcessingError>,
}

impl ProcessingInfo {
    /// The platform asks for `check_after_secs`; one extra second is added.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.check_after_secs.unwrap_or(0).saturating_add(1))
    }
}

#[derive(Debug, Deserialize)]
struct InitResponse {
    media_id_string: String,
}

#[derive(Debug, Deserialize)]
struct ProcessingResponse {
    #[serde(default)]
    processing_info: Option<ProcessingInfo>,
}

fn parse_processing(body: &str) -> serde_json::Result<Option<ProcessingInfo>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<ProcessingResponse>(body).map(|r| r.processing_info)
}

/// An APPEND segment the platform did not acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFailure {
    pub index: usize,
    pub reason: String,
}

/// How FINALIZE and the STATUS poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Ready,
    /// FINALIZE was refused, unreadable or never reached the platform.
    FinalizeRejected { status: Option<u16>, body: String },
    /// The platform gave up processing the asset.
    ProcessingFailed { error: Option<ProcessingError> },
    /// A STATUS request was refused, unreadable or never reached the platform.
    StatusRejected { status: Option<u16>, body: String },
    TimedOut { waited: Duration },
    Cancelled,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready => write!(f, "ready"),
            Completion::FinalizeRejected { status, body } => {
                write!(f, "FINALIZE failed ({:?}): {}", status, body)
            }
            Completion::ProcessingFailed { error } => {
                let message = error
                    .as_ref()
                    .and_then(|e| e.message.clone().or_else(|| e.name.clone()))
                    .unwrap_or_else(|| "no detail".to_string());
                write!(f, "processing failed: {}", message)
            }
            Completion::StatusRejected { status, body } => {
                write!(f, "STATUS failed ({:?}): {}", status, body)
            }
            Completion::TimedOut { waited } => {
                write!(f, "processing not finished after {}s", waited.as_secs())
            }
            Completion::Cancelled => write!(f, "processing poll cancelled"),
        }
    }
}

/// Result of [`MediaUploader::create_media_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub media_id: String,
    pub total_bytes: u64,
    pub attributes: MediaAttributes,
    pub segment_count: usize,
    pub segment_failures: Vec<SegmentFailure>,
    pub completion: Completion,
}

impl MediaUpload {
    /// Every segment was acknowledged and processing succeeded.
    pub fn is_ready(&self) -> bool {
        self.segment_failures.is_empty() && self.completion == Completion::Ready
    }

    /// The media id, or `UploadIncomplete` describing what went wrong.
    pub fn into_media_id(self) -> XifyResult<String> {
        if self.is_ready() {
            return Ok(self.media_id);
        }

        let mut problems = Vec::new();
        if let Some(first) = self.segment_failures.first() {
            problems.push(format!(
                "{} of {} APPEND segments failed (segment {}: {})",
                self.segment_failures.len(),
                self.segment_count,
                first.index,
                first.reason
            ));
        }
        if self.completion != Completion::Ready {
            problems.push(self.completion.to_string());
        }

        Err(XifyError::UploadIncomplete {
            media_id: self.media_id,
            reason: problems.join("; "),
        })
    }
}

/// Controls for the STATUS poll.
///
/// With the defaults the poll runs until the platform reports a terminal
/// state.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub cancel: CancellationToken,
    /// Give up once the accumulated server-dictated waits would exceed this.
    pub max_wait: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        PollOptions {
            cancel: CancellationToken::new(),
            max_wait: None,
        }
    }
}

impl PollOptions {
    pub fn cancel_token(self, cancel: CancellationToken) -> Self {
        PollOptions { cancel, ..self }
    }

    pub fn max_wait(self, max_wait: Duration) -> Self {
        PollOptions {
            max_wait: Some(max_wait),
            ..self
        }
    }
}

/// Drives uploads through a [`Session`].
#[derive(Debug)]
pub struct MediaUploader<'a> {
    session: &'a Session,
    pacer: &'a dyn Pacer,
    poll: PollOptions,
}

impl<'a> MediaUploader<'a> {
    pub fn new(session: &'a Session, pacer: &'a dyn Pacer) -> Self {
        MediaUploader {
            session,
            pacer,
            poll: PollOptions::default(),
        }
    }

    pub fn poll_options(self, poll: PollOptions) -> Self {
        MediaUploader { poll, ..self }
    }

    fn endpoint(&self) -> String {
        self.session.config().upload_endpoint(MEDIA_UPLOAD_PATH)
    }

    /// INIT, APPEND every segment, FINALIZE and wait for processing.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or INIT does not yield a media id.
    /// Later failures are reported in the returned [`MediaUpload`].
    pub async fn create_media_id<P: AsRef<Path>>(&self, path: P) -> XifyResult<MediaUpload> {
        let path = path.as_ref();
        let span = info_span!(
            parent: &self.session.config().span,
            "upload",
            path = %path.display()
        );

        async move {
            let bytes = tokio::fs::read(path).await?;
            let attributes = media_attributes(path);
            let mut upload = self.init(path, bytes.len() as u64, attributes).await?;

            let segment_failures = self.append(&mut upload, &bytes).await;
            let completion = self.finalize(&mut upload).await;

            if segment_failures.is_empty() && completion == Completion::Ready {
                info!(media_id = %upload.media_id, "Media is ready to attach");
            } else {
                error!(
                    media_id = %upload.media_id,
                    failed_segments = segment_failures.len(),
                    completion = %completion,
                    "Media upload did not complete"
                );
            }

            Ok::<_, XifyError>(MediaUpload {
                media_id: upload.media_id,
                total_bytes: upload.total_bytes,
                attributes,
                segment_count: segment_count(bytes.len(), self.session.config().segment_size),
                segment_failures,
                completion,
            })
        }
        .instrument(span)
        .await
    }

    async fn init(
        &self,
        path: &Path,
        total_bytes: u64,
        attributes: MediaAttributes,
    ) -> XifyResult<UploadSession> {
        info!(
            total_bytes,
            media_type = attributes.mime,
            media_category = %attributes.category,
            "Upload INIT request has started"
        );

        let total = total_bytes.to_string();
        let response = self
            .session
            .client()
            .post(self.endpoint())
            .query(&[
                ("command", "INIT"),
                ("total_bytes", total.as_str()),
                ("media_type", attributes.mime),
                ("media_category", attributes.category.as_str()),
            ])
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "Upload INIT failed");
                err
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(
                status = status.as_u16(),
                body = %sanitize_for_logging(&body, 200),
                "Upload INIT failed"
            );
            return Err(XifyError::UploadInit {
                status: status.as_u16(),
                body,
            });
        }

        let InitResponse { media_id_string } = serde_json::from_str(&body)?;
        info!(media_id = %media_id_string, "Upload INIT request has finished successfully");

        let mut upload = UploadSession {
            media_id: media_id_string,
            path: path.to_path_buf(),
            total_bytes,
            attributes,
            state: UploadState::New,
        };
        upload.transition(UploadState::Initiated);
        Ok(upload)
    }

    /// Send every segment in index order; a failed segment does not stop the
    /// loop.
    async fn append(&self, upload: &mut UploadSession, bytes: &[u8]) -> Vec<SegmentFailure> {
        let config = self.session.config();
        upload.transition(UploadState::Appending);

        let mut failures = Vec::new();
        for (index, segment) in segments(bytes, config.segment_size).enumerate() {
            let segment_index = index.to_string();
            let form = Form::new().part("media", Part::bytes(segment.to_vec()));
            let result = self
                .session
                .client()
                .post(self.endpoint())
                .query(&[
                    ("command", "APPEND"),
                    ("media_id", upload.media_id.as_str()),
                    ("segment_index", segment_index.as_str()),
                ])
                .multipart(form)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!(
                        media_id = %upload.media_id,
                        segment_index = index,
                        bytes = segment.len(),
                        "Upload APPEND segment has finished successfully"
                    );
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!(
                        media_id = %upload.media_id,
                        segment_index = index,
                        status = status.as_u16(),
                        body = %sanitize_for_logging(&body, 200),
                        "Upload APPEND segment failed"
                    );
                    failures.push(SegmentFailure {
                        index,
                        reason: format!("HTTP {}: {}", status.as_u16(), body),
                    });
                }
                Err(err) => {
                    error!(
                        media_id = %upload.media_id,
                        segment_index = index,
                        error = %err,
                        "Upload APPEND segment failed"
                    );
                    failures.push(SegmentFailure {
                        index,
                        reason: err.to_string(),
                    });
                }
            }

            self.pacer.pause(config.append_pace).await;
        }

        upload.transition(UploadState::AppendComplete);
        failures
    }

    async fn finalize(&self, upload: &mut UploadSession) -> Completion {
        upload.transition(UploadState::Finalizing);
        info!(media_id = %upload.media_id, "Upload FINALIZE request has started");

        let response = self
            .session
            .client()
            .post(self.endpoint())
            .query(&[("command", "FINALIZE"), ("media_id", upload.media_id.as_str())])
            .send()
            .await;
        let (status, body) = match response {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => (status, body),
                    Err(err) => (status, err.to_string()),
                }
            }
            Err(err) => {
                error!(media_id = %upload.media_id, error = %err, "Upload FINALIZE failed");
                return settle(
                    upload,
                    Completion::FinalizeRejected {
                        status: None,
                        body: err.to_string(),
                    },
                );
            }
        };

        if !status.is_success() {
            error!(
                media_id = %upload.media_id,
                status = status.as_u16(),
                body = %sanitize_for_logging(&body, 200),
                "Upload FINALIZE failed"
            );
            return settle(
                upload,
                Completion::FinalizeRejected {
                    status: Some(status.as_u16()),
                    body,
                },
            );
        }

        let completion = match parse_processing(&body) {
            Ok(None) => {
                info!(media_id = %upload.media_id, "Upload FINALIZE succeeded without processing");
                Completion::Ready
            }
            Ok(Some(info)) => match info.state {
                ProcessingState::Succeeded => Completion::Ready,
                ProcessingState::Failed => {
                    error!(media_id = %upload.media_id, error = ?info.error, "Media processing failed");
                    Completion::ProcessingFailed { error: info.error }
                }
                ProcessingState::Pending | ProcessingState::InProgress => {
                    upload.transition(UploadState::Processing);
                    self.track_processing(&upload.media_id, Some(info)).await
                }
            },
            Err(err) => {
                error!(media_id = %upload.media_id, error = %err, "Upload FINALIZE response is malformed");
                Completion::FinalizeRejected {
                    status: Some(status.as_u16()),
                    body,
                }
            }
        };

        settle(upload, completion)
    }

    /// Poll STATUS until the platform reports a terminal state.
    pub async fn poll_status(&self, media_id: &str) -> Completion {
        self.track_processing(media_id, None).await
    }

    async fn track_processing(
        &self,
        media_id: &str,
        mut pending: Option<ProcessingInfo>,
    ) -> Completion {
        let mut waited = Duration::ZERO;

        loop {
            if let Some(info) = pending.take() {
                let delay = info.retry_delay();
                info!(
                    media_id,
                    state = ?info.state,
                    progress_percent = ?info.progress_percent,
                    delay_secs = delay.as_secs(),
                    "Media is still processing"
                );

                if let Some(max_wait) = self.poll.max_wait {
                    if waited.saturating_add(delay) > max_wait {
                        warn!(media_id, waited_secs = waited.as_secs(), "Giving up on media processing");
                        return Completion::TimedOut { waited };
                    }
                }

                tokio::select! {
                    biased;
                    _ = self.poll.cancel.cancelled() => {
                        warn!(media_id, "Media processing poll cancelled");
                        return Completion::Cancelled;
                    }
                    _ = self.pacer.pause(delay) => {}
                }
                waited = waited.saturating_add(delay);
            }

            if self.poll.cancel.is_cancelled() {
                warn!(media_id, "Media processing poll cancelled");
                return Completion::Cancelled;
            }

            let info = match self.status(media_id).await {
                Ok(Some(info)) => info,
                Ok(None) => return Completion::Ready,
                Err(completion) => return completion,
            };

            match info.state {
                ProcessingState::Succeeded => {
                    info!(media_id, "Media processing succeeded");
                    return Completion::Ready;
                }
                ProcessingState::Failed => {
                    error!(media_id, error = ?info.error, "Media processing failed");
                    return Completion::ProcessingFailed { error: info.error };
                }
                ProcessingState::Pending | ProcessingState::InProgress => pending = Some(info),
            }
        }
    }

    async fn status(&self, media_id: &str) -> Result<Option<ProcessingInfo>, Completion> {
        let response = self
            .session
            .client()
            .get(self.endpoint())
            .query(&[("command", "STATUS"), ("media_id", media_id)])
            .send()
            .await
            .map_err(|err| {
                error!(media_id, error = %err, "Upload STATUS failed");
                Completion::StatusRejected {
                    status: None,
                    body: err.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(
                media_id,
                status = status.as_u16(),
                body = %sanitize_for_logging(&body, 200),
                "Upload STATUS failed"
            );
            return Err(Completion::StatusRejected {
                status: Some(status.as_u16()),
                body,
            });
        }

        parse_processing(&body).map_err(|err| {
            error!(media_id, error = %err, "Upload STATUS response is malformed");
            Completion::StatusRejected {
                status: Some(status.as_u16()),
                body,
            }
        })
    }
}

fn settle(upload: &mut UploadSession, completion: Completion) -> Completion {
    if completion == Completion::Ready {
        upload.transition(UploadState::Succeeded);
    } else {
        upload.transition(UploadState::Failed);
    }
    completion
}
