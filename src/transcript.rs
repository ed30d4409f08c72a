use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::formatter::join_segments;
use crate::provider::{
    ProviderError, Segment, TrackOrigin, TranscriptListing, TranscriptProvider, TranscriptTrack,
};
use crate::video_id::VideoId;

/// Normalized response for a selected transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptPayload {
    pub video_id: VideoId,
    pub language: String,
    pub items: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectError {
    #[error("Transcripts are disabled for this video.")]
    Disabled,
    #[error("No transcript found for the requested languages.")]
    NoTranscriptFound,
    #[error("The video is unavailable or private.")]
    VideoUnavailable,
    #[error("{0}")]
    Unexpected(String),
}

impl From<ProviderError> for SelectError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::TranscriptsDisabled(_) => SelectError::Disabled,
            ProviderError::NoTranscriptFound(_) => SelectError::NoTranscriptFound,
            ProviderError::VideoUnavailable(_) => SelectError::VideoUnavailable,
            ProviderError::Unexpected(message) => SelectError::Unexpected(message),
        }
    }
}

#[derive(Clone)]
pub struct TranscriptService {
    provider: Arc<dyn TranscriptProvider>,
    timeout: Duration,
}

impl TranscriptService {
    pub fn new(provider: Arc<dyn TranscriptProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Picks the first human-authored track matching `languages`, falling back
    /// to auto-generated tracks in the same order, and fetches its segments.
    pub async fn fetch(
        &self,
        video_id: &VideoId,
        languages: &[String],
        join: bool,
    ) -> Result<TranscriptPayload, SelectError> {
        self.bounded(async {
            let listing = self.provider.list(video_id).await?;
            let track = Self::select_track(&listing, languages)
                .ok_or(SelectError::NoTranscriptFound)?;
            log::info!(
                "Selected {} transcript '{}' for {}",
                if track.is_generated { "generated" } else { "manual" },
                track.language_code,
                listing.video_id
            );

            let items = self.provider.fetch(track).await?;
            let text = join.then(|| join_segments(&items));

            Ok::<_, SelectError>(TranscriptPayload {
                video_id: video_id.clone(),
                language: track.language_code.clone(),
                items,
                text,
            })
        })
        .await
    }

    /// Lists every track the provider advertises for `video_id`.
    pub async fn list(&self, video_id: &VideoId) -> Result<Vec<TranscriptTrack>, SelectError> {
        self.bounded(async {
            let listing = self.provider.list(video_id).await?;
            Ok::<_, SelectError>(listing.tracks)
        })
        .await
    }

    fn select_track<'a>(
        listing: &'a TranscriptListing,
        languages: &[String],
    ) -> Option<&'a TranscriptTrack> {
        [TrackOrigin::Manual, TrackOrigin::Generated]
            .into_iter()
            .find_map(|origin| {
                languages
                    .iter()
                    .find_map(|lang| listing.find(lang, origin))
            })
    }

    async fn bounded<T>(
        &self,
        work: impl Future<Output = Result<T, SelectError>>,
    ) -> Result<T, SelectError> {
        tokio::time::timeout(self.timeout, work)
            .await
            .unwrap_or_else(|_| {
                Err(SelectError::Unexpected(format!(
                    "transcript provider timed out after {}s",
                    self.timeout.as_secs()
                )))
            })
    }
}
