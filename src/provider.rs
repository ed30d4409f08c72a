use async_trait::async_trait;
use serde::Serialize;

use crate::video_id::VideoId;

/// One timed caption unit. `start` and `duration` are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A caption track advertised for a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptTrack {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    /// Provider-private handle used to download the track.
    #[serde(skip)]
    pub source: String,
}

/// Which kind of track a lookup should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOrigin {
    Manual,
    Generated,
}

impl TrackOrigin {
    fn matches(self, track: &TranscriptTrack) -> bool {
        match self {
            TrackOrigin::Manual => !track.is_generated,
            TrackOrigin::Generated => track.is_generated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptListing {
    pub video_id: VideoId,
    pub tracks: Vec<TranscriptTrack>,
}

impl TranscriptListing {
    /// Looks up the track for one exact language code. `None` means "try the
    /// next language", never a failure.
    pub fn find(&self, language_code: &str, origin: TrackOrigin) -> Option<&TranscriptTrack> {
        self.tracks
            .iter()
            .find(|track| origin.matches(track) && track.language_code == language_code)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),
    #[error("No transcript found for video {0}")]
    NoTranscriptFound(String),
    #[error("Video {0} is unavailable")]
    VideoUnavailable(String),
    #[error("{0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs can carry the InnerTube API key.
        ProviderError::Unexpected(err.without_url().to_string())
    }
}

/// Source of transcript listings and segments.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn list(&self, video_id: &VideoId) -> Result<TranscriptListing, ProviderError>;

    async fn fetch(&self, track: &TranscriptTrack) -> Result<Vec<Segment>, ProviderError>;
}
