use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, StatusCode};
use serde::Deserialize;

use crate::formatter::clean_caption_text;
use crate::provider::{
    ProviderError, Segment, TranscriptListing, TranscriptProvider, TranscriptTrack,
};
use crate::video_id::VideoId;

static INNERTUBE_API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";

/// Transcript provider backed by YouTube's watch page and InnerTube player API.
pub struct YoutubeProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YoutubeProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn fetch_api_key(&self, video_id: &VideoId) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id.as_str())])
            .send()
            .await?;
        let html = check_status(response, video_id)?.text().await?;

        if html.contains("g-recaptcha") {
            return Err(ProviderError::Unexpected(format!(
                "YouTube is blocking requests from this IP (video {video_id})"
            )));
        }

        INNERTUBE_API_KEY
            .captures(&html)
            .and_then(|caps| caps.get(1))
            .map(|key| key.as_str().to_string())
            .ok_or_else(|| {
                ProviderError::Unexpected(format!(
                    "could not parse the YouTube page for video {video_id}"
                ))
            })
    }

    async fn fetch_player(
        &self,
        video_id: &VideoId,
        api_key: &str,
    ) -> Result<PlayerResponse, ProviderError> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                }
            },
            "videoId": video_id.as_str(),
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        Ok(check_status(response, video_id)?.json().await?)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeProvider {
    async fn list(&self, video_id: &VideoId) -> Result<TranscriptListing, ProviderError> {
        log::debug!("Listing transcripts for {video_id}");
        let api_key = self.fetch_api_key(video_id).await?;
        let player = self.fetch_player(video_id, &api_key).await?;
        player.into_listing(video_id)
    }

    async fn fetch(&self, track: &TranscriptTrack) -> Result<Vec<Segment>, ProviderError> {
        if track.source.contains("&exp=xpe") {
            return Err(ProviderError::Unexpected(format!(
                "the '{}' transcript requires a proof-of-origin token",
                track.language_code
            )));
        }

        let url = format!("{}&fmt=json3", track.source.replace("&fmt=srv3", ""));
        log::debug!("Fetching '{}' transcript", track.language_code);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Unexpected(format!(
                "transcript download failed with HTTP {}",
                response.status()
            )));
        }

        let timed_text: TimedText = response.json().await?;
        Ok(timed_text.into_segments())
    }
}

fn check_status(
    response: reqwest::Response,
    video_id: &VideoId,
) -> Result<reqwest::Response, ProviderError> {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::Unexpected(format!(
            "YouTube is rate limiting requests (video {video_id})"
        ))),
        status if !status.is_success() => Err(ProviderError::Unexpected(format!(
            "YouTube responded with HTTP {status} for video {video_id}"
        ))),
        _ => Ok(response),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    #[serde(default)]
    runs: Vec<TextRun>,
    simple_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl PlayerResponse {
    fn into_listing(self, video_id: &VideoId) -> Result<TranscriptListing, ProviderError> {
        if let Some(playability) = &self.playability_status {
            playability.check(video_id)?;
        }

        let renderer = self
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .ok_or_else(|| ProviderError::TranscriptsDisabled(video_id.to_string()))?;

        if renderer.caption_tracks.is_empty() {
            return Err(ProviderError::NoTranscriptFound(video_id.to_string()));
        }

        let tracks = renderer
            .caption_tracks
            .into_iter()
            .map(CaptionTrack::into_track)
            .collect();

        Ok(TranscriptListing {
            video_id: video_id.clone(),
            tracks,
        })
    }
}

impl PlayabilityStatus {
    fn check(&self, video_id: &VideoId) -> Result<(), ProviderError> {
        let reason = self.reason.as_deref().unwrap_or_default();
        match self.status.as_deref().unwrap_or("OK") {
            "OK" => Ok(()),
            "LOGIN_REQUIRED" if reason.contains("not a bot") => Err(ProviderError::Unexpected(
                format!("YouTube requested a sign-in challenge for video {video_id}"),
            )),
            "ERROR" | "UNPLAYABLE" | "LOGIN_REQUIRED" => {
                log::debug!("Video {video_id} not playable: {reason}");
                Err(ProviderError::VideoUnavailable(video_id.to_string()))
            }
            other => Err(ProviderError::Unexpected(format!(
                "video {video_id} is not playable ({other}): {reason}"
            ))),
        }
    }
}

impl CaptionTrack {
    fn into_track(self) -> TranscriptTrack {
        let language = self
            .name
            .and_then(|name| {
                name.runs
                    .into_iter()
                    .next()
                    .map(|run| run.text)
                    .or(name.simple_text)
            })
            .unwrap_or_else(|| self.language_code.clone());

        TranscriptTrack {
            language,
            is_generated: self.kind.as_deref() == Some("asr"),
            language_code: self.language_code,
            source: self.base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    segs: Option<Vec<TimedRun>>,
}

#[derive(Debug, Deserialize)]
struct TimedRun {
    #[serde(default)]
    utf8: String,
}

impl TimedText {
    fn into_segments(self) -> Vec<Segment> {
        self.events
            .into_iter()
            .filter_map(|event| {
                let runs = event.segs?;
                let raw: String = runs.iter().map(|run| run.utf8.as_str()).collect();
                Some(Segment {
                    text: clean_caption_text(&raw),
                    start: event.t_start_ms as f64 / 1000.0,
                    duration: event.d_duration_ms as f64 / 1000.0,
                })
            })
            .collect()
    }
}
