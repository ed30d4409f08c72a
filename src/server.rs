use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{parse_join, parse_langs};
use crate::provider::TranscriptTrack;
use crate::transcript::{SelectError, TranscriptPayload, TranscriptService};
use crate::video_id::{InvalidVideoId, VideoId};

#[derive(Clone)]
pub struct AppState {
    pub transcripts: TranscriptService,
    pub default_langs: Vec<String>,
    pub default_join: bool,
}

/// Raw query pairs. A repeated parameter keeps its first value.
#[derive(Debug)]
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(
        query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    ) -> Result<Self, ApiError> {
        let Query(pairs) =
            query.map_err(|rejection| ApiError::BadQuery(rejection.body_text()))?;
        Ok(Self(pairs))
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Serialize)]
struct ListResponse {
    video_id: VideoId,
    available: Vec<TranscriptTrack>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadQuery(String),
    InvalidInput(InvalidVideoId),
    Select(SelectError),
}

impl From<InvalidVideoId> for ApiError {
    fn from(err: InvalidVideoId) -> Self {
        ApiError::InvalidInput(err)
    }
}

impl From<SelectError> for ApiError {
    fn from(err: SelectError) -> Self {
        ApiError::Select(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadQuery(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Select(SelectError::Disabled) => StatusCode::FORBIDDEN,
            ApiError::Select(SelectError::NoTranscriptFound)
            | ApiError::Select(SelectError::VideoUnavailable) => StatusCode::NOT_FOUND,
            ApiError::Select(SelectError::Unexpected(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadQuery(message) => message.clone(),
            ApiError::InvalidInput(err) => err.to_string(),
            ApiError::Select(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            log::error!("Transcript request failed: {message}");
        } else {
            log::warn!("Transcript request rejected ({status}): {message}");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/transcript", get(transcript))
        .route("/list", get(list))
        .with_state(state)
        .layer(cors)
}

async fn root() -> &'static str {
    "YouTube transcript gateway is running"
}

fn resolve(url: Option<&str>) -> Result<VideoId, ApiError> {
    Ok(VideoId::resolve(url.unwrap_or_default())?)
}

async fn transcript(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<TranscriptPayload>, ApiError> {
    let params = QueryParams::parse(query)?;
    let video_id = resolve(params.first("url"))?;

    let langs = params
        .first("langs")
        .map(parse_langs)
        .filter(|langs| !langs.is_empty())
        .unwrap_or_else(|| state.default_langs.clone());
    let join = params
        .first("join")
        .map(parse_join)
        .unwrap_or(state.default_join);

    log::debug!("Transcript request for {video_id} (langs: {langs:?}, join: {join})");

    let payload = state.transcripts.fetch(&video_id, &langs, join).await?;
    Ok(Json(payload))
}

async fn list(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let params = QueryParams::parse(query)?;
    let video_id = resolve(params.first("url"))?;
    log::debug!("Listing request for {video_id}");

    let available = state.transcripts.list(&video_id).await?;
    Ok(Json(ListResponse {
        video_id,
        available,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::{seg, StubProvider};
    use crate::provider::ProviderError;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    async fn spawn(provider: StubProvider) -> SocketAddr {
        let state = AppState {
            transcripts: TranscriptService::new(Arc::new(provider), Duration::from_secs(5)),
            default_langs: vec!["en".to_string()],
            default_join: false,
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });
        addr
    }

    async fn get_json(addr: SocketAddr, path: &str) -> (StatusCode, serde_json::Value) {
        let response = reqwest::get(format!("http://{addr}{path}"))
            .await
            .expect("request");
        let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
        let body = response.json().await.expect("json body");
        (status, body)
    }

    fn english() -> StubProvider {
        StubProvider::new().with_track("en", false, vec![seg("Hi", 0.0, 1.0)])
    }

    #[tokio::test]
    async fn test_transcript_happy_path() {
        let addr = spawn(english()).await;

        let (status, body) = get_json(
            addr,
            "/transcript?url=https://youtu.be/dQw4w9WgXcQ&langs=en&join=true",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "video_id": "dQw4w9WgXcQ",
                "language": "en",
                "items": [{ "text": "Hi", "start": 0.0, "duration": 1.0 }],
                "text": "Hi"
            })
        );
    }

    #[tokio::test]
    async fn test_text_omitted_unless_join_is_true() {
        let addr = spawn(english()).await;

        for query in ["", "&join=false", "&join=1", "&join=yes"] {
            let (status, body) =
                get_json(addr, &format!("/transcript?url=dQw4w9WgXcQ{query}")).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.get("text").is_none(), "{query}");
        }

        let (_, body) = get_json(addr, "/transcript?url=dQw4w9WgXcQ&join=TRUE").await;
        assert_eq!(body["text"], "Hi");
    }

    #[tokio::test]
    async fn test_langs_default_when_blank() {
        let addr = spawn(english()).await;

        let (status, body) = get_json(addr, "/transcript?url=dQw4w9WgXcQ&langs=,,").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "en");
    }

    #[tokio::test]
    async fn test_langs_order_is_respected() {
        let addr = spawn(
            StubProvider::new()
                .with_track("en", true, vec![seg("Hello", 0.0, 1.0)])
                .with_track("fr", false, vec![seg("Bonjour", 0.0, 1.0)]),
        )
        .await;

        let (status, body) =
            get_json(addr, "/transcript?url=dQw4w9WgXcQ&langs=en,fr").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "fr");
        assert_eq!(body["items"][0]["text"], "Bonjour");
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let addr = spawn(english()).await;

        let (status, body) = get_json(addr, "/transcript?url=bad").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Invalid YouTube URL or ID." }));

        let (status, _) = get_json(addr, "/transcript").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_repeated_parameter_keeps_first_value() {
        let addr = spawn(english()).await;

        let (status, body) = get_json(
            addr,
            "/transcript?url=dQw4w9WgXcQ&url=dQw4w9WgXcQ&langs=en&langs=ar",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "en");

        let (status, body) = get_json(addr, "/transcript?url=bad&url=dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Invalid YouTube URL or ID." }));

        let (status, body) = get_json(addr, "/list?url=dQw4w9WgXcQ&url=other").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["video_id"], "dQw4w9WgXcQ");
    }

    #[test]
    fn test_bad_query_renders_json_error() {
        let response =
            ApiError::BadQuery("Failed to deserialize query string".into()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let cases = [
            (
                ProviderError::TranscriptsDisabled("x".into()),
                StatusCode::FORBIDDEN,
                "Transcripts are disabled for this video.",
            ),
            (
                ProviderError::NoTranscriptFound("x".into()),
                StatusCode::NOT_FOUND,
                "No transcript found for the requested languages.",
            ),
            (
                ProviderError::VideoUnavailable("x".into()),
                StatusCode::NOT_FOUND,
                "The video is unavailable or private.",
            ),
            (
                ProviderError::Unexpected("upstream exploded".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream exploded",
            ),
        ];

        for (provider_err, expected_status, expected_message) in cases {
            let addr = spawn(english().failing_list(provider_err)).await;
            let (status, body) = get_json(addr, "/transcript?url=dQw4w9WgXcQ").await;
            assert_eq!(status, expected_status);
            assert_eq!(body["error"], expected_message);
        }
    }

    #[tokio::test]
    async fn test_no_matching_language_is_404() {
        let addr = spawn(english()).await;

        let (status, body) = get_json(addr, "/transcript?url=dQw4w9WgXcQ&langs=ar").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No transcript found for the requested languages.");
    }

    #[tokio::test]
    async fn test_list_endpoint() {
        let addr = spawn(
            StubProvider::new()
                .with_track("en", true, vec![])
                .with_track("fr", false, vec![]),
        )
        .await;

        let (status, body) =
            get_json(addr, "/list?url=https://www.youtube.com/watch?v=dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "video_id": "dQw4w9WgXcQ",
                "available": [
                    { "language": "EN", "language_code": "en", "is_generated": true },
                    { "language": "FR", "language_code": "fr", "is_generated": false }
                ]
            })
        );

        let (status, _) = get_json(addr, "/list?url=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_root_and_cors() {
        let addr = spawn(english()).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .header("Origin", "https://example.com")
            .send()
            .await
            .expect("request");

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        assert_eq!(
            response.text().await.expect("body"),
            "YouTube transcript gateway is running"
        );
    }
}
