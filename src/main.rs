mod config;
mod formatter;
mod provider;
mod server;
mod transcript;
mod video_id;
mod youtube;

use std::net::SocketAddr;
use std::sync::Arc;

use config::Config;
use server::AppState;
use tokio::net::TcpListener;
use transcript::TranscriptService;
use youtube::YoutubeProvider;

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    log::info!("Launching transcript gateway...");

    if let Err(err) = run().await {
        log::error!("transcript gateway failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> MainResult {
    let config = Config::from_env()?;

    let provider = YoutubeProvider::new(config.youtube_base_url.clone(), config.provider_timeout)?;
    let state = AppState {
        transcripts: TranscriptService::new(Arc::new(provider), config.provider_timeout),
        default_langs: config.default_langs.clone(),
        default_join: config.default_join,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    log::info!(
        "Listening on {addr} (default langs: {}, join: {})",
        config.default_langs.join(","),
        config.default_join
    );

    axum::serve(listener, server::router(state)).await?;
    Ok(())
}
