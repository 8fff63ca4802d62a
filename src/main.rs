use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use vocalis_relay::{create_router, AppState, Config};

/// Realtime transcription relay server.
#[derive(Debug, Parser)]
#[command(name = "vocalis-relay", version)]
struct Args {
    /// Config file path (without extension), config-crate style.
    #[arg(long, default_value = "config/vocalis-relay")]
    config: String,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config '{}'", args.config))?;

    // Server-held upstream credential; read once, never sent to clients.
    let api_key = std::env::var("DEEPGRAM_API_KEY")
        .context("DEEPGRAM_API_KEY must be set for the upstream recognizer")?;

    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", cfg.service.http.bind, port);

    info!("{} starting", cfg.service.name);
    info!(upstream = %cfg.upstream.url, model = %cfg.upstream.model, "upstream recognizer configured");

    let state = AppState::new(cfg.upstream.clone(), api_key);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service())
        .await
        .context("server exited")?;
    Ok(())
}
