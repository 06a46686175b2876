use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use voice_relay::audio::{AudioCapture, CaptureFormat, CpalMicrophone};
use voice_relay::stream::{CannedProvider, GeminiProvider, TokenProvider};
use voice_relay::transcript::{ChatMessage, JsonFileStore, TranscriptStore};
use voice_relay::{create_router, normalize, AppState, Config, RelayClient, StreamRelay};

#[derive(Debug, Parser)]
#[command(name = "voice-relay", about = "Voice capture/relay/stream gateway")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/voice-relay")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP/SSE gateway (default)
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Record from the microphone, relay the result, and log the exchange
    Record {
        /// Recording duration in seconds
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::Serve {
        bind: None,
        port: None,
    }) {
        Command::Serve { bind, port } => serve(cfg, bind, port).await,
        Command::Record { seconds } => record(cfg, seconds).await,
    }
}

async fn serve(cfg: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| cfg.service.http.bind.clone());
    let port = port.unwrap_or(cfg.service.http.port);

    info!("Agent webhook: {}", cfg.relay.webhook_url);

    let provider: Arc<dyn TokenProvider> = match cfg.stream.provider.as_str() {
        "canned" => {
            info!("Using canned generation provider");
            Arc::new(CannedProvider::default())
        }
        _ => {
            info!("Using Gemini provider (model: {})", cfg.stream.model);
            Arc::new(GeminiProvider::new(
                cfg.stream.model.clone(),
                cfg.stream_api_key(),
            ))
        }
    };

    let state = AppState::new(
        RelayClient::new(cfg.relay.webhook_url.clone()),
        StreamRelay::new(provider),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// One full pass of the voice pipeline: capture, relay, normalize, append to
/// the transcript.
async fn record(cfg: Config, seconds: u64) -> Result<()> {
    let format = CaptureFormat {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
    };
    let mut capture = AudioCapture::new(Box::new(CpalMicrophone::new(format)));

    info!("Recording for {}s...", seconds);
    capture.start().await.context("Failed to start recording")?;
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let artifact = capture.stop().await.context("Failed to stop recording")?;

    if artifact.is_empty() {
        info!("No audio captured; nothing to relay");
        return Ok(());
    }

    let transcript = JsonFileStore::open(&cfg.audio.transcript_path)?;
    transcript.append(ChatMessage::user("[voice message]"))?;

    let client = RelayClient::new(cfg.relay.webhook_url.clone());
    match client.send(&artifact).await {
        Ok(reply) => {
            let text = normalize(&reply);
            info!("Agent reply: {}", text);
            transcript.append(ChatMessage::bot(text))?;
        }
        Err(e) => {
            // Surface the failure in the transcript rather than exiting
            let message = format!("[Error: {}]", e);
            info!("Relay failed: {}", e);
            transcript.append(ChatMessage::bot(message))?;
        }
    }

    Ok(())
}
