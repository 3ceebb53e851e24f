//! Voicebot server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use voicebot_config::{load_settings, DialogScript, Settings};
use voicebot_server::{create_router, AppState};
use voicebot_speech::{SarvamClient, SarvamConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env = std::env::var("VOICEBOT_ENV").ok();
    let settings = load_settings(env.as_deref())?;

    init_tracing(&settings);
    tracing::info!("Starting voicebot server v{}", env!("CARGO_PKG_VERSION"));

    let script = DialogScript::load_or_default(&settings.script_path);

    if settings.speech.api_key.is_empty() {
        tracing::warn!("No speech API key configured; STT/TTS calls will fail soft");
    }
    let speech = SarvamClient::new(SarvamConfig {
        base_url: settings.speech.base_url.clone(),
        api_key: settings.speech.api_key.clone(),
        stt_model: settings.speech.stt_model.clone(),
        tts_model: settings.speech.tts_model.clone(),
        tts_speaker: settings.speech.tts_speaker.clone(),
        timeout: Duration::from_secs(settings.speech.timeout_seconds),
    })?;

    let state = AppState::new(settings.clone(), script, Arc::new(speech));
    let _cleanup = state.sessions.start_cleanup_task();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!(%addr, ws_path = %settings.server.ws_path, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}

/// Initialize tracing from settings; RUST_LOG wins when set
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.observability.log_level.clone().into());

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
