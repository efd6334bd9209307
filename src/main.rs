//! Romanian pronunciation coach backend
//!
//! - Axum HTTP + WebSocket API around practice sessions
//! - Deterministic local scoring; optional OpenAI speech (TTS + transcription)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   COACH_CONFIG_PATH       : TOML config (session defaults, rng seed, extra content)
//!   OPENAI_API_KEY          : enables OpenAI speech if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_TTS_MODEL        : default "gpt-4o-mini-tts"
//!   OPENAI_TTS_VOICE        : default "alloy"
//!   OPENAI_TRANSCRIBE_MODEL : default "gpt-4o-mini-transcribe"
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod seeds;
mod catalogue;
mod scorer;
mod feedback;
mod tracker;
mod selector;
mod speech;
mod session;
mod openai;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalogue, session registry and speech providers. A bad catalogue stops startup.
  let state = match AppState::from_env() {
    Ok(s) => Arc::new(s),
    Err(e) => {
      error!(target: "coach_backend", error = %e, fatal = e.is_fatal(), "Startup failed");
      return Err(e.into());
    }
  };

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "coach_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "coach_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "coach_backend", error = %e, "Could not listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "coach_backend", "Shutdown requested");
}
