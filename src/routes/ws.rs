//! WebSocket upgrade + message loop. Each connection owns one practice session.
//! Client messages are parsed as JSON and forwarded to core logic; we reply with
//! a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::Mutex;
use tracing::{info, error, instrument, debug};

use crate::error::CoachError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::{AppState, SharedSession};

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "coach_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let session: SharedSession = match state.connection_session() {
    Ok(s) => Arc::new(Mutex::new(s)),
    Err(e) => {
      error!(target: "coach_backend", error = %e, "Could not start a session for the connection");
      let _ = send(&mut socket, &error_reply(e)).await;
      return;
    }
  };
  let id = session.lock().await.id();
  info!(target: "coach_backend", session = %id, "WebSocket connected");

  // Greet with the first sentence already presented.
  let hello = match next_sentence(&session, state.tts.as_ref(), false).await {
    Ok(_) => ServerWsMessage::Session { session: snapshot(&session).await },
    Err(e) => error_reply(e),
  };
  if send(&mut socket, &hello).await.is_err() {
    return;
  }

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "coach_backend", session = %id, "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &session, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), transient: false },
        };

        if let Err(e) = send(&mut socket, &reply_msg).await {
          error!(target: "coach_backend", session = %id, error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "coach_backend", session = %id, "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e), "transient": false }).to_string()
  });
  socket.send(Message::Text(out)).await
}

fn error_reply(e: CoachError) -> ServerWsMessage {
  ServerWsMessage::Error { transient: e.is_transient(), message: e.to_string() }
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, session: &SharedSession, state: &AppState) -> ServerWsMessage {
  let reply = match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::GetSession => Ok(ServerWsMessage::Session { session: snapshot(session).await }),

    ClientWsMessage::Next => next_sentence(session, state.tts.as_ref(), false)
      .await
      .map(ServerWsMessage::Presented),

    ClientWsMessage::Simplify => next_sentence(session, state.tts.as_ref(), true)
      .await
      .map(ServerWsMessage::Presented),

    ClientWsMessage::SubmitAttempt { transcript } => submit_attempt(session, &transcript)
      .await
      .map(ServerWsMessage::AttemptResult),

    ClientWsMessage::StartRecording => start_recording(session).await.map(|_| ServerWsMessage::RecordingStarted),

    ClientWsMessage::RecordingResult { transcript } => finish_recording(session, Ok(transcript))
      .await
      .map(ServerWsMessage::AttemptResult),

    ClientWsMessage::RecordingFailed { message } => finish_recording(session, Err(CoachError::AsrError(message)))
      .await
      .map(ServerWsMessage::AttemptResult),

    ClientWsMessage::CancelRecording => cancel_recording(session).await.map(|_| ServerWsMessage::RecordingCancelled),

    ClientWsMessage::TranscribeAudio { audio_base64, mime } => match decode_audio(&audio_base64, &mime) {
      Ok(clip) => transcribe_attempt(session, state.asr.as_ref(), clip)
        .await
        .map(ServerWsMessage::AttemptResult),
      Err(e) => Err(e),
    },

    ClientWsMessage::Speak { slow } => play_active(session, state.tts.as_ref(), slow)
      .await
      .map(ServerWsMessage::Audio),

    ClientWsMessage::SetLanguage { language } => {
      Ok(ServerWsMessage::Session { session: switch_language(session, &language).await })
    }

    ClientWsMessage::SetScenario { scenario } => start_scenario(session, state.tts.as_ref(), &scenario)
      .await
      .map(|session| ServerWsMessage::Session { session }),

    ClientWsMessage::SaveSettings(patch) => Ok(ServerWsMessage::Settings(update_settings(session, patch).await)),
  };

  reply.unwrap_or_else(|e| {
    debug!(target: "coach_backend", error = %e, transient = e.is_transient(), "WS request rejected");
    error_reply(e)
  })
}
