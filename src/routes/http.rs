//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.
//! Errors map to status codes through `CoachError`'s `IntoResponse`.

use std::sync::Arc;
use axum::{extract::{Path, State}, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::SettingsPatch;
use crate::error::CoachError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, CoachError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_scenarios(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(scenarios_out(&state.catalogue))
}

#[instrument(level = "info")]
pub async fn http_get_languages() -> impl IntoResponse { Json(languages_out()) }

#[instrument(level = "info")]
pub async fn http_get_levels() -> impl IntoResponse { Json(levels_out()) }

/// Create a session, apply the optional scenario/language and present the first sentence.
#[instrument(level = "info", skip(state, body))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  body: Option<Json<CreateSessionIn>>,
) -> Result<(StatusCode, Json<SessionOut>), CoachError> {
  let body = body.map(|Json(b)| b).unwrap_or_default();
  let (id, session) = state.create_session().await?;

  let setup = async {
    if let Some(scenario) = &body.scenario {
      switch_scenario(&session, scenario).await?;
    }
    if let Some(language) = &body.language {
      switch_language(&session, language).await;
    }
    next_sentence(&session, state.tts.as_ref(), false).await
  };
  if let Err(e) = setup.await {
    state.end_session(id).await.ok();
    return Err(e);
  }

  let out = snapshot(&session).await;
  info!(target: "session", %id, scenario = %out.scenario, language = %out.language, "HTTP session created");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionOut> {
  let session = state.session(id).await?;
  Ok(Json(snapshot(&session).await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, CoachError> {
  state.end_session(id).await?;
  info!(target: "session", %id, "HTTP session ended");
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_next(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<PresentedOut> {
  let session = state.session(id).await?;
  Ok(Json(next_sentence(&session, state.tts.as_ref(), false).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_simplify(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<PresentedOut> {
  let session = state.session(id).await?;
  Ok(Json(next_sentence(&session, state.tts.as_ref(), true).await?))
}

#[instrument(level = "info", skip(state, body), fields(transcript_len = body.transcript.len()))]
pub async fn http_post_attempt(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AttemptIn>,
) -> ApiResult<AttemptOut> {
  let session = state.session(id).await?;
  let out = submit_attempt(&session, &body.transcript).await?;
  info!(target: "session", %id, score = out.score, level_changed = out.level_changed, "HTTP attempt scored");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(audio_len = body.audio_base64.len(), mime = %body.mime))]
pub async fn http_post_transcribe(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TranscribeIn>,
) -> ApiResult<AttemptOut> {
  let session = state.session(id).await?;
  let clip = decode_audio(&body.audio_base64, &body.mime)?;
  let out = transcribe_attempt(&session, state.asr.as_ref(), clip).await?;
  info!(target: "session", %id, score = out.score, "HTTP recording scored");
  Ok(Json(out))
}

/// Close an open capture without scoring it.
#[instrument(level = "info", skip(state))]
pub async fn http_post_cancel(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult<SessionOut> {
  let session = state.session(id).await?;
  cancel_recording(&session).await?;
  info!(target: "session", %id, "HTTP capture cancelled");
  Ok(Json(snapshot(&session).await))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_speak(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  body: Option<Json<SpeakIn>>,
) -> ApiResult<SpeakOut> {
  let slow = body.and_then(|Json(b)| b.slow);
  let session = state.session(id).await?;
  Ok(Json(play_active(&session, state.tts.as_ref(), slow).await?))
}

#[instrument(level = "info", skip(state, body), fields(language = %body.language))]
pub async fn http_post_language(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LanguageIn>,
) -> ApiResult<SessionOut> {
  let session = state.session(id).await?;
  Ok(Json(switch_language(&session, &body.language).await))
}

#[instrument(level = "info", skip(state, body), fields(scenario = %body.scenario))]
pub async fn http_post_scenario(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScenarioIn>,
) -> ApiResult<SessionOut> {
  let session = state.session(id).await?;
  Ok(Json(start_scenario(&session, state.tts.as_ref(), &body.scenario).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_settings(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<SettingsPatch>,
) -> ApiResult<SettingsOut> {
  let session = state.session(id).await?;
  Ok(Json(update_settings(&session, patch).await))
}
