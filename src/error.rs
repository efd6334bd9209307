//! Error taxonomy shared by the core engine and the service shell.
//!
//! Three families:
//!   - configuration defects (fatal; the service refuses to start or the turn cannot proceed)
//!   - caller sequencing errors (recoverable by issuing the right call next)
//!   - collaborator failures from TTS/ASR (transient, surfaced as a notice, never retried here)

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoachError {
  #[error("scenario '{scenario}' has no sentence at any eligible level")]
  EmptyCatalogue { scenario: String },
  #[error("invalid catalogue: {0}")]
  InvalidCatalogue(String),
  #[error("configuration error: {0}")]
  Config(String),

  #[error("no sentence has been presented yet")]
  NoActiveSentence,
  #[error("a recording is already in progress")]
  AlreadyRecording,
  #[error("audio playback is in progress")]
  PlaybackActive,
  #[error("no recording is in progress")]
  NotRecording,
  #[error("unknown scenario: {0}")]
  UnknownScenario(String),
  #[error("unknown session: {0}")]
  UnknownSession(String),
  #[error("invalid audio payload: {0}")]
  InvalidAudio(String),

  #[error("text-to-speech unavailable: {0}")]
  TtsUnavailable(String),
  #[error("speech recognition failed: {0}")]
  AsrError(String),
}

impl CoachError {
  /// Configuration defects that valid data never produces.
  pub fn is_fatal(&self) -> bool {
    matches!(
      self,
      CoachError::EmptyCatalogue { .. } | CoachError::InvalidCatalogue(_) | CoachError::Config(_)
    )
  }

  /// Collaborator failures: shown to the learner as a notice, retry is user-initiated.
  pub fn is_transient(&self) -> bool {
    matches!(self, CoachError::TtsUnavailable(_) | CoachError::AsrError(_))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      CoachError::NoActiveSentence
      | CoachError::AlreadyRecording
      | CoachError::PlaybackActive
      | CoachError::NotRecording => StatusCode::CONFLICT,
      CoachError::UnknownScenario(_) | CoachError::InvalidAudio(_) => StatusCode::BAD_REQUEST,
      CoachError::UnknownSession(_) => StatusCode::NOT_FOUND,
      CoachError::TtsUnavailable(_) | CoachError::AsrError(_) => StatusCode::SERVICE_UNAVAILABLE,
      CoachError::EmptyCatalogue { .. } | CoachError::InvalidCatalogue(_) | CoachError::Config(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub message: String,
  pub transient: bool,
}

impl IntoResponse for CoachError {
  fn into_response(self) -> Response {
    if self.is_fatal() {
      error!(target: "coach_backend", error = %self, "Fatal configuration error while serving request");
    }
    let body = ErrorOut { message: self.to_string(), transient: self.is_transient() };
    (self.status(), Json(body)).into_response()
  }
}
