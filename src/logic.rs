//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Each driver locks the session only for state transitions. Speech collaborators
//! are awaited with the lock released; the session phase (Playing / Recording)
//! is what keeps a second request from interleaving.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{error, info, instrument, warn};

use crate::domain::{SettingsPatch, SpeechRate};
use crate::error::CoachError;
use crate::protocol::{
  attempt_out, message_out, session_out, AttemptOut, PresentedOut, SessionOut, SettingsOut, SpeakOut,
};
use crate::session::{Phase, Session};
use crate::speech::{AudioClip, SpeechToText, TextToSpeech};
use crate::state::SharedSession;

/// Present the next sentence (or an easier one) and auto-play it when enabled.
/// A failed auto-play does not fail the turn; it comes back as a notice.
#[instrument(level = "info", skip(session, tts))]
pub async fn next_sentence(session: &SharedSession, tts: &dyn TextToSpeech, easier: bool) -> Result<PresentedOut, CoachError> {
  let (presented, settings, skill) = {
    let mut s = session.lock().await;
    let p = if easier { s.simplify()? } else { s.present_next()? };
    (p, s.settings(), s.skill())
  };

  let mut out = PresentedOut {
    message: message_out(&presented.message, &settings),
    skill: skill.into(),
    audio: None,
    notice: None,
  };
  if let Some(rate) = presented.auto_play {
    match play_active(session, tts, Some(rate == SpeechRate::Slow)).await {
      Ok(audio) => out.audio = Some(audio),
      Err(e) => {
        warn!(target: "speech", error = %e, "Auto-play skipped");
        out.notice = Some(e.to_string());
      }
    }
  }
  Ok(out)
}

/// Returns the session to Idle if a playback or capture is abandoned mid-await,
/// e.g. when an HTTP client disconnects and its handler future is dropped.
struct PhaseGuard {
  session: Option<SharedSession>,
  phase: Phase,
}

impl PhaseGuard {
  fn arm(session: &SharedSession, phase: Phase) -> Self {
    Self { session: Some(session.clone()), phase }
  }

  fn disarm(mut self) {
    self.session = None;
  }
}

impl Drop for PhaseGuard {
  fn drop(&mut self) {
    let Some(session) = self.session.take() else { return };
    let phase = self.phase;
    if let Ok(mut s) = session.try_lock() {
      reset_phase(&mut s, phase);
      return;
    }
    // Someone holds the lock right now; reset once it is free.
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        handle.spawn(async move { reset_phase(&mut *session.lock().await, phase) });
      }
      Err(_) => error!(target: "session", ?phase, "No runtime to reset an abandoned turn phase"),
    }
  }
}

fn reset_phase(s: &mut Session, phase: Phase) {
  if s.phase() != phase {
    return;
  }
  match phase {
    Phase::Playing => s.end_playback(),
    Phase::Recording => {
      let _ = s.cancel_capture();
    }
    Phase::Idle => {}
  }
  warn!(target: "session", session = %s.id(), ?phase, "Abandoned turn reset to idle");
}

/// Synthesize the active sentence. Playback ends even when synthesis fails.
#[instrument(level = "info", skip(session, tts))]
pub async fn play_active(session: &SharedSession, tts: &dyn TextToSpeech, slow: Option<bool>) -> Result<SpeakOut, CoachError> {
  let (text, rate) = session.lock().await.begin_playback(slow)?;
  let guard = PhaseGuard::arm(session, Phase::Playing);
  let result = tts.speak(&text, rate).await;
  session.lock().await.end_playback();
  guard.disarm();

  let audio = result?;
  info!(target: "speech", ?rate, audio_bytes = audio.bytes.len(), "Sentence played");
  Ok(SpeakOut { audio_base64: STANDARD.encode(&audio.bytes), mime: audio.mime, rate })
}

/// Score a transcript produced outside the server (browser recognition).
pub async fn submit_attempt(session: &SharedSession, transcript: &str) -> Result<AttemptOut, CoachError> {
  let mut s = session.lock().await;
  let outcome = s.submit_attempt(transcript)?;
  Ok(attempt_out(&outcome, &s.settings()))
}

/// Server-side capture: open the capture, transcribe without holding the lock, then score.
#[instrument(level = "info", skip(session, asr, clip), fields(audio_bytes = clip.bytes.len(), mime = %clip.mime))]
pub async fn transcribe_attempt(session: &SharedSession, asr: &dyn SpeechToText, clip: AudioClip) -> Result<AttemptOut, CoachError> {
  session.lock().await.begin_capture()?;
  let guard = PhaseGuard::arm(session, Phase::Recording);
  let transcript = asr.listen(&clip).await;

  let mut s = session.lock().await;
  guard.disarm();
  let outcome = s.finish_capture(transcript)?;
  Ok(attempt_out(&outcome, &s.settings()))
}

/// Client-side capture start. The transcript arrives later via `finish_recording`.
pub async fn start_recording(session: &SharedSession) -> Result<(), CoachError> {
  session.lock().await.begin_capture()
}

pub async fn finish_recording(session: &SharedSession, transcript: Result<String, CoachError>) -> Result<AttemptOut, CoachError> {
  let mut s = session.lock().await;
  let outcome = s.finish_capture(transcript)?;
  Ok(attempt_out(&outcome, &s.settings()))
}

pub async fn cancel_recording(session: &SharedSession) -> Result<(), CoachError> {
  session.lock().await.cancel_capture()
}

pub async fn switch_language(session: &SharedSession, language: &str) -> SessionOut {
  let mut s = session.lock().await;
  s.switch_language(language);
  session_out(&s)
}

pub async fn switch_scenario(session: &SharedSession, scenario: &str) -> Result<SessionOut, CoachError> {
  let mut s = session.lock().await;
  s.switch_scenario(scenario)?;
  Ok(session_out(&s))
}

/// Switch scenario and present its first sentence.
pub async fn start_scenario(session: &SharedSession, tts: &dyn TextToSpeech, scenario: &str) -> Result<SessionOut, CoachError> {
  switch_scenario(session, scenario).await?;
  next_sentence(session, tts, false).await?;
  Ok(snapshot(session).await)
}

pub async fn update_settings(session: &SharedSession, patch: SettingsPatch) -> SettingsOut {
  let (settings, goal) = session.lock().await.update_settings(patch);
  SettingsOut { settings, daily_goal: goal.into() }
}

pub async fn snapshot(session: &SharedSession) -> SessionOut {
  session_out(&*session.lock().await)
}

/// Decode a base64 recording from the client.
pub fn decode_audio(audio_base64: &str, mime: &str) -> Result<AudioClip, CoachError> {
  let mime = mime.trim();
  if mime.is_empty() {
    return Err(CoachError::InvalidAudio("missing mime type".into()));
  }
  // Accept data URLs as produced by FileReader.readAsDataURL.
  let payload = match audio_base64.split_once(";base64,") {
    Some((_, data)) => data,
    None => audio_base64,
  };
  let bytes = STANDARD
    .decode(payload.trim())
    .map_err(|e| CoachError::InvalidAudio(format!("bad base64: {e}")))?;
  if bytes.is_empty() {
    return Err(CoachError::InvalidAudio("empty recording".into()));
  }
  Ok(AudioClip { bytes, mime: mime.to_string() })
}
