//! Minimal OpenAI client for the speech collaborators.
//!
//! We only call `audio/speech` (sentence playback) and `audio/transcriptions`
//! (learner attempts). Calls are instrumented and log model names, latencies and
//! payload sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::domain::SpeechRate;
use crate::error::CoachError;
use crate::speech::{AudioClip, SpeechAudio, SpeechToText, TextToSpeech};

const SLOW_SPEED: f32 = 0.7;
/// Recognition language hint; learners always repeat Romanian.
const TRANSCRIBE_LANGUAGE: &str = "ro";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub tts_model: String,
  pub tts_voice: String,
  pub transcribe_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let tts_model =
      std::env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "gpt-4o-mini-tts".into());
    let tts_voice =
      std::env::var("OPENAI_TTS_VOICE").unwrap_or_else(|_| "alloy".into());
    let transcribe_model =
      std::env::var("OPENAI_TRANSCRIBE_MODEL").unwrap_or_else(|_| "gpt-4o-mini-transcribe".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, tts_model, tts_voice, transcribe_model })
  }

  /// Text → mp3 bytes.
  #[instrument(level = "info", skip_all, fields(model = %self.tts_model, text_len = text.len(), ?rate))]
  async fn synthesize(&self, text: &str, rate: SpeechRate) -> Result<Vec<u8>, String> {
    let url = format!("{}/audio/speech", self.base_url);
    let req = SpeechRequest {
      model: self.tts_model.clone(),
      voice: self.tts_voice.clone(),
      input: text.to_string(),
      response_format: "mp3".into(),
      speed: speed_for(rate),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "coach-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let bytes = res.bytes().await.map_err(|e| e.to_string())?;
    info!(elapsed = ?start.elapsed(), audio_bytes = bytes.len(), "Speech synthesized");
    Ok(bytes.to_vec())
  }

  /// Audio clip → transcript (single shot).
  #[instrument(level = "info", skip(self, clip), fields(model = %self.transcribe_model, audio_bytes = clip.bytes.len(), mime = %clip.mime))]
  async fn transcribe(&self, clip: &AudioClip) -> Result<String, String> {
    let url = format!("{}/audio/transcriptions", self.base_url);
    let file = Part::bytes(clip.bytes.clone())
      .file_name(format!("attempt.{}", clip.file_extension()))
      .mime_str(&clip.mime)
      .map_err(|e| e.to_string())?;
    let form = Form::new()
      .text("model", self.transcribe_model.clone())
      .text("language", TRANSCRIBE_LANGUAGE)
      .text("response_format", "json")
      .part("file", file);

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "coach-backend/0.1")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: TranscriptionResponse = res.json().await.map_err(|e| e.to_string())?;
    info!(elapsed = ?start.elapsed(), transcript_len = body.text.len(), "Transcription received");
    Ok(body.text.trim().to_string())
  }
}

#[async_trait]
impl TextToSpeech for OpenAI {
  async fn speak(&self, text: &str, rate: SpeechRate) -> Result<SpeechAudio, CoachError> {
    match self.synthesize(text, rate).await {
      Ok(bytes) => Ok(SpeechAudio { bytes, mime: "audio/mpeg".into() }),
      Err(e) => {
        error!(target: "speech", error = %e, "OpenAI speech synthesis failed");
        Err(CoachError::TtsUnavailable(e))
      }
    }
  }
}

#[async_trait]
impl SpeechToText for OpenAI {
  async fn listen(&self, clip: &AudioClip) -> Result<String, CoachError> {
    match self.transcribe(clip).await {
      Ok(text) if text.is_empty() => Err(CoachError::AsrError("no speech detected".into())),
      Ok(text) => Ok(text),
      Err(e) => {
        error!(target: "speech", error = %e, "OpenAI transcription failed");
        Err(CoachError::AsrError(e))
      }
    }
  }
}

// --- Audio DTOs ---

#[derive(Serialize)]
struct SpeechRequest {
  model: String,
  voice: String,
  input: String,
  response_format: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  speed: Option<f32>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
  #[serde(default)]
  text: String,
}

/// `speed` request field; normal rate leaves it to the API default.
fn speed_for(rate: SpeechRate) -> Option<f32> {
  match rate {
    SpeechRate::Normal => None,
    SpeechRate::Slow => Some(SLOW_SPEED),
  }
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
