//! Speech collaborators consumed by the session drivers.
//!
//! The core only needs a begin/end around synthesis and a single-shot transcript.
//! Both are optional at runtime: when no provider is configured, `Unavailable`
//! answers every call with the non-fatal error the session expects.

use async_trait::async_trait;

use crate::domain::SpeechRate;
use crate::error::CoachError;

/// Synthesized audio ready to ship to the client.
#[derive(Clone, Debug)]
pub struct SpeechAudio {
  pub bytes: Vec<u8>,
  pub mime: String,
}

/// Recorded learner audio.
#[derive(Clone, Debug)]
pub struct AudioClip {
  pub bytes: Vec<u8>,
  pub mime: String,
}

impl AudioClip {
  /// File extension the transcription endpoints use to sniff the container.
  pub fn file_extension(&self) -> &'static str {
    let mime = self.mime.split(';').next().unwrap_or_default().trim();
    match mime {
      "audio/webm" | "video/webm" => "webm",
      "audio/ogg" | "application/ogg" => "ogg",
      "audio/mpeg" | "audio/mp3" => "mp3",
      "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
      "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
      "audio/flac" => "flac",
      _ => "webm",
    }
  }
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
  /// Fails with `TtsUnavailable`; callers skip playback.
  async fn speak(&self, text: &str, rate: SpeechRate) -> Result<SpeechAudio, CoachError>;
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
  /// Single-shot recognition. Any failure is an `AsrError`; the learner may retry.
  async fn listen(&self, clip: &AudioClip) -> Result<String, CoachError>;
}

/// Stand-in used when no speech provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

#[async_trait]
impl TextToSpeech for Unavailable {
  async fn speak(&self, _text: &str, _rate: SpeechRate) -> Result<SpeechAudio, CoachError> {
    Err(CoachError::TtsUnavailable("no speech provider configured".into()))
  }
}

#[async_trait]
impl SpeechToText for Unavailable {
  async fn listen(&self, _clip: &AudioClip) -> Result<String, CoachError> {
    Err(CoachError::AsrError("no speech recognition provider configured; send a transcript instead".into()))
  }
}
