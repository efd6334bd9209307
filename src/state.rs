//! Application state: the content catalogue, session registry and speech collaborators.
//!
//! This module owns:
//!   - the validated sentence catalogue (shared, immutable)
//!   - session defaults and the optional RNG seed (from TOML or defaults)
//!   - in-memory sessions, each behind its own lock, capped with LRU eviction
//!   - the text-to-speech / speech-to-text providers (OpenAI or `Unavailable`)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::catalogue::Catalogue;
use crate::config::{load_app_config_from_env, AppConfig, SessionDefaults};
use crate::error::CoachError;
use crate::openai::OpenAI;
use crate::seeds::seed_catalogue;
use crate::session::Session;
use crate::speech::{SpeechToText, TextToSpeech, Unavailable};

pub type SharedSession = Arc<Mutex<Session>>;

pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct Registered {
  session: SharedSession,
  /// Logical clock value of the last lookup; lowest is evicted first.
  touched: u64,
}

#[derive(Clone)]
pub struct AppState {
  pub catalogue: Arc<Catalogue>,
  pub defaults: SessionDefaults,
  pub rng_seed: Option<u64>,
  pub tts: Arc<dyn TextToSpeech>,
  pub asr: Arc<dyn SpeechToText>,
  /// HTTP sessions only; WebSocket sessions live with their connection.
  /// Never holds more than `max_sessions` entries.
  sessions: Arc<RwLock<HashMap<Uuid, Registered>>>,
  max_sessions: usize,
  clock: Arc<AtomicU64>,
  sessions_created: Arc<AtomicU64>,
}

impl AppState {
  /// Build state from env: load config, build + validate the catalogue, init speech providers.
  /// An invalid catalogue is fatal.
  #[instrument(level = "info", skip_all)]
  pub fn from_env() -> Result<Self, CoachError> {
    let cfg = load_app_config_from_env().unwrap_or_default();

    let openai = OpenAI::from_env();
    let (tts, asr): (Arc<dyn TextToSpeech>, Arc<dyn SpeechToText>) = match openai {
      Some(oa) => {
        info!(target: "coach_backend", base_url = %oa.base_url, tts_model = %oa.tts_model, tts_voice = %oa.tts_voice, transcribe_model = %oa.transcribe_model, "OpenAI speech enabled.");
        let oa = Arc::new(oa);
        (oa.clone() as Arc<dyn TextToSpeech>, oa as Arc<dyn SpeechToText>)
      }
      None => {
        info!(target: "coach_backend", "OpenAI disabled (no OPENAI_API_KEY). Playback skipped; attempts need client-side transcripts.");
        (Arc::new(Unavailable) as Arc<dyn TextToSpeech>, Arc::new(Unavailable) as Arc<dyn SpeechToText>)
      }
    };

    Self::new(cfg, tts, asr)
  }

  pub fn new(cfg: AppConfig, tts: Arc<dyn TextToSpeech>, asr: Arc<dyn SpeechToText>) -> Result<Self, CoachError> {
    let catalogue = Catalogue::build(seed_catalogue()?, &cfg.scenarios, &cfg.sentences)?;
    if let Some(id) = &cfg.session.scenario {
      if !catalogue.contains_scenario(id) {
        return Err(CoachError::Config(format!("default scenario '{id}' is not in the catalogue")));
      }
    }
    if let Some(seed) = cfg.rng_seed {
      info!(target: "coach_backend", seed, "Sentence selection is seeded");
    }
    let max_sessions = match cfg.max_sessions {
      Some(0) => return Err(CoachError::Config("max_sessions must be at least 1".into())),
      Some(n) => n,
      None => DEFAULT_MAX_SESSIONS,
    };

    Ok(Self {
      catalogue: Arc::new(catalogue),
      defaults: cfg.session,
      rng_seed: cfg.rng_seed,
      tts,
      asr,
      sessions: Arc::new(RwLock::new(HashMap::new())),
      max_sessions,
      clock: Arc::new(AtomicU64::new(0)),
      sessions_created: Arc::new(AtomicU64::new(0)),
    })
  }

  /// Create and register a session. With a configured seed every session gets a
  /// distinct but reproducible sequence. At the cap, the least recently used
  /// session is dropped first.
  #[instrument(level = "info", skip(self))]
  pub async fn create_session(&self) -> Result<(Uuid, SharedSession), CoachError> {
    let session = self.new_session()?;
    let id = session.id();
    let shared = Arc::new(Mutex::new(session));

    let mut sessions = self.sessions.write().await;
    while sessions.len() >= self.max_sessions {
      let Some(oldest) = sessions.iter().min_by_key(|(_, r)| r.touched).map(|(k, _)| *k) else { break };
      sessions.remove(&oldest);
      info!(target: "session", evicted = %oldest, cap = self.max_sessions, "Least recently used session evicted");
    }
    sessions.insert(id, Registered { session: shared.clone(), touched: self.tick() });
    Ok((id, shared))
  }

  /// Standalone session for a WebSocket connection (not registered).
  pub fn connection_session(&self) -> Result<Session, CoachError> {
    self.new_session()
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn session(&self, id: Uuid) -> Result<SharedSession, CoachError> {
    let mut sessions = self.sessions.write().await;
    let entry = sessions.get_mut(&id).ok_or_else(|| CoachError::UnknownSession(id.to_string()))?;
    entry.touched = self.tick();
    Ok(entry.session.clone())
  }

  #[instrument(level = "info", skip(self))]
  pub async fn end_session(&self, id: Uuid) -> Result<(), CoachError> {
    self
      .sessions
      .write()
      .await
      .remove(&id)
      .map(|_| ())
      .ok_or_else(|| CoachError::UnknownSession(id.to_string()))
  }

  fn new_session(&self) -> Result<Session, CoachError> {
    let n = self.sessions_created.fetch_add(1, Ordering::Relaxed);
    Session::new(self.catalogue.clone(), &self.defaults, self.rng_seed.map(|s| s.wrapping_add(n)))
  }

  fn tick(&self) -> u64 {
    self.clock.fetch_add(1, Ordering::Relaxed)
  }
}
