//! Loading service configuration (session defaults + optional extra content) from TOML.
//!
//! See `AppConfig`, `SessionDefaults` and `SentenceCfg` for the expected schema.
//!
//! ```toml
//! rng_seed = 42
//!
//! [session]
//! skill_score = 45
//! language = "he"
//!
//! [[sentences]]
//! scenario = "bank"
//! level = 0
//! ro = "Vreau să deschid un cont."
//! context = "request"
//! [sentences.translations]
//! en = "I want to open an account."
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::{DailyGoal, Level, Settings, SkillState};
use crate::error::CoachError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub session: SessionDefaults,
  /// Fixes the sentence selection sequence (useful for demos and reproducible runs).
  #[serde(default)]
  pub rng_seed: Option<u64>,
  /// Cap on registered HTTP sessions; the least recently used one is evicted at the cap.
  #[serde(default)]
  pub max_sessions: Option<usize>,
  #[serde(default)]
  pub scenarios: Vec<ScenarioCfg>,
  #[serde(default)]
  pub sentences: Vec<SentenceCfg>,
}

/// Starting point of every new session.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
  pub skill_score: u8,
  pub level: u8,
  pub streak_days: u32,
  pub daily_goal_completed: u32,
  pub daily_goal_target: u32,
  pub language: String,
  /// Defaults to the first scenario of the menu.
  pub scenario: Option<String>,
  pub settings: Settings,
}

impl Default for SessionDefaults {
  fn default() -> Self {
    Self {
      skill_score: 45,
      level: 0,
      streak_days: 3,
      daily_goal_completed: 12,
      daily_goal_target: 15,
      language: "en".into(),
      scenario: None,
      settings: Settings::default(),
    }
  }
}

impl SessionDefaults {
  pub fn skill_state(&self) -> SkillState {
    SkillState {
      skill_score: self.skill_score,
      level: Level::new(self.level),
      streak_days: self.streak_days,
      daily_goal: DailyGoal { completed: self.daily_goal_completed, target: self.daily_goal_target },
    }
  }
}

/// Scenario menu entry accepted in TOML.
#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioCfg {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub icon: String,
}

/// Sentence entry accepted in TOML. `level` is validated (0..=5) when the catalogue is built.
#[derive(Clone, Debug, Deserialize)]
pub struct SentenceCfg {
  pub scenario: String,
  pub level: u8,
  pub ro: String,
  #[serde(default)]
  pub context: String,
  pub translations: BTreeMap<String, String>,
}

/// Content file layout (built-in catalogue and optional extras share it).
#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogueCfg {
  #[serde(default)]
  pub scenarios: Vec<ScenarioCfg>,
  #[serde(default)]
  pub sentences: Vec<SentenceCfg>,
}

pub fn parse_app_config(raw: &str) -> Result<AppConfig, CoachError> {
  toml::from_str::<AppConfig>(raw).map_err(|e| CoachError::Config(e.to_string()))
}

/// Attempt to load `AppConfig` from COACH_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("COACH_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "coach_backend", %path, extra_sentences = cfg.sentences.len(), "Loaded coach config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "coach_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "coach_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
