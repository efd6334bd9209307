//! Domain models: levels, sentences, chat messages, skill state and per-session settings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language every sentence must carry a translation for.
pub const FALLBACK_LANGUAGE: &str = "en";

/// CEFR-like difficulty band, 0 (A0-A1) through 5 (C1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(u8);

impl Level {
  pub const MIN: Level = Level(0);
  pub const MAX: Level = Level(5);

  /// Clamps into 0..=5.
  pub fn new(raw: u8) -> Self {
    Level(raw.min(Self::MAX.0))
  }

  pub fn get(self) -> u8 {
    self.0
  }

  pub fn up(self) -> Self {
    Level::new(self.0.saturating_add(1))
  }

  pub fn down(self) -> Self {
    Level(self.0.saturating_sub(1))
  }

  pub fn label(self) -> &'static str {
    match self.0 {
      0 => "A0-A1",
      1 => "A1",
      2 => "A2",
      3 => "B1",
      4 => "B2",
      _ => "C1",
    }
  }

  pub fn all() -> impl Iterator<Item = Level> {
    (Self::MIN.0..=Self::MAX.0).map(Level)
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.0, self.label())
  }
}

/// Stable reference to a catalogue sentence: "<scenario>/<index>".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(String);

impl SentenceId {
  pub fn new(scenario: &str, index: usize) -> Self {
    SentenceId(format!("{scenario}/{index}"))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SentenceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A Romanian practice sentence with its translations.
#[derive(Clone, Debug, Serialize)]
pub struct Sentence {
  pub id: SentenceId,
  pub source_text: String,
  pub level: Level,
  pub translations: BTreeMap<String, String>,
  pub context: String,
}

impl Sentence {
  /// Translation for `language`, falling back to English.
  pub fn translation(&self, language: &str) -> Option<&str> {
    self
      .translations
      .get(language)
      .or_else(|| self.translations.get(FALLBACK_LANGUAGE))
      .map(String::as_str)
  }
}

/// Entry of the scenario menu.
#[derive(Clone, Debug, Serialize)]
pub struct Scenario {
  pub id: String,
  pub name: String,
  pub icon: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Bot,
  User,
}

/// One chat turn in the session transcript.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id: String,
  pub role: Role,
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub translation: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub score: Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub level: Option<Level>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sentence_id: Option<SentenceId>,
  pub created_at: DateTime<Utc>,
}

impl Message {
  pub fn bot(sentence: &Sentence, translation: Option<String>) -> Self {
    Message {
      id: Uuid::new_v4().to_string(),
      role: Role::Bot,
      text: sentence.source_text.clone(),
      translation,
      score: None,
      feedback: None,
      level: Some(sentence.level),
      sentence_id: Some(sentence.id.clone()),
      created_at: Utc::now(),
    }
  }

  pub fn user(transcript: &str, score: u8, feedback: String) -> Self {
    Message {
      id: Uuid::new_v4().to_string(),
      role: Role::User,
      text: transcript.to_string(),
      translation: None,
      score: Some(score),
      feedback: Some(feedback),
      level: None,
      sentence_id: None,
      created_at: Utc::now(),
    }
  }
}

pub const DAILY_GOAL_MIN: u32 = 5;
pub const DAILY_GOAL_MAX: u32 = 50;
pub const DAILY_GOAL_STEP: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyGoal {
  pub completed: u32,
  pub target: u32,
}

impl DailyGoal {
  pub fn remaining(&self) -> u32 {
    self.target.saturating_sub(self.completed)
  }
}

/// Learner progress owned by the skill tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillState {
  pub skill_score: u8,
  pub level: Level,
  pub streak_days: u32,
  pub daily_goal: DailyGoal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechRate {
  Normal,
  Slow,
}

impl SpeechRate {
  pub fn from_slow(slow: bool) -> Self {
    if slow { SpeechRate::Slow } else { SpeechRate::Normal }
  }
}

/// Per-session learner preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  #[serde(default = "default_true")]
  pub show_diacritics: bool,
  #[serde(default)]
  pub auto_play: bool,
  #[serde(default)]
  pub slow_by_default: bool,
}

fn default_true() -> bool {
  true
}

impl Default for Settings {
  fn default() -> Self {
    Settings { show_diacritics: true, auto_play: false, slow_by_default: false }
  }
}

/// Partial settings update; absent fields stay unchanged.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
  pub show_diacritics: Option<bool>,
  pub auto_play: Option<bool>,
  pub slow_by_default: Option<bool>,
  pub daily_goal_target: Option<u32>,
}
