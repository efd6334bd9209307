//! Session orchestrator: sequences selector → presentation → capture → scorer → tracker.
//!
//! A `Session` is an explicit, caller-owned object holding everything that changes
//! during practice: message history, the active sentence, the learner's skill state,
//! language/scenario choice and the turn phase.
//!
//! Turn phases:
//!   Idle      ──begin_playback──▶ Playing   ──end_playback──▶ Idle
//!   Idle      ──begin_capture───▶ Recording ──finish_capture─▶ Idle
//! Playback and capture exclude each other, and at most one capture is open.
//! Any rejected transition leaves the session untouched.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalogue::Catalogue;
use crate::config::SessionDefaults;
use crate::domain::{
  DailyGoal, Level, Message, Role, Sentence, SentenceId, Settings, SettingsPatch, SkillState, SpeechRate,
  FALLBACK_LANGUAGE,
};
use crate::error::CoachError;
use crate::feedback::feedback_for;
use crate::scorer;
use crate::selector::{self, SentenceSelector};
use crate::tracker::SkillTracker;
use crate::util::trunc_for_log;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Playing,
  Recording,
}

/// Result of presenting a sentence.
#[derive(Clone, Debug)]
pub struct Presented {
  pub message: Message,
  /// Set when auto-play is on: the caller should synthesize at this rate.
  pub auto_play: Option<SpeechRate>,
}

/// Result of a scored attempt.
#[derive(Clone, Debug)]
pub struct AttemptOutcome {
  pub message: Message,
  pub score: u8,
  pub skill: SkillState,
  pub previous_level: Level,
}

impl AttemptOutcome {
  pub fn level_changed(&self) -> bool {
    self.previous_level != self.skill.level
  }
}

pub struct Session {
  id: Uuid,
  catalogue: Arc<Catalogue>,
  selector: SentenceSelector,
  tracker: SkillTracker,
  feedback_rng: StdRng,
  scenario_id: String,
  language: String,
  settings: Settings,
  messages: Vec<Message>,
  active: Option<SentenceId>,
  phase: Phase,
}

impl Session {
  /// New session starting from `defaults`. `rng_seed` fixes sentence selection and feedback tips.
  pub fn new(catalogue: Arc<Catalogue>, defaults: &SessionDefaults, rng_seed: Option<u64>) -> Result<Self, CoachError> {
    let scenario_id = match &defaults.scenario {
      Some(id) if catalogue.contains_scenario(id) => id.clone(),
      Some(id) => return Err(CoachError::UnknownScenario(id.clone())),
      None => catalogue.default_scenario().to_string(),
    };
    let feedback_rng = match rng_seed {
      Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
      None => StdRng::from_entropy(),
    };
    let mut tracker = SkillTracker::new(defaults.skill_state());
    tracker.set_daily_goal_target(defaults.daily_goal_target);

    let session = Self {
      id: Uuid::new_v4(),
      catalogue,
      selector: SentenceSelector::new(rng_seed),
      tracker,
      feedback_rng,
      scenario_id,
      language: normalize_language(&defaults.language),
      settings: defaults.settings,
      messages: Vec::new(),
      active: None,
      phase: Phase::Idle,
    };
    info!(target: "session", id = %session.id, scenario = %session.scenario_id, language = %session.language, "Session created");
    Ok(session)
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn scenario_id(&self) -> &str {
    &self.scenario_id
  }

  pub fn language(&self) -> &str {
    &self.language
  }

  pub fn settings(&self) -> Settings {
    self.settings
  }

  pub fn skill(&self) -> SkillState {
    self.tracker.state()
  }

  pub fn messages(&self) -> &[Message] {
    &self.messages
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn catalogue(&self) -> &Catalogue {
    &self.catalogue
  }

  pub fn active_sentence(&self) -> Option<&Sentence> {
    self.active.as_ref().and_then(|id| self.catalogue.sentence(id))
  }

  /// Select the next sentence and append it as a bot message.
  #[instrument(level = "info", skip(self), fields(session = %self.id))]
  pub fn present_next(&mut self) -> Result<Presented, CoachError> {
    self.ensure_idle()?;
    let level = self.tracker.level();
    let pick = self.selector.next(&self.catalogue, &self.scenario_id, level, &self.language)?;
    let message = Message::bot(pick.sentence, pick.translation);

    self.active = Some(pick.sentence.id.clone());
    self.messages.push(message.clone());
    info!(target: "session", session = %self.id, sentence = %pick.sentence.id, level = pick.sentence.level.get(), "Sentence presented");

    let auto_play = self.settings.auto_play.then(|| SpeechRate::from_slow(self.settings.slow_by_default));
    Ok(Presented { message, auto_play })
  }

  /// "Too hard?": drop one level and present a new sentence at it.
  #[instrument(level = "info", skip(self), fields(session = %self.id))]
  pub fn simplify(&mut self) -> Result<Presented, CoachError> {
    self.ensure_idle()?;
    let before = self.tracker.level();
    self.tracker.set_level(selector::simplify(before));
    match self.present_next() {
      Ok(p) => Ok(p),
      Err(e) => {
        self.tracker.set_level(before);
        Err(e)
      }
    }
  }

  /// Score a transcript obtained outside a capture (e.g. browser-side recognition).
  #[instrument(level = "info", skip(self, transcript), fields(session = %self.id, transcript_len = transcript.len()))]
  pub fn submit_attempt(&mut self, transcript: &str) -> Result<AttemptOutcome, CoachError> {
    self.ensure_idle()?;
    self.score_attempt(transcript)
  }

  /// Open a capture for the active sentence.
  pub fn begin_capture(&mut self) -> Result<(), CoachError> {
    if self.active.is_none() {
      return Err(CoachError::NoActiveSentence);
    }
    self.ensure_idle()?;
    self.phase = Phase::Recording;
    debug!(target: "session", session = %self.id, "Capture started");
    Ok(())
  }

  /// Close the open capture with the recognizer's result and score it.
  /// A failed recognition closes the capture and is returned as-is.
  pub fn finish_capture(&mut self, transcript: Result<String, CoachError>) -> Result<AttemptOutcome, CoachError> {
    if self.phase != Phase::Recording {
      return Err(CoachError::NotRecording);
    }
    self.phase = Phase::Idle;
    match transcript {
      Ok(t) => self.score_attempt(&t),
      Err(e) => {
        warn!(target: "session", session = %self.id, error = %e, "Capture failed");
        Err(e)
      }
    }
  }

  pub fn cancel_capture(&mut self) -> Result<(), CoachError> {
    if self.phase != Phase::Recording {
      return Err(CoachError::NotRecording);
    }
    self.phase = Phase::Idle;
    debug!(target: "session", session = %self.id, "Capture cancelled");
    Ok(())
  }

  /// Mark playback of the active sentence as started; returns what to synthesize.
  /// `slow` overrides the session's slow-by-default preference.
  pub fn begin_playback(&mut self, slow: Option<bool>) -> Result<(String, SpeechRate), CoachError> {
    self.ensure_idle()?;
    let text = self
      .active_sentence()
      .map(|s| s.source_text.clone())
      .ok_or(CoachError::NoActiveSentence)?;
    let rate = SpeechRate::from_slow(slow.unwrap_or(self.settings.slow_by_default));
    self.phase = Phase::Playing;
    Ok((text, rate))
  }

  pub fn end_playback(&mut self) {
    if self.phase == Phase::Playing {
      self.phase = Phase::Idle;
    }
  }

  /// Switch the translation language and re-translate existing bot messages.
  /// Messages whose sentence can no longer be found keep their translation.
  #[instrument(level = "info", skip(self), fields(session = %self.id))]
  pub fn switch_language(&mut self, language: &str) {
    self.language = normalize_language(language);
    let mut updated = 0usize;
    for m in self.messages.iter_mut().filter(|m| m.role == Role::Bot) {
      let Some(sentence) = m.sentence_id.as_ref().and_then(|id| self.catalogue.sentence(id)) else {
        continue;
      };
      if let Some(t) = sentence.translation(&self.language) {
        m.translation = Some(t.to_string());
        updated += 1;
      }
    }
    info!(target: "session", session = %self.id, language = %self.language, updated, "Language switched");
  }

  /// Start over in another scenario. Skill and level carry over.
  #[instrument(level = "info", skip(self), fields(session = %self.id))]
  pub fn switch_scenario(&mut self, scenario_id: &str) -> Result<(), CoachError> {
    if !self.catalogue.contains_scenario(scenario_id) {
      return Err(CoachError::UnknownScenario(scenario_id.to_string()));
    }
    self.ensure_idle()?;
    self.scenario_id = scenario_id.to_string();
    self.messages.clear();
    self.active = None;
    info!(target: "session", session = %self.id, scenario = %self.scenario_id, "Scenario switched");
    Ok(())
  }

  pub fn update_settings(&mut self, patch: SettingsPatch) -> (Settings, DailyGoal) {
    if let Some(v) = patch.show_diacritics {
      self.settings.show_diacritics = v;
    }
    if let Some(v) = patch.auto_play {
      self.settings.auto_play = v;
    }
    if let Some(v) = patch.slow_by_default {
      self.settings.slow_by_default = v;
    }
    let goal = match patch.daily_goal_target {
      Some(target) => self.set_daily_goal_target(target),
      None => self.tracker.state().daily_goal,
    };
    debug!(target: "session", session = %self.id, settings = ?self.settings, ?goal, "Settings updated");
    (self.settings, goal)
  }

  /// Snaps to the slider grid; completed is clamped to the new target.
  pub fn set_daily_goal_target(&mut self, target: u32) -> DailyGoal {
    self.tracker.set_daily_goal_target(target)
  }

  fn ensure_idle(&self) -> Result<(), CoachError> {
    match self.phase {
      Phase::Idle => Ok(()),
      Phase::Recording => Err(CoachError::AlreadyRecording),
      Phase::Playing => Err(CoachError::PlaybackActive),
    }
  }

  fn score_attempt(&mut self, transcript: &str) -> Result<AttemptOutcome, CoachError> {
    let target = self.active_sentence().ok_or(CoachError::NoActiveSentence)?.source_text.clone();

    let score = scorer::score(transcript, &target);
    let feedback = feedback_for(score, &target, &mut self.feedback_rng);
    let previous_level = self.tracker.level();
    let skill = self.tracker.apply_score(score);

    let message = Message::user(transcript.trim(), score, feedback);
    self.messages.push(message.clone());
    info!(
      target: "session",
      session = %self.id,
      score,
      skill = skill.skill_score,
      level = skill.level.get(),
      transcript = %trunc_for_log(transcript, 80),
      "Attempt scored"
    );
    Ok(AttemptOutcome { message, score, skill, previous_level })
  }
}

fn normalize_language(code: &str) -> String {
  let code = code.trim().to_lowercase();
  if code.is_empty() { FALLBACK_LANGUAGE.to_string() } else { code }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::catalogue::tests::builtin;

  pub(crate) fn session_with(skill: u8, level: u8) -> Session {
    let defaults = SessionDefaults { skill_score: skill, level, ..SessionDefaults::default() };
    Session::new(Arc::new(builtin()), &defaults, Some(99)).unwrap()
  }

  #[test]
  fn present_next_appends_bot_message() {
    let mut s = session_with(45, 0);
    let p = s.present_next().unwrap();
    assert_eq!(s.messages().len(), 1);
    assert_eq!(p.message.role, Role::Bot);
    assert!(p.message.sentence_id.is_some());
    assert!(p.message.translation.is_some());
    assert!(p.message.level.unwrap() <= Level::new(1));
    assert!(p.auto_play.is_none());
    assert_eq!(s.active_sentence().unwrap().source_text, p.message.text);
  }

  #[test]
  fn submit_without_sentence_fails() {
    let mut s = session_with(45, 0);
    assert_eq!(s.submit_attempt("buna ziua").unwrap_err(), CoachError::NoActiveSentence);
    assert!(s.messages().is_empty());
    assert_eq!(s.begin_capture().unwrap_err(), CoachError::NoActiveSentence);
  }

  #[test]
  fn perfect_attempt_updates_skill_and_history() {
    let mut s = session_with(77, 2);
    let text = s.present_next().unwrap().message.text;
    let out = s.submit_attempt(&text).unwrap();
    assert_eq!(out.score, 100);
    assert_eq!(out.skill.skill_score, 83);
    assert_eq!(out.skill.level, Level::new(3));
    assert!(out.level_changed());
    assert_eq!(s.messages().len(), 2);
    assert_eq!(s.messages()[1].role, Role::User);
    assert_eq!(s.messages()[1].score, Some(100));
    assert!(s.messages()[1].feedback.is_some());
  }

  #[test]
  fn attempt_while_recording_is_rejected() {
    let mut s = session_with(45, 0);
    s.present_next().unwrap();
    s.begin_capture().unwrap();
    assert_eq!(s.submit_attempt("buna ziua").unwrap_err(), CoachError::AlreadyRecording);
    assert_eq!(s.begin_capture().unwrap_err(), CoachError::AlreadyRecording);
    assert_eq!(s.present_next().unwrap_err(), CoachError::AlreadyRecording);
    assert_eq!(s.begin_playback(None).unwrap_err(), CoachError::AlreadyRecording);
    assert_eq!(s.messages().len(), 1);

    let text = s.active_sentence().unwrap().source_text.clone();
    let out = s.finish_capture(Ok(text)).unwrap();
    assert_eq!(out.score, 100);
    assert_eq!(s.phase(), Phase::Idle);
  }

  #[test]
  fn failed_capture_leaves_skill_untouched() {
    let mut s = session_with(45, 0);
    s.present_next().unwrap();
    let before = s.skill();
    s.begin_capture().unwrap();
    let err = s.finish_capture(Err(CoachError::AsrError("no speech".into()))).unwrap_err();
    assert!(err.is_transient());
    assert_eq!(s.skill(), before);
    assert_eq!(s.messages().len(), 1);
    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.finish_capture(Ok("x".into())).unwrap_err(), CoachError::NotRecording);
  }

  #[test]
  fn playback_and_capture_exclude_each_other() {
    let mut s = session_with(45, 0);
    s.present_next().unwrap();
    let (text, rate) = s.begin_playback(Some(true)).unwrap();
    assert_eq!(rate, SpeechRate::Slow);
    assert!(!text.is_empty());
    assert_eq!(s.begin_capture().unwrap_err(), CoachError::PlaybackActive);
    assert_eq!(s.begin_playback(None).unwrap_err(), CoachError::PlaybackActive);
    s.end_playback();
    s.begin_capture().unwrap();
    s.cancel_capture().unwrap();
    assert_eq!(s.phase(), Phase::Idle);
  }

  #[test]
  fn switch_language_only_touches_bot_translations() {
    let mut s = session_with(45, 0);
    s.present_next().unwrap();
    let text = s.active_sentence().unwrap().source_text.clone();
    s.submit_attempt(&text).unwrap();
    s.present_next().unwrap();
    let before: Vec<Message> = s.messages().to_vec();

    s.switch_language("FR");
    assert_eq!(s.language(), "fr");
    for (old, new) in before.iter().zip(s.messages()) {
      assert_eq!(old.id, new.id);
      assert_eq!(old.text, new.text);
      assert_eq!(old.score, new.score);
      assert_eq!(old.created_at, new.created_at);
      if new.role == Role::Bot {
        let sentence = s.catalogue().sentence(new.sentence_id.as_ref().unwrap()).unwrap();
        assert_eq!(new.translation.as_deref(), sentence.translations.get("fr").map(String::as_str));
      } else {
        assert_eq!(old.translation, new.translation);
      }
    }
  }

  #[test]
  fn unsupported_language_falls_back_to_english() {
    let mut s = session_with(45, 0);
    s.switch_language("xx");
    let p = s.present_next().unwrap();
    let sentence = s.active_sentence().unwrap();
    assert_eq!(p.message.translation.as_deref(), sentence.translations.get("en").map(String::as_str));
  }

  #[test]
  fn switch_scenario_resets_history_but_keeps_skill() {
    let mut s = session_with(60, 3);
    s.present_next().unwrap();
    let skill = s.skill();
    s.switch_scenario("appointments").unwrap();
    assert!(s.messages().is_empty());
    assert!(s.active_sentence().is_none());
    assert_eq!(s.skill(), skill);
    assert_eq!(s.submit_attempt("x").unwrap_err(), CoachError::NoActiveSentence);
    assert_eq!(s.switch_scenario("moon").unwrap_err(), CoachError::UnknownScenario("moon".into()));
    assert_eq!(s.scenario_id(), "appointments");
  }

  #[test]
  fn simplify_lowers_level_and_presents() {
    let mut s = session_with(50, 2);
    let p = s.simplify().unwrap();
    assert_eq!(s.skill().level, Level::new(1));
    assert!(p.message.level.unwrap() <= Level::new(2));

    let mut s = session_with(50, 0);
    s.simplify().unwrap();
    assert_eq!(s.skill().level, Level::MIN);
  }

  #[test]
  fn simplify_while_recording_keeps_level() {
    let mut s = session_with(50, 2);
    s.present_next().unwrap();
    s.begin_capture().unwrap();
    assert_eq!(s.simplify().unwrap_err(), CoachError::AlreadyRecording);
    assert_eq!(s.skill().level, Level::new(2));
  }

  #[test]
  fn auto_play_follows_settings() {
    let mut s = session_with(45, 0);
    s.update_settings(SettingsPatch { auto_play: Some(true), slow_by_default: Some(true), ..Default::default() });
    assert_eq!(s.present_next().unwrap().auto_play, Some(SpeechRate::Slow));
    let (_, goal) = s.update_settings(SettingsPatch { daily_goal_target: Some(7), ..Default::default() });
    assert_eq!(goal.target, 5);
    assert_eq!(goal.completed, 5);
    assert_eq!(s.set_daily_goal_target(50).target, 50);
    assert_eq!(s.skill().daily_goal.completed, 5);
  }

  #[test]
  fn unknown_default_scenario_is_rejected() {
    let defaults = SessionDefaults { scenario: Some("atlantis".into()), ..SessionDefaults::default() };
    let err = Session::new(Arc::new(builtin()), &defaults, None).err().unwrap();
    assert_eq!(err, CoachError::UnknownScenario("atlantis".into()));
  }
}
