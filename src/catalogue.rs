//! Content store: the immutable sentence catalogue, indexed by scenario.
//!
//! Built once at startup from the built-in seeds plus any extra sentences from the
//! TOML config, then validated:
//!   - every sentence has an "en" translation and a level within 0..=5
//!   - every scenario with sentences has at least one level-0 sentence
//!   - the default scenario (first menu entry) has sentences
//!
//! Menu scenarios without sentences of their own practice the default scenario.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::config::{CatalogueCfg, ScenarioCfg, SentenceCfg};
use crate::domain::{Level, Scenario, Sentence, SentenceId, FALLBACK_LANGUAGE};
use crate::error::CoachError;

#[derive(Debug)]
pub struct Catalogue {
  menu: Vec<Scenario>,
  by_scenario: HashMap<String, Vec<Sentence>>,
}

impl Catalogue {
  /// Merge the seed content with config extras and validate the result.
  pub fn build(seed: CatalogueCfg, extra_scenarios: &[ScenarioCfg], extra_sentences: &[SentenceCfg]) -> Result<Self, CoachError> {
    let mut menu: Vec<Scenario> = Vec::new();
    for sc in seed.scenarios.iter().chain(extra_scenarios) {
      if sc.id.is_empty() || sc.id.contains('/') {
        return Err(CoachError::InvalidCatalogue(format!("invalid scenario id '{}'", sc.id)));
      }
      if !menu.iter().any(|m| m.id == sc.id) {
        menu.push(Scenario { id: sc.id.clone(), name: sc.name.clone(), icon: sc.icon.clone() });
      }
    }

    let mut by_scenario: HashMap<String, Vec<Sentence>> = HashMap::new();
    for cfg in seed.sentences.iter().chain(extra_sentences) {
      let bucket = by_scenario.entry(cfg.scenario.clone()).or_default();
      let sentence = to_sentence(cfg, bucket.len())?;
      bucket.push(sentence);
    }

    // Sentences may introduce scenarios the menu doesn't list yet.
    let mut unlisted: Vec<&String> = by_scenario.keys().filter(|id| !menu.iter().any(|m| &m.id == *id)).collect();
    unlisted.sort();
    for id in unlisted {
      if id.is_empty() || id.contains('/') {
        return Err(CoachError::InvalidCatalogue(format!("invalid scenario id '{id}'")));
      }
      menu.push(Scenario { id: id.clone(), name: id.clone(), icon: String::new() });
    }

    let catalogue = Catalogue { menu, by_scenario };
    catalogue.validate()?;

    for sc in &catalogue.menu {
      let n = catalogue.by_scenario.get(&sc.id).map(Vec::len).unwrap_or(0);
      debug!(target: "coach_backend", scenario = %sc.id, sentences = n, "Catalogue scenario");
    }
    info!(
      target: "coach_backend",
      scenarios = catalogue.menu.len(),
      sentences = catalogue.by_scenario.values().map(Vec::len).sum::<usize>(),
      "Catalogue loaded"
    );
    Ok(catalogue)
  }

  /// Checks the structural invariants the selector relies on.
  pub fn validate(&self) -> Result<(), CoachError> {
    let default = self
      .menu
      .first()
      .ok_or_else(|| CoachError::InvalidCatalogue("scenario menu is empty".into()))?;
    if self.by_scenario.get(&default.id).map_or(true, Vec::is_empty) {
      return Err(CoachError::EmptyCatalogue { scenario: default.id.clone() });
    }
    for (scenario, sentences) in &self.by_scenario {
      if !sentences.iter().any(|s| s.level == Level::MIN) {
        return Err(CoachError::InvalidCatalogue(format!("scenario '{scenario}' has no level-0 sentence")));
      }
    }
    Ok(())
  }

  pub fn scenarios(&self) -> &[Scenario] {
    &self.menu
  }

  pub fn default_scenario(&self) -> &str {
    self.menu.first().map(|s| s.id.as_str()).unwrap_or_default()
  }

  pub fn contains_scenario(&self, scenario_id: &str) -> bool {
    self.menu.iter().any(|s| s.id == scenario_id)
  }

  /// Sentences practiced under `scenario_id`.
  pub fn sentences(&self, scenario_id: &str) -> Result<&[Sentence], CoachError> {
    if let Some(list) = self.by_scenario.get(scenario_id) {
      return Ok(list);
    }
    if !self.contains_scenario(scenario_id) {
      return Err(CoachError::UnknownScenario(scenario_id.to_string()));
    }
    let default = self.default_scenario();
    debug!(target: "coach_backend", scenario = %scenario_id, %default, "No sentences authored; using default scenario");
    self
      .by_scenario
      .get(default)
      .map(Vec::as_slice)
      .ok_or_else(|| CoachError::EmptyCatalogue { scenario: scenario_id.to_string() })
  }

  /// Lookup by stable id.
  pub fn sentence(&self, id: &SentenceId) -> Option<&Sentence> {
    let (scenario, index) = id.as_str().rsplit_once('/')?;
    let index: usize = index.parse().ok()?;
    self.by_scenario.get(scenario)?.get(index)
  }

  pub fn max_level(&self, scenario_id: &str) -> Option<Level> {
    self.sentences(scenario_id).ok()?.iter().map(|s| s.level).max()
  }
}

fn to_sentence(cfg: &SentenceCfg, index: usize) -> Result<Sentence, CoachError> {
  if cfg.ro.trim().is_empty() {
    return Err(CoachError::InvalidCatalogue(format!("empty sentence in scenario '{}'", cfg.scenario)));
  }
  if cfg.level > Level::MAX.get() {
    return Err(CoachError::InvalidCatalogue(format!("'{}' has level {} (max {})", cfg.ro, cfg.level, Level::MAX.get())));
  }
  if !cfg.translations.contains_key(FALLBACK_LANGUAGE) {
    return Err(CoachError::InvalidCatalogue(format!("'{}' has no \"{FALLBACK_LANGUAGE}\" translation", cfg.ro)));
  }
  Ok(Sentence {
    id: SentenceId::new(&cfg.scenario, index),
    source_text: cfg.ro.trim().to_string(),
    level: Level::new(cfg.level),
    translations: cfg.translations.iter().map(|(k, v)| (k.to_lowercase(), v.clone())).collect::<BTreeMap<_, _>>(),
    context: cfg.context.clone(),
  })
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::seeds::seed_catalogue;

  pub(crate) fn sentence_cfg(scenario: &str, level: u8, ro: &str, en: &str) -> SentenceCfg {
    SentenceCfg {
      scenario: scenario.into(),
      level,
      ro: ro.into(),
      context: String::new(),
      translations: BTreeMap::from([("en".to_string(), en.to_string())]),
    }
  }

  pub(crate) fn builtin() -> Catalogue {
    Catalogue::build(seed_catalogue().unwrap(), &[], &[]).expect("built-in catalogue is valid")
  }

  #[test]
  fn builtin_catalogue_is_valid() {
    let c = builtin();
    assert_eq!(c.default_scenario(), "identification");
    assert_eq!(c.sentences("identification").unwrap().len(), 5);
    assert_eq!(c.sentences("appointments").unwrap().len(), 3);
    assert_eq!(c.max_level("identification"), Some(Level::new(3)));
  }

  #[test]
  fn menu_scenarios_without_content_use_default() {
    let c = builtin();
    let bank = c.sentences("bank").unwrap();
    assert_eq!(bank[0].source_text, "Bună ziua!");
  }

  #[test]
  fn unknown_scenario_is_rejected() {
    let c = builtin();
    assert_eq!(c.sentences("mars").unwrap_err(), CoachError::UnknownScenario("mars".into()));
  }

  #[test]
  fn sentence_lookup_by_id() {
    let c = builtin();
    let s = &c.sentences("appointments").unwrap()[1];
    assert_eq!(c.sentence(&s.id).unwrap().source_text, s.source_text);
    assert!(c.sentence(&SentenceId::new("appointments", 99)).is_none());
  }

  #[test]
  fn extras_extend_catalogue_and_menu() {
    let extra = [sentence_cfg("bank", 0, "Vreau să deschid un cont.", "I want to open an account.")];
    let c = Catalogue::build(seed_catalogue().unwrap(), &[], &extra).unwrap();
    assert_eq!(c.sentences("bank").unwrap().len(), 1);
    assert_eq!(c.scenarios().len(), 9);

    let extra = [sentence_cfg("pharmacy", 0, "Am nevoie de un medicament.", "I need a medicine.")];
    let c = Catalogue::build(seed_catalogue().unwrap(), &[], &extra).unwrap();
    assert!(c.contains_scenario("pharmacy"));
  }

  #[test]
  fn rejects_scenario_without_level_zero() {
    let extra = [sentence_cfg("bank", 2, "Care este dobânda?", "What is the interest rate?")];
    let err = Catalogue::build(seed_catalogue().unwrap(), &[], &extra).unwrap_err();
    assert!(err.is_fatal());
  }

  #[test]
  fn rejects_missing_english_and_bad_level() {
    let mut no_en = sentence_cfg("bank", 0, "Bună.", "Hi.");
    no_en.translations = BTreeMap::from([("fr".to_string(), "Salut.".to_string())]);
    assert!(matches!(
      Catalogue::build(seed_catalogue().unwrap(), &[], &[no_en]),
      Err(CoachError::InvalidCatalogue(_))
    ));

    let too_hard = sentence_cfg("bank", 6, "Bună.", "Hi.");
    assert!(Catalogue::build(seed_catalogue().unwrap(), &[], &[too_hard]).is_err());
  }

  #[test]
  fn default_scenario_must_have_content() {
    let seed = CatalogueCfg {
      scenarios: vec![ScenarioCfg { id: "empty".into(), name: "Empty".into(), icon: String::new() }],
      sentences: vec![],
    };
    let err = Catalogue::build(seed, &[], &[]).unwrap_err();
    assert_eq!(err, CoachError::EmptyCatalogue { scenario: "empty".into() });
  }
}
