//! Sentence selection with a one-band look-ahead window.
//!
//! Candidates are the scenario's sentences with `level <= requested + 1`, so learners
//! occasionally meet slightly harder material. Choice among candidates is uniform.
//! The RNG is owned here and can be seeded for reproducible sequences.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, instrument};

use crate::catalogue::Catalogue;
use crate::domain::{Level, Sentence};
use crate::error::CoachError;

/// A chosen sentence with its translation already resolved for the active language.
#[derive(Clone, Debug)]
pub struct Selection<'a> {
  pub sentence: &'a Sentence,
  pub translation: Option<String>,
}

pub struct SentenceSelector {
  rng: StdRng,
}

impl SentenceSelector {
  pub fn from_entropy() -> Self {
    Self { rng: StdRng::from_entropy() }
  }

  pub fn seeded(seed: u64) -> Self {
    Self { rng: StdRng::seed_from_u64(seed) }
  }

  pub fn new(seed: Option<u64>) -> Self {
    seed.map(Self::seeded).unwrap_or_else(Self::from_entropy)
  }

  /// Pick the next sentence for `scenario_id` at `level`.
  ///
  /// Fails with `EmptyCatalogue` only when the scenario has no sentences at all,
  /// which a validated catalogue never allows.
  #[instrument(level = "debug", skip_all, fields(%scenario_id, level = level.get(), %language))]
  pub fn next<'a>(
    &mut self,
    catalogue: &'a Catalogue,
    scenario_id: &str,
    level: Level,
    language: &str,
  ) -> Result<Selection<'a>, CoachError> {
    let all = catalogue.sentences(scenario_id)?;
    let lowest = all
      .iter()
      .map(|s| s.level)
      .min()
      .ok_or_else(|| CoachError::EmptyCatalogue { scenario: scenario_id.to_string() })?;

    // Window is level + 1; when even that is below the easiest authored band, widen to it.
    let ceiling = level.up().max(lowest);
    let candidates: Vec<&Sentence> = all.iter().filter(|s| s.level <= ceiling).collect();
    let sentence = *candidates
      .choose(&mut self.rng)
      .ok_or_else(|| CoachError::EmptyCatalogue { scenario: scenario_id.to_string() })?;

    debug!(target: "session", id = %sentence.id, sentence_level = sentence.level.get(), candidates = candidates.len(), "Sentence selected");
    Ok(Selection { sentence, translation: sentence.translation(language).map(str::to_string) })
  }
}

/// One band easier, never below 0. Callers select again with the result.
pub fn simplify(level: Level) -> Level {
  level.down()
}
