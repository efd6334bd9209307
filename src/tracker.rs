//! Skill tracker: the learner's skill score, level, streak and daily goal.
//!
//! Transition on each scored attempt:
//!   score >= 80      skill +6, streak +1, daily goal +1 (capped at target)
//!   70 <= score < 80 skill +3
//!   50 <= score < 70 skill +1
//!   score < 50       skill -3
//! then, on the new skill: >= 80 levels up, < 30 levels down, one step at most.

use tracing::{debug, info};

use crate::domain::{
  DailyGoal, Level, SkillState, DAILY_GOAL_MAX, DAILY_GOAL_MIN, DAILY_GOAL_STEP,
};

pub const SKILL_MAX: u8 = 100;
const LEVEL_UP_AT: u8 = 80;
const LEVEL_DOWN_BELOW: u8 = 30;

#[derive(Clone, Debug)]
pub struct SkillTracker {
  state: SkillState,
}

impl SkillTracker {
  /// Starts from `initial`, clamping every field into its valid range.
  pub fn new(initial: SkillState) -> Self {
    let target = clamp_goal_target(initial.daily_goal.target);
    let state = SkillState {
      skill_score: initial.skill_score.min(SKILL_MAX),
      level: Level::new(initial.level.get()),
      streak_days: initial.streak_days,
      daily_goal: DailyGoal { completed: initial.daily_goal.completed.min(target), target },
    };
    Self { state }
  }

  pub fn state(&self) -> SkillState {
    self.state
  }

  pub fn level(&self) -> Level {
    self.state.level
  }

  /// Apply one attempt score. Scores above 100 count as 100.
  pub fn apply_score(&mut self, score: u8) -> SkillState {
    let score = score.min(100);
    let before = self.state;
    let s = &mut self.state;

    match score {
      80..=100 => {
        s.skill_score = s.skill_score.saturating_add(6).min(SKILL_MAX);
        s.streak_days = s.streak_days.saturating_add(1);
        s.daily_goal.completed = (s.daily_goal.completed + 1).min(s.daily_goal.target);
      }
      70..=79 => s.skill_score = s.skill_score.saturating_add(3).min(SKILL_MAX),
      50..=69 => s.skill_score = s.skill_score.saturating_add(1).min(SKILL_MAX),
      _ => s.skill_score = s.skill_score.saturating_sub(3),
    }

    if s.skill_score >= LEVEL_UP_AT && s.level < Level::MAX {
      s.level = s.level.up();
    } else if s.skill_score < LEVEL_DOWN_BELOW && s.level > Level::MIN {
      s.level = s.level.down();
    }

    if s.level != before.level {
      info!(target: "session", from = %before.level, to = %s.level, skill = s.skill_score, "Level changed");
    }
    debug!(target: "session", score, skill_before = before.skill_score, skill_after = s.skill_score, "Score applied");
    *s
  }

  /// Used by "too hard?" to lower difficulty without touching the skill score.
  pub fn set_level(&mut self, level: Level) {
    self.state.level = Level::new(level.get());
  }

  /// Daily goal slider: 5..=50 in steps of 5. Completed count is capped at the new target.
  pub fn set_daily_goal_target(&mut self, target: u32) -> DailyGoal {
    let target = clamp_goal_target(target);
    let goal = &mut self.state.daily_goal;
    goal.target = target;
    goal.completed = goal.completed.min(target);
    *goal
  }
}

fn clamp_goal_target(target: u32) -> u32 {
  let stepped = (target.saturating_add(DAILY_GOAL_STEP / 2) / DAILY_GOAL_STEP) * DAILY_GOAL_STEP;
  stepped.clamp(DAILY_GOAL_MIN, DAILY_GOAL_MAX)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tracker(skill: u8, level: u8) -> SkillTracker {
    SkillTracker::new(SkillState {
      skill_score: skill,
      level: Level::new(level),
      streak_days: 3,
      daily_goal: DailyGoal { completed: 12, target: 15 },
    })
  }

  #[test]
  fn level_up_scenario() {
    let mut t = tracker(77, 2);
    let s = t.apply_score(85);
    assert_eq!(s.skill_score, 83);
    assert_eq!(s.level, Level::new(3));
    assert_eq!(s.streak_days, 4);
    assert_eq!(s.daily_goal.completed, 13);
  }

  #[test]
  fn level_down_scenario() {
    let mut t = tracker(32, 1);
    let s = t.apply_score(20);
    assert_eq!(s.skill_score, 29);
    assert_eq!(s.level, Level::MIN);
    assert_eq!(s.streak_days, 3);
  }

  #[test]
  fn skill_clamps_at_hundred() {
    let mut t = tracker(98, 5);
    assert_eq!(t.apply_score(95).skill_score, 100);
    assert_eq!(t.apply_score(95).level, Level::MAX);
  }

  #[test]
  fn skill_clamps_at_zero() {
    let mut t = tracker(2, 0);
    assert_eq!(t.apply_score(0).skill_score, 0);
    assert_eq!(t.level(), Level::MIN);
  }

  #[test]
  fn score_bands() {
    assert_eq!(tracker(40, 0).apply_score(79).skill_score, 43);
    assert_eq!(tracker(40, 0).apply_score(70).skill_score, 43);
    assert_eq!(tracker(40, 0).apply_score(69).skill_score, 41);
    assert_eq!(tracker(40, 0).apply_score(50).skill_score, 41);
    assert_eq!(tracker(40, 0).apply_score(49).skill_score, 37);
    assert_eq!(tracker(40, 0).apply_score(200).skill_score, 46);
  }

  #[test]
  fn one_level_step_per_turn() {
    let mut t = tracker(100, 0);
    assert_eq!(t.apply_score(100).level, Level::new(1));
    assert_eq!(t.apply_score(100).level, Level::new(2));
  }

  #[test]
  fn daily_goal_completion_caps_at_target() {
    let mut t = tracker(50, 1);
    for _ in 0..10 {
      t.apply_score(90);
    }
    assert_eq!(t.state().daily_goal.completed, 15);
    assert_eq!(t.state().daily_goal.remaining(), 0);
  }

  #[test]
  fn invariants_hold_over_long_sequences() {
    let mut t = tracker(45, 0);
    let scores = [0u8, 100, 49, 50, 69, 70, 79, 80, 255, 13, 88, 91, 5];
    for i in 0..500 {
      let before = t.state();
      let s = t.apply_score(scores[i % scores.len()]);
      assert!(s.skill_score <= 100);
      assert!(s.level <= Level::MAX);
      let step = (s.level.get() as i16 - before.level.get() as i16).abs();
      assert!(step <= 1);
    }
  }

  #[test]
  fn monotonic_for_high_and_low_scores() {
    for skill in 0..=100u8 {
      let mut hi = tracker(skill, 2);
      assert!(hi.apply_score(90).skill_score >= skill);
      let mut lo = tracker(skill, 2);
      assert!(lo.apply_score(10).skill_score <= skill);
    }
  }

  #[test]
  fn goal_target_snaps_to_slider() {
    let mut t = tracker(45, 0);
    assert_eq!(t.set_daily_goal_target(1).target, 5);
    assert_eq!(t.set_daily_goal_target(99).target, 50);
    assert_eq!(t.set_daily_goal_target(22).target, 20);
    let g = t.set_daily_goal_target(10);
    assert_eq!(g, DailyGoal { completed: 10, target: 10 });
  }

  #[test]
  fn new_clamps_initial_state() {
    let t = SkillTracker::new(SkillState {
      skill_score: 250,
      level: Level::new(2),
      streak_days: 0,
      daily_goal: DailyGoal { completed: 80, target: 3 },
    });
    assert_eq!(t.state().skill_score, 100);
    assert_eq!(t.state().daily_goal, DailyGoal { completed: 5, target: 5 });
  }
}
