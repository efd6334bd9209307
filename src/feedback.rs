//! Feedback lines attached to scored attempts.
//!
//! The headline depends only on the score band; the tip is picked at random among
//! tips relevant to letters that actually occur in the target sentence.

use rand::seq::SliceRandom;
use rand::Rng;

struct Tip {
  /// Tip applies when the target contains any of these characters.
  triggers: &'static [char],
  text: &'static str,
}

const TIPS: &[Tip] = &[
  Tip { triggers: &['ă', 'Ă'], text: "Focus on the 'ă' sound - it's like 'uh'." },
  Tip { triggers: &['â', 'Â', 'î', 'Î'], text: "The 'â'/'î' sound sits further back than 'i', closer to 'uh' than 'ah'." },
  Tip { triggers: &['ș', 'Ș', 'ş', 'Ş'], text: "Make sure to pronounce 'ș' like 'sh'." },
  Tip { triggers: &['ț', 'Ț', 'ţ', 'Ţ'], text: "Pronounce 'ț' like the 'ts' in 'cats'." },
  Tip { triggers: &['r', 'R'], text: "Roll the 'r' sound a little more." },
];

const GENERAL_TIPS: &[&str] = &[
  "Try speaking a bit slower for clarity.",
  "Stress the second-to-last syllable of longer words.",
  "Listen once more at slow speed, then repeat.",
];

fn headline(score: u8) -> &'static str {
  match score {
    90..=u8::MAX => "Excellent!",
    80..=89 => "Great pronunciation!",
    70..=79 => "Good work!",
    50..=69 => "Good effort!",
    _ => "Let's try that one again.",
  }
}

/// Build the feedback string for an attempt at `target` that scored `score`.
pub fn feedback_for<R: Rng + ?Sized>(score: u8, target: &str, rng: &mut R) -> String {
  if score == 100 {
    return format!("{} Perfect match.", headline(score));
  }
  let relevant: Vec<&str> = TIPS
    .iter()
    .filter(|t| target.chars().any(|c| t.triggers.contains(&c)))
    .map(|t| t.text)
    .collect();
  let tip = relevant
    .choose(rng)
    .or_else(|| GENERAL_TIPS.choose(rng))
    .copied()
    .unwrap_or("Keep practicing.");
  format!("{} {}", headline(score), tip)
}
