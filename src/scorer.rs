//! Transcript scoring: how close a recognized utterance is to the target sentence.
//!
//! Both strings are normalized (Romanian diacritics folded, lower-cased, punctuation
//! dropped, whitespace collapsed) and compared with a character-level Levenshtein
//! distance. The similarity `1 - distance / longest` is mapped onto 0..=100.
//!
//! Example:
//!   target:     "Mă numesc Maria."
//!   transcript: "ma numesc maria"
//!   score:      100

/// Romanian diacritic folding. Covers the comma-below letters and the legacy
/// cedilla forms that many recognizers still emit.
fn fold_diacritic(ch: char) -> char {
  match ch {
    'ă' | 'â' => 'a',
    'Ă' | 'Â' => 'A',
    'î' => 'i',
    'Î' => 'I',
    'ș' | 'ş' => 's',
    'Ș' | 'Ş' => 'S',
    'ț' | 'ţ' => 't',
    'Ț' | 'Ţ' => 'T',
    other => other,
  }
}

/// Replace Romanian diacritics with their base letters, preserving case and everything else.
/// Used for display when the learner turned diacritics off.
pub fn strip_diacritics(text: &str) -> String {
  text.chars().map(fold_diacritic).collect()
}

/// Canonical comparison form of a sentence.
pub fn normalize(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut pending_space = false;
  for ch in text.chars().map(fold_diacritic).flat_map(char::to_lowercase) {
    if ch.is_alphanumeric() {
      if pending_space && !out.is_empty() {
        out.push(' ');
      }
      pending_space = false;
      out.push(ch);
    } else {
      // Whitespace and punctuation both separate words.
      pending_space = true;
    }
  }
  out
}

/// Character-level Levenshtein distance, two-row variant.
pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr: Vec<usize> = vec![0; b.len() + 1];
  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=b.len() {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }
  prev[b.len()]
}

/// Score a recognized transcript against the target sentence, 0..=100.
pub fn score(transcript: &str, target: &str) -> u8 {
  let said = normalize(transcript);
  if said.is_empty() {
    return 0;
  }
  let expected = normalize(target);
  if said == expected {
    return 100;
  }

  let longest = said.chars().count().max(expected.chars().count());
  let distance = levenshtein(&said, &expected).min(longest);
  let similarity = 1.0 - distance as f64 / longest as f64;
  (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
