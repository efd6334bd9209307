//! Small utility helpers used across modules.

/// Log-safe truncation for learner text.
/// Cuts on a char boundary so Romanian diacritics never split.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_strings_pass_through() {
    assert_eq!(trunc_for_log("Bună ziua!", 80), "Bună ziua!");
  }

  #[test]
  fn truncates_on_char_boundary() {
    let out = trunc_for_log("ăăăăă", 2);
    assert!(out.starts_with("ăă…"));
    assert!(out.ends_with("(10 bytes total)"));
  }
}
