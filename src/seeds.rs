//! Built-in content: scenario menu, practice sentences and the translation languages.

use crate::config::CatalogueCfg;
use crate::error::CoachError;

const BUILTIN_CATALOGUE: &str = include_str!("../content/catalogue.toml");

/// Scenario menu and sentences shipped with the service. Guarantees the coach is
/// useful without any external config.
pub fn seed_catalogue() -> Result<CatalogueCfg, CoachError> {
  toml::from_str::<CatalogueCfg>(BUILTIN_CATALOGUE)
    .map_err(|e| CoachError::InvalidCatalogue(format!("built-in catalogue: {e}")))
}

/// Translation languages offered to learners: (code, display name, flag).
pub const SUPPORTED_LANGUAGES: &[(&str, &str, &str)] = &[
  ("en", "English", "🇺🇸"),
  ("he", "עברית (Hebrew)", "🇮🇱"),
  ("es", "Español", "🇪🇸"),
  ("fr", "Français", "🇫🇷"),
  ("de", "Deutsch", "🇩🇪"),
  ("it", "Italiano", "🇮🇹"),
  ("pt", "Português", "🇵🇹"),
  ("ru", "Русский", "🇷🇺"),
  ("ar", "العربية", "🇸🇦"),
  ("zh", "中文", "🇨🇳"),
  ("ja", "日本語", "🇯🇵"),
  ("ko", "한국어", "🇰🇷"),
  ("hi", "हिन्दी", "🇮🇳"),
  ("tr", "Türkçe", "🇹🇷"),
  ("pl", "Polski", "🇵🇱"),
  ("nl", "Nederlands", "🇳🇱"),
  ("sv", "Svenska", "🇸🇪"),
  ("da", "Dansk", "🇩🇰"),
  ("no", "Norsk", "🇳🇴"),
  ("fi", "Suomi", "🇫🇮"),
];
