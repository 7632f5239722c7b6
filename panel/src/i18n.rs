//! Locale tables for user-facing messages.
//!
//! Each `<code>.json` file holds `{ "Language": "...", "Translation": { key: text } }`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use tracing::warn;

/// Locales offered for the script language and voice list.
pub const SUPPORT_LOCALES: [&str; 8] = ["zh-CN", "zh-HK", "zh-TW", "de-DE", "en-US", "fr-FR", "vi-VN", "th-TH"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Locale {
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "Translation", default)]
    pub translation: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Locales(pub BTreeMap<String, Locale>);

/// Reads every `*.json` in `dir`. A missing directory yields no locales.
pub fn load_locales(dir: &Path) -> Result<Locales> {
    let mut out = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(dir = %dir.display(), "locale directory missing, messages stay untranslated");
            return Ok(Locales::default());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
    };
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
        let Some(code) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let locale: Locale = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        out.insert(code.to_string(), locale);
    }
    Ok(Locales(out))
}

impl Locales {
    /// Translated text for `key`, or the key itself.
    pub fn tr<'a>(&'a self, locale: &str, key: &'a str) -> &'a str {
        self.0
            .get(locale)
            .and_then(|l| l.translation.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// `code - Language` labels for the language picker.
    pub fn display_names(&self) -> Vec<String> {
        self.0.iter().map(|(code, l)| format!("{code} - {}", l.language)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_files_and_falls_back_to_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("de-DE.json"),
            r#"{"Language":"Deutsch","Translation":{"Generate Video":"Video generieren"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let locales = load_locales(dir.path()).unwrap();
        assert_eq!(locales.tr("de-DE", "Generate Video"), "Video generieren");
        assert_eq!(locales.tr("de-DE", "Hide Log"), "Hide Log");
        assert_eq!(locales.tr("xx-XX", "Generate Video"), "Generate Video");
        assert_eq!(locales.display_names(), vec!["de-DE - Deutsch"]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_locales(&dir.path().join("absent")).unwrap().0.is_empty());
    }

    #[test]
    fn bundled_locales_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("i18n");
        let locales = load_locales(&dir).unwrap();
        assert!(locales.0.contains_key("en-US"));
        assert_eq!(locales.tr("zh-CN", "Generate Video"), "生成视频");
    }
}
