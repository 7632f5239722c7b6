/// Voice names look like `en-US-JennyNeural-Female`.
pub trait VoiceCatalog: Send + Sync {
    /// Voices whose locale is in `filter_locales`, in catalog order. An empty filter returns all.
    fn voices(&self, filter_locales: &[&str]) -> Vec<String>;
}

/// Azure neural voices shipped with the binary.
pub struct BundledVoiceCatalog {
    voices: Vec<String>,
}

impl BundledVoiceCatalog {
    pub fn new() -> Self {
        Self::from_list(include_str!("../resources/azure_voices.txt"))
    }

    pub fn from_list(list: &str) -> Self {
        let voices = list.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')).map(String::from).collect();
        Self { voices }
    }
}

impl Default for BundledVoiceCatalog {
    fn default() -> Self { Self::new() }
}

impl VoiceCatalog for BundledVoiceCatalog {
    fn voices(&self, filter_locales: &[&str]) -> Vec<String> {
        self.voices
            .iter()
            .filter(|v| filter_locales.is_empty() || filter_locales.iter().any(|loc| v.starts_with(&format!("{loc}-"))))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::SUPPORT_LOCALES;

    #[test]
    fn filters_by_locale_prefix() {
        let catalog = BundledVoiceCatalog::from_list("zh-CN-XiaoxiaoNeural-Female\nzh-HK-HiuGaaiNeural-Female\nen-US-GuyNeural-Male\n");
        assert_eq!(catalog.voices(&["zh-CN"]), vec!["zh-CN-XiaoxiaoNeural-Female"]);
        assert_eq!(catalog.voices(&[]).len(), 3);
    }

    #[test]
    fn bundled_list_drops_unsupported_locales() {
        let voices = BundledVoiceCatalog::new().voices(&SUPPORT_LOCALES);
        assert!(voices.iter().any(|v| v == "en-US-JennyNeural-Female"));
        assert!(!voices.iter().any(|v| v.starts_with("ja-JP") || v.starts_with("en-GB")));
    }
}
