//! LLM provider selection.
//!
//! Settings store credentials as flat `<provider>_*` keys; [`LlmProvider`] is the
//! resolved form handed to collaborators, carrying only what that backend needs.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Moonshot,
    Azure,
    Qwen,
    DeepSeek,
    Gemini,
    Ollama,
    G4f,
    OneApi,
    Cloudflare,
    Ernie,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 11] = [
        ProviderKind::OpenAi,
        ProviderKind::Moonshot,
        ProviderKind::Azure,
        ProviderKind::Qwen,
        ProviderKind::DeepSeek,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
        ProviderKind::G4f,
        ProviderKind::OneApi,
        ProviderKind::Cloudflare,
        ProviderKind::Ernie,
    ];

    /// Lower-case key used as the settings prefix.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Moonshot => "moonshot",
            ProviderKind::Azure => "azure",
            ProviderKind::Qwen => "qwen",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::G4f => "g4f",
            ProviderKind::OneApi => "oneapi",
            ProviderKind::Cloudflare => "cloudflare",
            ProviderKind::Ernie => "ernie",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Moonshot => "Moonshot",
            ProviderKind::Azure => "Azure",
            ProviderKind::Qwen => "Qwen",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::G4f => "G4f",
            ProviderKind::OneApi => "OneAPI",
            ProviderKind::Cloudflare => "Cloudflare",
            ProviderKind::Ernie => "ERNIE",
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => Some("qwen:7b"),
            ProviderKind::OpenAi | ProviderKind::G4f => Some("gpt-3.5-turbo"),
            ProviderKind::Moonshot => Some("moonshot-v1-8k"),
            ProviderKind::OneApi => Some("claude-3-5-sonnet-20240620"),
            ProviderKind::Qwen => Some("qwen-max"),
            ProviderKind::Gemini => Some("gemini-1.0-pro"),
            ProviderKind::DeepSeek => Some("deepseek-chat"),
            ProviderKind::Azure | ProviderKind::Cloudflare | ProviderKind::Ernie => None,
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => Some("http://localhost:11434/v1"),
            ProviderKind::DeepSeek => Some("https://api.deepseek.com"),
            ProviderKind::Moonshot => Some("https://api.moonshot.cn/v1"),
            ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            ProviderKind::Qwen => Some("https://dashscope.aliyuncs.com/compatible-mode/v1"),
            ProviderKind::Gemini => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            _ => None,
        }
    }

    /// G4f is the only backend that works without credentials.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::G4f)
    }

    /// ERNIE addresses models through its request URL, so it has no model field.
    pub fn has_model_name(&self) -> bool {
        !matches!(self, ProviderKind::Ernie)
    }

    pub fn tips(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "API Key: any value, e.g. 123. Base Url: usually http://localhost:11434/v1 \
                 (use http://host.docker.internal:11434/v1 from Docker). Model Name: see `ollama list`, e.g. qwen:7b.",
            ProviderKind::OpenAi => "API Key: https://platform.openai.com/api-keys. Base Url: may be left empty. \
                 Model Name: a model your key has access to.",
            ProviderKind::Moonshot => "API Key: https://platform.moonshot.cn/console/api-keys. \
                 Base Url: https://api.moonshot.cn/v1. Model Name: e.g. moonshot-v1-8k.",
            ProviderKind::OneApi => "API Key: your OneAPI key. Base Url: your OneAPI base URL. \
                 Model Name: e.g. claude-3-5-sonnet-20240620.",
            ProviderKind::Qwen => "API Key: https://dashscope.console.aliyun.com/apiKey. Base Url: leave empty. \
                 Model Name: e.g. qwen-max.",
            ProviderKind::G4f => "gpt4free needs no key and is unstable. Base Url: leave empty. \
                 Model Name: e.g. gpt-3.5-turbo.",
            ProviderKind::Azure => "API Key: from the Azure portal. Base Url: your resource endpoint. \
                 Model Name: your deployment name.",
            ProviderKind::Gemini => "API Key: https://ai.google.dev/. Base Url: leave empty. \
                 Model Name: e.g. gemini-1.0-pro.",
            ProviderKind::DeepSeek => "API Key: https://platform.deepseek.com/api_keys. \
                 Base Url: https://api.deepseek.com. Model Name: deepseek-chat.",
            ProviderKind::Ernie => "API Key and Secret Key: from the Qianfan console. \
                 Base Url: the model request address.",
            ProviderKind::Cloudflare => "API Key: a Workers AI token. Account ID: your Cloudflare account id. \
                 Model Name: e.g. @cf/meta/llama-3-8b-instruct.",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown llm provider {0:?}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.key() == needle)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

/// Raw stored credential fields for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub account_id: String,
    pub secret_key: String,
}

/// The selected backend with only the fields it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAiCompatible { kind: ProviderKind, api_key: String, base_url: String, model_name: String },
    G4f { model_name: String },
    Cloudflare { api_key: String, account_id: String, model_name: String },
    Ernie { api_key: String, secret_key: String, base_url: String },
}

impl LlmProvider {
    /// Applies the per-kind defaults to stored credentials.
    pub fn resolve(kind: ProviderKind, creds: &ProviderCredentials) -> Self {
        let or_default = |value: &str, fallback: Option<&str>| {
            if value.is_empty() { fallback.unwrap_or_default().to_string() } else { value.to_string() }
        };
        let model_name = or_default(&creds.model_name, kind.default_model());
        match kind {
            ProviderKind::G4f => LlmProvider::G4f { model_name },
            ProviderKind::Cloudflare => LlmProvider::Cloudflare {
                api_key: creds.api_key.clone(),
                account_id: creds.account_id.clone(),
                model_name,
            },
            ProviderKind::Ernie => LlmProvider::Ernie {
                api_key: creds.api_key.clone(),
                secret_key: creds.secret_key.clone(),
                base_url: creds.base_url.clone(),
            },
            _ => LlmProvider::OpenAiCompatible {
                kind,
                api_key: creds.api_key.clone(),
                base_url: or_default(&creds.base_url, kind.default_base_url()),
                model_name,
            },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            LlmProvider::OpenAiCompatible { kind, .. } => *kind,
            LlmProvider::G4f { .. } => ProviderKind::G4f,
            LlmProvider::Cloudflare { .. } => ProviderKind::Cloudflare,
            LlmProvider::Ernie { .. } => ProviderKind::Ernie,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        let key = match self {
            LlmProvider::OpenAiCompatible { api_key, .. }
            | LlmProvider::Cloudflare { api_key, .. }
            | LlmProvider::Ernie { api_key, .. } => api_key.as_str(),
            LlmProvider::G4f { .. } => return None,
        };
        Some(key).filter(|k| !k.is_empty())
    }

    pub fn model_name(&self) -> Option<&str> {
        match self {
            LlmProvider::OpenAiCompatible { model_name, .. }
            | LlmProvider::G4f { model_name }
            | LlmProvider::Cloudflare { model_name, .. } => Some(model_name.as_str()),
            LlmProvider::Ernie { .. } => None,
        }
    }

    /// OpenAI-style chat completions URL, when the backend offers one.
    pub fn chat_endpoint(&self) -> Option<String> {
        match self {
            LlmProvider::OpenAiCompatible { base_url, .. } if !base_url.is_empty() => {
                Some(format!("{}/chat/completions", base_url.trim_end_matches('/')))
            }
            LlmProvider::Cloudflare { account_id, .. } if !account_id.is_empty() => Some(format!(
                "https://api.cloudflare.com/client/v4/accounts/{account_id}/ai/v1/chat/completions"
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_keys() {
        assert_eq!("deepseek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert_eq!("OneAPI".parse::<ProviderKind>().unwrap(), ProviderKind::OneApi);
        assert!("bard".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn resolve_fills_ollama_defaults() {
        let p = LlmProvider::resolve(ProviderKind::Ollama, &ProviderCredentials::default());
        assert_eq!(p.model_name(), Some("qwen:7b"));
        assert_eq!(p.chat_endpoint().as_deref(), Some("http://localhost:11434/v1/chat/completions"));
        assert_eq!(p.api_key(), None);
    }

    #[test]
    fn resolve_keeps_stored_values() {
        let creds = ProviderCredentials {
            api_key: "sk-1".into(),
            base_url: "https://proxy.local/v1/".into(),
            model_name: "gpt-4o".into(),
            ..Default::default()
        };
        let p = LlmProvider::resolve(ProviderKind::OpenAi, &creds);
        assert_eq!(p.api_key(), Some("sk-1"));
        assert_eq!(p.model_name(), Some("gpt-4o"));
        assert_eq!(p.chat_endpoint().as_deref(), Some("https://proxy.local/v1/chat/completions"));
    }

    #[test]
    fn only_g4f_is_free() {
        let free: Vec<_> = ProviderKind::ALL.into_iter().filter(|k| !k.requires_api_key()).collect();
        assert_eq!(free, vec![ProviderKind::G4f]);
        let ernie = LlmProvider::resolve(ProviderKind::Ernie, &ProviderCredentials::default());
        assert!(ernie.chat_endpoint().is_none());
        assert!(ernie.model_name().is_none());
    }
}
