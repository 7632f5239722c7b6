//! Script and keyword generation through the selected LLM provider.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{sync::OnceLock, time::Duration};
use tracing::{debug, info};

use crate::provider::{LlmProvider, ProviderKind};

#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Narration script for `subject`. An empty `language` lets the model follow the subject.
    async fn generate_script(&self, provider: &LlmProvider, subject: &str, language: &str) -> Result<String>;

    /// Stock-footage search terms for the script.
    async fn generate_terms(&self, provider: &LlmProvider, subject: &str, script: &str) -> Result<Vec<String>>;
}

/// Talks to OpenAI-style `/chat/completions` backends, plus ERNIE's own API.
pub struct ChatScriptGenerator {
    http: reqwest::Client,
    term_count: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse { choices: Vec<ChatChoice> }

#[derive(Deserialize)]
struct ChatChoice { message: ChatReply }

#[derive(Deserialize)]
struct ChatReply { content: Option<String> }

#[derive(Deserialize)]
struct ErnieToken { access_token: String }

#[derive(Deserialize)]
struct ErnieReply {
    result: Option<String>,
    error_msg: Option<String>,
}

const ERNIE_TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

impl ChatScriptGenerator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, term_count: 5 })
    }

    /// ERNIE trades the key pair for an access token, then posts to the model URL.
    async fn ernie_chat(&self, api_key: &str, secret_key: &str, base_url: &str, prompt: &str) -> Result<String> {
        if base_url.is_empty() {
            bail!("ERNIE needs the model request address as base url");
        }
        let token: ErnieToken = self
            .http
            .post(ERNIE_TOKEN_URL)
            .query(&[("grant_type", "client_credentials"), ("client_id", api_key), ("client_secret", secret_key)])
            .send()
            .await
            .context("ERNIE token request failed")?
            .error_for_status()?
            .json()
            .await
            .context("malformed ERNIE token reply")?;
        let reply: ErnieReply = self
            .http
            .post(base_url)
            .query(&[("access_token", token.access_token.as_str())])
            .json(&serde_json::json!({ "messages": [{ "role": "user", "content": prompt }] }))
            .send()
            .await
            .context("ERNIE request failed")?
            .json()
            .await
            .context("malformed ERNIE reply")?;
        match (reply.result, reply.error_msg) {
            (Some(text), _) if !text.trim().is_empty() => Ok(text),
            (_, Some(msg)) => bail!("ERNIE error: {msg}"),
            _ => bail!("ERNIE returned an empty completion"),
        }
    }

    async fn chat(&self, provider: &LlmProvider, prompt: &str) -> Result<String> {
        if let LlmProvider::Ernie { api_key, secret_key, base_url } = provider {
            return self.ernie_chat(api_key, secret_key, base_url, prompt).await;
        }
        let kind = provider.kind();
        let mut endpoint = provider
            .chat_endpoint()
            .ok_or_else(|| anyhow!("{kind} has no chat completions endpoint configured"))?;
        if kind == ProviderKind::Azure {
            endpoint.push_str("?api-version=2024-02-15-preview");
        }
        let body = ChatRequest {
            model: provider.model_name().unwrap_or_default(),
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let mut req = self.http.post(&endpoint).json(&body);
        if let Some(key) = provider.api_key() {
            req = if kind == ProviderKind::Azure { req.header("api-key", key) } else { req.bearer_auth(key) };
        }
        debug!(%endpoint, provider = kind.key(), "chat completion request");
        let resp = req.send().await.context("chat completion request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("{kind} returned {status}: {text}");
        }
        let parsed: ChatResponse = resp.json().await.context("malformed chat completion")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("{kind} returned an empty completion"))
    }
}

fn script_prompt(subject: &str, language: &str) -> String {
    let mut prompt = format!(
        "Write the narration script for a short video.\n\
         Rules:\n\
         - return only the raw narration text as a single paragraph\n\
         - no markdown, no title, no speaker labels such as \"narrator\" or \"voiceover\"\n\
         - start with the content, do not greet the viewer\n\
         - never mention these instructions or the script itself\n\
         Video subject: {subject}\n"
    );
    if !language.is_empty() {
        prompt.push_str(&format!("Language: {language}\n"));
    }
    prompt
}

fn terms_prompt(subject: &str, script: &str, count: usize) -> String {
    format!(
        "Generate {count} search terms for stock videos that match the video below.\n\
         Reply with a JSON array of strings and nothing else, e.g. [\"term 1\", \"term 2\"].\n\
         Each term is 1-3 English words and includes the main subject.\n\
         Video subject: {subject}\n\
         Video script: {script}\n"
    )
}

/// Drops markdown markers and headings the model adds despite being told not to.
pub fn clean_script(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.replace(['*', '`'], ""))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bracketed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").expect("static regex"))
}

/// Accepts a bare JSON array or the first `[...]` block inside chatter.
pub fn parse_terms_reply(reply: &str) -> Result<Vec<String>> {
    let trimmed = reply.trim();
    let terms: Vec<String> = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => {
            let block = bracketed()
                .find(trimmed)
                .ok_or_else(|| anyhow!("no term list in reply: {trimmed}"))?;
            serde_json::from_str(block.as_str()).context("term list is not a JSON string array")?
        }
    };
    Ok(terms.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
}

#[async_trait]
impl ScriptGenerator for ChatScriptGenerator {
    async fn generate_script(&self, provider: &LlmProvider, subject: &str, language: &str) -> Result<String> {
        let reply = self.chat(provider, &script_prompt(subject, language)).await?;
        let script = clean_script(&reply);
        info!(subject, chars = script.len(), "script generated");
        Ok(script)
    }

    async fn generate_terms(&self, provider: &LlmProvider, subject: &str, script: &str) -> Result<Vec<String>> {
        let reply = self.chat(provider, &terms_prompt(subject, script, self.term_count)).await?;
        let terms = parse_terms_reply(&reply)?;
        info!(subject, ?terms, "terms generated");
        Ok(terms)
    }
}
