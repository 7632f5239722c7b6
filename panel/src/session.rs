use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

pub const SESSION_HEADER: &str = "x-session-id";
pub const DEFAULT_SESSION: &str = "default";

/// Transient form state for one browser session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub video_subject: String,
    pub video_script: String,
    /// Comma-joined, as shown in the keywords field.
    pub video_terms: String,
    pub ui_language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionUpdate {
    pub video_subject: Option<String>,
    pub video_script: Option<String>,
    pub video_terms: Option<String>,
    pub ui_language: Option<String>,
}

impl Session {
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(v) = update.video_subject { self.video_subject = v; }
        if let Some(v) = update.video_script { self.video_script = v; }
        if let Some(v) = update.video_terms { self.video_terms = v; }
        if let Some(v) = update.ui_language { self.ui_language = v; }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore(Arc<RwLock<HashMap<String, Session>>>);

impl SessionStore {
    /// Unknown sessions start empty, with the saved UI language.
    pub async fn get(&self, id: &str, default_language: &str) -> Session {
        self.0.read().await.get(id).cloned().unwrap_or_else(|| Session {
            ui_language: default_language.to_string(),
            ..Default::default()
        })
    }

    pub async fn update<F: FnOnce(&mut Session)>(&self, id: &str, default_language: &str, f: F) -> Session {
        let mut sessions = self.0.write().await;
        let session = sessions.entry(id.to_string()).or_insert_with(|| Session {
            ui_language: default_language.to_string(),
            ..Default::default()
        });
        f(session);
        session.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::default();
        store.update("a", "en-US", |s| s.video_subject = "cats".into()).await;
        assert_eq!(store.get("a", "en-US").await.video_subject, "cats");

        let fresh = store.get("b", "zh-CN").await;
        assert_eq!(fresh.video_subject, "");
        assert_eq!(fresh.ui_language, "zh-CN");
    }

    #[test]
    fn apply_only_touches_given_fields() {
        let mut s = Session { video_script: "keep".into(), ..Default::default() };
        s.apply(SessionUpdate { video_subject: Some("new".into()), ..Default::default() });
        assert_eq!(s.video_subject, "new");
        assert_eq!(s.video_script, "keep");
    }
}
