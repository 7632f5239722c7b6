//! Pre-flight checks and hand-off of a video request to the task pipeline.

use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    settings::Settings,
    task::TaskOrchestrator,
    types::{VideoParams, VideoSource},
};

/// Each variant's message is the translation key shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Video Script and Subject Cannot Both Be Empty")]
    EmptySubjectAndScript,
    #[error("Please Enter the LLM API Key")]
    MissingLlmApiKey,
    #[error("Please Select a Valid Video Source")]
    InvalidVideoSource,
    #[error("Please Enter the Pexels API Key")]
    MissingPexelsApiKey,
    #[error("Please Enter the Pixabay API Key")]
    MissingPixabayApiKey,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Video Generation Failed")]
    Failed { task_id: Uuid },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutcome {
    pub task_id: Uuid,
    pub videos: Vec<String>,
}

/// Checks run in a fixed order; the first failure wins.
pub fn validate(params: &VideoParams, settings: &Settings) -> Result<(), ValidationError> {
    if params.video_subject.is_empty() && params.video_script.is_empty() {
        return Err(ValidationError::EmptySubjectAndScript);
    }
    let provider = settings.llm_provider();
    if provider.kind().requires_api_key() && provider.api_key().is_none() {
        return Err(ValidationError::MissingLlmApiKey);
    }
    let source: VideoSource = params.video_source.parse().map_err(|_| ValidationError::InvalidVideoSource)?;
    match source {
        VideoSource::Pexels if settings.stock_api_keys(source).is_empty() => Err(ValidationError::MissingPexelsApiKey),
        VideoSource::Pixabay if settings.stock_api_keys(source).is_empty() => Err(ValidationError::MissingPixabayApiKey),
        _ => Ok(()),
    }
}

fn videos_of(result: Option<&Value>) -> Option<Vec<String>> {
    let videos = result?.get("videos")?.as_array()?;
    Some(videos.iter().filter_map(|v| v.as_str().map(String::from)).collect())
}

/// Validates, then runs the task to completion.
///
/// Nothing reaches the orchestrator when validation fails.
pub async fn generate_video(
    orchestrator: &dyn TaskOrchestrator,
    params: VideoParams,
    settings: &Settings,
    task_dir: &Path,
    open_folder: bool,
) -> Result<VideoOutcome, DispatchError> {
    validate(&params, settings)?;

    let task_id = Uuid::new_v4();
    info!(%task_id, "Start Generating Video");
    match serde_json::to_string_pretty(&params) {
        Ok(json) => info!(%task_id, params = %json),
        Err(e) => error!(%task_id, error = %e, "cannot serialize params"),
    }

    let result = match orchestrator.start(task_id, params).await {
        Ok(r) => r,
        Err(e) => {
            error!(%task_id, error = %e, "Video Generation Failed");
            return Err(DispatchError::Failed { task_id });
        }
    };
    let Some(videos) = videos_of(result.as_ref()) else {
        error!(%task_id, "Video Generation Failed");
        return Err(DispatchError::Failed { task_id });
    };

    info!(%task_id, count = videos.len(), "Video Generation Completed");
    if open_folder {
        open_task_folder(&task_dir.join(task_id.to_string())).await;
    }
    Ok(VideoOutcome { task_id, videos })
}

fn open_command(path: &Path) -> Option<tokio::process::Command> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = tokio::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        tokio::process::Command::new("open")
    } else if cfg!(target_os = "linux") {
        tokio::process::Command::new("xdg-open")
    } else {
        return None;
    };
    cmd.arg(path);
    Some(cmd)
}

/// Shows the task output in the host file browser. Failures are only logged.
pub async fn open_task_folder(path: &Path) {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return;
    }
    let Some(mut cmd) = open_command(path) else { return };
    match cmd.status().await {
        Ok(status) if !status.success() => error!(path = %path.display(), %status, "cannot open task folder"),
        Err(e) => error!(path = %path.display(), error = %e, "cannot open task folder"),
        Ok(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    struct FakeOrchestrator {
        calls: AtomicUsize,
        reply: Mutex<Option<anyhow::Result<Option<Value>>>>,
    }

    impl FakeOrchestrator {
        fn replying(reply: anyhow::Result<Option<Value>>) -> Self {
            Self { calls: AtomicUsize::new(0), reply: Mutex::new(Some(reply)) }
        }
    }

    #[async_trait]
    impl TaskOrchestrator for FakeOrchestrator {
        async fn start(&self, _task_id: Uuid, _params: VideoParams) -> anyhow::Result<Option<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.reply.lock().unwrap().take();
            reply.unwrap_or(Ok(None))
        }
    }

    fn ready_settings() -> Settings {
        let mut s = Settings::default();
        s.set_provider_kind(ProviderKind::OpenAi);
        s.app.insert("openai_api_key".into(), "sk-1".into());
        s.set_stock_api_keys(VideoSource::Pexels, "px-1");
        s
    }

    fn params(subject: &str, script: &str) -> VideoParams {
        let mut p = VideoParams::new(subject);
        p.video_script = script.into();
        p
    }

    #[test]
    fn checks_run_in_order() {
        let empty = Settings::default();
        assert_eq!(validate(&params("", ""), &empty), Err(ValidationError::EmptySubjectAndScript));
        assert_eq!(validate(&params("cats", ""), &empty), Err(ValidationError::MissingLlmApiKey));

        let mut s = ready_settings();
        let mut p = params("", "A script.");
        p.video_source = "youtube".into();
        assert_eq!(validate(&p, &s), Err(ValidationError::InvalidVideoSource));

        s.app.remove("pexels_api_keys");
        assert_eq!(validate(&params("cats", ""), &s), Err(ValidationError::MissingPexelsApiKey));

        let mut p = params("cats", "");
        p.video_source = "pixabay".into();
        assert_eq!(validate(&p, &s), Err(ValidationError::MissingPixabayApiKey));

        p.video_source = "local".into();
        assert_eq!(validate(&p, &s), Ok(()));
    }

    #[test]
    fn free_provider_needs_no_key() {
        let mut s = Settings::default();
        s.set_provider_kind(ProviderKind::G4f);
        let mut p = params("cats", "");
        p.video_source = "local".into();
        assert_eq!(validate(&p, &s), Ok(()));
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_orchestrator() {
        let orch = FakeOrchestrator::replying(Ok(Some(json!({ "videos": [] }))));
        let dir = tempfile::tempdir().unwrap();
        let err = generate_video(&orch, params("", ""), &ready_settings(), dir.path(), false).await.unwrap_err();
        assert!(matches!(err, DispatchError::Invalid(ValidationError::EmptySubjectAndScript)));
        assert_eq!(orch.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn result_without_videos_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        for reply in [Ok(Some(json!({ "combined_videos": ["a.mp4"] }))), Ok(None), Err(anyhow::anyhow!("crashed"))] {
            let orch = FakeOrchestrator::replying(reply);
            let err = generate_video(&orch, params("cats", ""), &ready_settings(), dir.path(), false).await.unwrap_err();
            assert!(matches!(err, DispatchError::Failed { .. }));
            assert_eq!(err.to_string(), "Video Generation Failed");
            assert_eq!(orch.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn returns_videos_with_fresh_task_id() {
        let orch = FakeOrchestrator::replying(Ok(Some(json!({ "videos": ["http://v/1.mp4", "http://v/2.mp4"] }))));
        let dir = tempfile::tempdir().unwrap();
        let out = generate_video(&orch, params("cats", ""), &ready_settings(), dir.path(), true).await.unwrap();
        assert_eq!(out.videos, vec!["http://v/1.mp4", "http://v/2.mp4"]);
        assert!(!out.task_id.is_nil());
    }

    #[tokio::test]
    async fn opening_missing_folder_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        open_task_folder(&dir.path().join("does-not-exist")).await;
    }
}
