use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    assets,
    config::PanelConfig,
    dispatch::{self, DispatchError},
    error::{ApiError, ApiResult},
    i18n::{Locales, SUPPORT_LOCALES},
    images::ImageClient,
    jobs::{Job, JobStatus, JobStore, FINISHED_JOB_TTL},
    logs,
    llm::ScriptGenerator,
    provider::ProviderKind,
    session::{Session, SessionStore, SessionUpdate, DEFAULT_SESSION, SESSION_HEADER},
    settings::{Settings, SettingsUpdate},
    split::split_paragraphs,
    task::TaskOrchestrator,
    types::{
        join_terms, ImageRequest, ScriptRequest, ScriptResponse, StatusResponse, SubmitResponse, TermsRequest,
        VideoForm, VideoParams, VideoResponse,
    },
    voice::VoiceCatalog,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PanelConfig>,
    pub settings: Arc<RwLock<Settings>>,
    pub sessions: SessionStore,
    pub jobs: JobStore,
    pub locales: Arc<Locales>,
    pub images: ImageClient,
    pub scripts: Arc<dyn ScriptGenerator>,
    pub voices: Arc<dyn VoiceCatalog>,
    pub orchestrator: Arc<dyn TaskOrchestrator>,
}

impl AppState {
    fn tr(&self, session: &Session, key: &str) -> String {
        self.locales.tr(&session.ui_language, key).to_string()
    }

    async fn session(&self, headers: &HeaderMap) -> (String, Session) {
        let id = session_id(headers);
        let language = self.settings.read().await.ui.language.clone();
        let session = self.sessions.get(&id, &language).await;
        (id, session)
    }

    async fn update_session(&self, id: &str, f: impl FnOnce(&mut Session)) -> Session {
        let language = self.settings.read().await.ui.language.clone();
        self.sessions.update(id, &language, f).await
    }
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/options", get(get_options))
        .route("/session", get(get_session).put(put_session))
        .route("/script", post(generate_script))
        .route("/terms", post(generate_terms))
        .route("/images", post(submit_images))
        .route("/images/:id", get(get_image_job))
        .route("/video", post(generate_video))
        .with_state(state)
}

async fn get_settings(State(state): State<AppState>) -> ApiResult<Settings> {
    Ok(Json(state.settings.read().await.redacted()))
}

async fn put_settings(State(state): State<AppState>, Json(update): Json<SettingsUpdate>) -> ApiResult<Settings> {
    let mut settings = state.settings.write().await;
    let mut next = settings.clone();
    next.apply(update).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    next.save(&state.config.settings_path).await?;
    info!(provider = next.provider_kind().key(), "settings saved");
    *settings = next;
    Ok(Json(settings.redacted()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderOption {
    key: &'static str,
    name: &'static str,
    requires_api_key: bool,
    has_model_name: bool,
    default_model: Option<&'static str>,
    tips: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptLanguage {
    label: String,
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsResponse {
    providers: Vec<ProviderOption>,
    ui_languages: Vec<String>,
    script_languages: Vec<ScriptLanguage>,
    voices: Vec<String>,
    fonts: Vec<String>,
    songs: Vec<String>,
    hide_log: bool,
}

async fn get_options(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<OptionsResponse> {
    let (_, session) = state.session(&headers).await;
    let providers = ProviderKind::ALL
        .into_iter()
        .map(|k| ProviderOption {
            key: k.key(),
            name: k.display_name(),
            requires_api_key: k.requires_api_key(),
            has_model_name: k.has_model_name(),
            default_model: k.default_model(),
            tips: k.tips(),
        })
        .collect();
    let mut script_languages = vec![ScriptLanguage { label: state.tr(&session, "Auto Detect"), code: String::new() }];
    script_languages.extend(SUPPORT_LOCALES.iter().map(|c| ScriptLanguage { label: c.to_string(), code: c.to_string() }));

    Ok(Json(OptionsResponse {
        providers,
        ui_languages: state.locales.display_names(),
        script_languages,
        voices: state.voices.voices(&SUPPORT_LOCALES),
        fonts: assets::list_fonts(&state.config.font_dir),
        songs: assets::list_songs(&state.config.song_dir),
        hide_log: state.settings.read().await.hide_log(),
    }))
}

async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Session> {
    Ok(Json(state.session(&headers).await.1))
}

async fn put_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<SessionUpdate>,
) -> ApiResult<Session> {
    let id = session_id(&headers);
    Ok(Json(state.update_session(&id, |s| s.apply(update)).await))
}

async fn generate_script(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ScriptRequest>,
) -> ApiResult<ScriptResponse> {
    let (id, session) = state.session(&headers).await;
    let subject = req.video_subject.unwrap_or_else(|| session.video_subject.clone()).trim().to_string();
    let provider = state.settings.read().await.llm_provider();

    let script = state.scripts.generate_script(&provider, &subject, &req.video_language).await.map_err(|e| {
        error!(error = %e, "script generation failed");
        ApiError::Upstream(state.tr(&session, "Script Generation Failed"))
    })?;
    let terms = state.scripts.generate_terms(&provider, &subject, &script).await.map_err(|e| {
        error!(error = %e, "keyword generation failed");
        ApiError::Upstream(state.tr(&session, "Keyword Generation Failed"))
    })?;

    let terms = join_terms(&terms);
    state
        .update_session(&id, |s| {
            s.video_subject = subject;
            s.video_script = script.clone();
            s.video_terms = terms.clone();
        })
        .await;
    Ok(Json(ScriptResponse { video_script: script, video_terms: terms }))
}

async fn generate_terms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TermsRequest>,
) -> ApiResult<ScriptResponse> {
    let (id, session) = state.session(&headers).await;
    let script = req.video_script.unwrap_or_else(|| session.video_script.clone());
    if script.trim().is_empty() {
        return Err(ApiError::BadRequest(state.tr(&session, "Please Enter the Video Subject")));
    }
    let subject = req.video_subject.unwrap_or_else(|| session.video_subject.clone());
    let provider = state.settings.read().await.llm_provider();

    let terms = state.scripts.generate_terms(&provider, &subject, &script).await.map_err(|e| {
        error!(error = %e, "keyword generation failed");
        ApiError::Upstream(state.tr(&session, "Keyword Generation Failed"))
    })?;
    let terms = join_terms(&terms);
    state
        .update_session(&id, |s| {
            s.video_script = script.clone();
            s.video_terms = terms.clone();
        })
        .await;
    Ok(Json(ScriptResponse { video_script: script, video_terms: terms }))
}

async fn submit_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ImageRequest>,
) -> ApiResult<SubmitResponse> {
    let (_, session) = state.session(&headers).await;
    let script = req.video_script.unwrap_or_else(|| session.video_script.clone());
    if script.trim().is_empty() {
        return Err(ApiError::BadRequest(state.tr(&session, "Please Enter the Video Subject")));
    }
    let paragraphs = split_paragraphs(&script);
    // The image endpoint has no credential of its own; it reuses the selected LLM provider's key.
    let token = state.settings.read().await.provider_api_key();

    let evicted = state.jobs.evict_finished(FINISHED_JOB_TTL).await;
    if evicted > 0 {
        info!(evicted, "dropped finished image jobs");
    }
    let job = Job::new(paragraphs.len());
    let job_id = state.jobs.insert(job).await;
    info!(%job_id, paragraphs = paragraphs.len(), "image generation queued");

    let store = state.jobs.clone();
    let images = state.images.clone();
    tokio::spawn(async move {
        store.update(&job_id, |j| j.status = JobStatus::Running).await;
        let results = images.generate_stream(paragraphs, &token);
        futures_util::pin_mut!(results);
        while let Some(item) = results.next().await {
            store
                .update(&job_id, |j| {
                    j.results.push(item);
                    j.progress += 1;
                })
                .await;
        }
        store
            .update(&job_id, |j| {
                j.finish();
                info!(%job_id, status = ?j.status, elapsed_ms = j.created_at.elapsed().as_millis() as u64, "image job finished");
            })
            .await;
    });

    Ok(Json(SubmitResponse { job_id: job_id.to_string() }))
}

async fn get_image_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusResponse> {
    let uid = Uuid::parse_str(&id).map_err(|_| ApiError::BadRequest("invalid id".into()))?;
    match state.jobs.get(&uid).await {
        Some(job) => Ok(Json(job.to_status_response())),
        None => Err(ApiError::NotFound("not found".into())),
    }
}

async fn generate_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<VideoForm>,
) -> ApiResult<VideoResponse> {
    let (id, session) = state.session(&headers).await;
    let settings = state.settings.read().await.clone();
    let params = VideoParams::from_form(&form, &session, &settings.ui);

    let subject = params.video_subject.clone();
    let script = params.video_script.clone();
    let terms = join_terms(&params.video_terms);

    let (result, lines) = logs::capture(dispatch::generate_video(
        state.orchestrator.as_ref(),
        params,
        &settings,
        &state.config.task_dir,
        state.config.open_task_folder,
    ))
    .await;

    // A rejected request leaves the session as it was.
    if !matches!(result, Err(DispatchError::Invalid(_))) {
        state
            .update_session(&id, |s| {
                s.video_subject = subject;
                s.video_script = script;
                s.video_terms = terms;
            })
            .await;
    }

    let outcome = result.map_err(|e| match e {
        DispatchError::Invalid(v) => {
            warn!(reason = %v, "video request rejected");
            ApiError::BadRequest(state.tr(&session, &v.to_string()))
        }
        DispatchError::Failed { .. } => ApiError::Upstream(state.tr(&session, &e.to_string())),
    })?;

    let logs = (!settings.hide_log()).then_some(lines);
    Ok(Json(VideoResponse { task_id: outcome.task_id.to_string(), videos: outcome.videos, logs }))
}
