use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::settings::UiPreferences;

/// Stock footage providers accepted by the task pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSource { Pexels, Pixabay, Local }

impl VideoSource {
    pub const ALL: [VideoSource; 3] = [VideoSource::Pexels, VideoSource::Pixabay, VideoSource::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoSource::Pexels => "pexels",
            VideoSource::Pixabay => "pixabay",
            VideoSource::Local => "local",
        }
    }

    /// Settings key holding the comma-joined API keys, if the source needs any.
    pub fn keys_setting(&self) -> Option<&'static str> {
        match self {
            VideoSource::Pexels => Some("pexels_api_keys"),
            VideoSource::Pixabay => Some("pixabay_api_keys"),
            VideoSource::Local => None,
        }
    }
}

impl FromStr for VideoSource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoSource::ALL.into_iter().find(|v| v.as_str() == s).ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoConcatMode { #[default] Random, Sequential }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoAspect {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BgmType { #[default] Random, None, Custom }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition { Top, Center, #[default] Bottom }

/// Everything the task pipeline needs for one video request.
///
/// Built fresh for each request, handed to the orchestrator by value, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoParams {
    pub video_subject: String,
    pub video_script: String,
    pub video_terms: Vec<String>,
    /// Locale code, empty for auto-detect.
    pub video_language: String,
    pub video_source: String,
    pub video_concat_mode: VideoConcatMode,
    pub video_aspect: VideoAspect,
    pub video_clip_duration: u32,
    pub video_count: u32,
    pub voice_name: String,
    pub voice_volume: f32,
    pub voice_rate: f32,
    pub bgm_type: BgmType,
    pub bgm_file: String,
    pub bgm_volume: f32,
    pub subtitle_enabled: bool,
    pub font_name: String,
    pub font_size: u32,
    pub subtitle_position: SubtitlePosition,
    pub text_fore_color: String,
    pub stroke_color: String,
    pub stroke_width: f32,
}

impl VideoParams {
    pub fn new(video_subject: impl Into<String>) -> Self {
        Self {
            video_subject: video_subject.into(),
            video_script: String::new(),
            video_terms: Vec::new(),
            video_language: String::new(),
            video_source: VideoSource::Pexels.as_str().into(),
            video_concat_mode: VideoConcatMode::Random,
            video_aspect: VideoAspect::Landscape,
            video_clip_duration: 3,
            video_count: 1,
            voice_name: String::new(),
            voice_volume: 1.0,
            voice_rate: 1.0,
            bgm_type: BgmType::Random,
            bgm_file: String::new(),
            bgm_volume: 0.2,
            subtitle_enabled: true,
            font_name: String::new(),
            font_size: 60,
            subtitle_position: SubtitlePosition::Bottom,
            text_fore_color: "#FFFFFF".into(),
            stroke_color: "#000000".into(),
            stroke_width: 1.5,
        }
    }

    /// Fills the params the way the form does: submitted values first, then
    /// the session, then saved UI preferences, then fixed defaults.
    pub fn from_form(form: &VideoForm, session: &crate::session::Session, ui: &UiPreferences) -> Self {
        let subject = form.video_subject.as_deref().unwrap_or(&session.video_subject).trim();
        let mut params = VideoParams::new(subject);
        params.video_script = form.video_script.clone().unwrap_or_else(|| session.video_script.clone());
        params.video_terms = parse_terms(form.video_terms.as_deref().unwrap_or(&session.video_terms));
        params.video_language = form.video_language.clone().unwrap_or_default();
        if let Some(source) = &form.video_source { params.video_source = source.clone(); }
        if let Some(mode) = form.video_concat_mode { params.video_concat_mode = mode; }
        if let Some(aspect) = form.video_aspect { params.video_aspect = aspect; }
        if let Some(d) = form.video_clip_duration { params.video_clip_duration = d; }
        if let Some(c) = form.video_count { params.video_count = c; }
        params.voice_name = form.voice_name.clone().unwrap_or_else(|| ui.voice_name.clone());
        if let Some(v) = form.voice_volume { params.voice_volume = v; }
        if let Some(r) = form.voice_rate { params.voice_rate = r; }
        if let Some(b) = form.bgm_type { params.bgm_type = b; }
        if let Some(f) = &form.bgm_file { params.bgm_file = f.clone(); }
        if let Some(v) = form.bgm_volume { params.bgm_volume = v; }
        if let Some(s) = form.subtitle_enabled { params.subtitle_enabled = s; }
        params.font_name = form.font_name.clone().unwrap_or_else(|| ui.font_name.clone());
        params.font_size = form.font_size.unwrap_or(ui.font_size);
        if let Some(p) = form.subtitle_position { params.subtitle_position = p; }
        params.text_fore_color = form.text_fore_color.clone().unwrap_or_else(|| ui.text_fore_color.clone());
        if let Some(c) = &form.stroke_color { params.stroke_color = c.clone(); }
        if let Some(w) = form.stroke_width { params.stroke_width = w; }
        params
    }
}

/// Splits a comma-joined keyword field into trimmed, non-empty terms.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(String::from).collect()
}

pub fn join_terms(terms: &[String]) -> String { terms.join(", ") }

/// Submitted form fields; anything left out falls back to session and preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoForm {
    pub video_subject: Option<String>,
    pub video_script: Option<String>,
    pub video_terms: Option<String>,
    pub video_language: Option<String>,
    pub video_source: Option<String>,
    pub video_concat_mode: Option<VideoConcatMode>,
    pub video_aspect: Option<VideoAspect>,
    pub video_clip_duration: Option<u32>,
    pub video_count: Option<u32>,
    pub voice_name: Option<String>,
    pub voice_volume: Option<f32>,
    pub voice_rate: Option<f32>,
    pub bgm_type: Option<BgmType>,
    pub bgm_file: Option<String>,
    pub bgm_volume: Option<f32>,
    pub subtitle_enabled: Option<bool>,
    pub font_name: Option<String>,
    pub font_size: Option<u32>,
    pub subtitle_position: Option<SubtitlePosition>,
    pub text_fore_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptRequest {
    pub video_subject: Option<String>,
    pub video_language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsRequest {
    pub video_subject: Option<String>,
    pub video_script: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    pub video_script: String,
    pub video_terms: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRequest {
    pub video_script: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse { pub job_id: String }

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphImages {
    pub paragraph: String,
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub progress: u32,
    pub total: u32,
    pub results: Vec<ParagraphImages>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub task_id: String,
    pub videos: Vec<String>,
    /// Log lines emitted while the task ran; left out when the user hides the log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}
