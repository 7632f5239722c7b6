use anyhow::{Context, Result};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};
use url::Url;

pub const DEFAULT_IMAGE_ENDPOINT: &str = "https://yescale.one/v1/images/generations";
pub const DEFAULT_TASK_API: &str = "http://127.0.0.1:8080/api/v1";

/// Process-level configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub host: IpAddr,
    pub port: u16,
    pub root_dir: PathBuf,
    pub settings_path: PathBuf,
    pub i18n_dir: PathBuf,
    pub font_dir: PathBuf,
    pub song_dir: PathBuf,
    pub task_dir: PathBuf,
    pub image_endpoint: Url,
    pub image_concurrency: usize,
    pub image_timeout: Duration,
    pub task_api: Url,
    pub open_task_folder: bool,
}

fn env_path(key: &str, fallback: PathBuf) -> PathBuf {
    std::env::var(key).ok().filter(|s| !s.is_empty()).map(PathBuf::from).unwrap_or(fallback)
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok()).unwrap_or(fallback)
}

impl PanelConfig {
    pub fn from_env() -> Result<Self> {
        let root_dir = match std::env::var("PANEL_ROOT") {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => std::env::current_dir().context("cannot resolve working directory")?,
        };
        let image_endpoint = std::env::var("PANEL_IMAGE_ENDPOINT").unwrap_or_else(|_| DEFAULT_IMAGE_ENDPOINT.into());
        let task_api = std::env::var("PANEL_TASK_API").unwrap_or_else(|_| DEFAULT_TASK_API.into());

        Ok(Self {
            host: env_parse("PANEL_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: env_parse("PANEL_PORT", 8501),
            settings_path: env_path("PANEL_SETTINGS", root_dir.join("config.json")),
            i18n_dir: env_path("PANEL_I18N_DIR", root_dir.join("i18n")),
            font_dir: env_path("PANEL_FONT_DIR", root_dir.join("resource").join("fonts")),
            song_dir: env_path("PANEL_SONG_DIR", root_dir.join("resource").join("songs")),
            task_dir: env_path("PANEL_TASK_DIR", root_dir.join("storage").join("tasks")),
            image_endpoint: Url::parse(&image_endpoint)
                .with_context(|| format!("invalid PANEL_IMAGE_ENDPOINT {image_endpoint:?}"))?,
            image_concurrency: env_parse("PANEL_IMAGE_CONCURRENCY", 3usize).max(1),
            image_timeout: Duration::from_secs(env_parse("PANEL_IMAGE_TIMEOUT_SECS", 120u64)),
            task_api: Url::parse(&task_api).with_context(|| format!("invalid PANEL_TASK_API {task_api:?}"))?,
            open_task_folder: env_parse("PANEL_OPEN_FOLDER", true),
            root_dir,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Joins `segment` onto the orchestrator base URL without dropping its path.
    pub fn task_endpoint(&self, segment: &str) -> Result<Url> {
        let mut base = self.task_api.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(segment).with_context(|| format!("cannot build task endpoint for {segment}"))
    }
}

#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> PanelConfig {
    PanelConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        root_dir: root.to_path_buf(),
        settings_path: root.join("config.json"),
        i18n_dir: root.join("i18n"),
        font_dir: root.join("resource").join("fonts"),
        song_dir: root.join("resource").join("songs"),
        task_dir: root.join("storage").join("tasks"),
        image_endpoint: Url::parse(DEFAULT_IMAGE_ENDPOINT).unwrap(),
        image_concurrency: 2,
        image_timeout: Duration::from_secs(5),
        task_api: Url::parse(DEFAULT_TASK_API).unwrap(),
        open_task_folder: false,
    }
}
