mod assets; mod config; mod dispatch; mod error; mod i18n; mod images; mod jobs; mod llm; mod logs;
mod provider; mod routes; mod session; mod settings; mod split; mod task; mod types; mod voice;

use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::PanelConfig;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(logs::CaptureLayer)
        .init();

    let config = PanelConfig::from_env()?;
    info!(root = %config.root_dir.display(), task_api = %config.task_api, "Starting panel");
    let settings = settings::Settings::load(&config.settings_path).await?;
    info!(path = %config.settings_path.display(), provider = settings.provider_kind().key(), "Loaded settings");
    let locales = i18n::load_locales(&config.i18n_dir)?;
    info!(count = locales.0.len(), "Loaded locales");

    let images = images::ImageClient::new(config.image_endpoint.clone(), config.image_timeout, config.image_concurrency)?;
    let scripts = llm::ChatScriptGenerator::new(Duration::from_secs(120))?;
    let orchestrator = task::HttpOrchestrator::new(config.task_endpoint("tasks")?)?;
    let addr = config.listen_addr();

    let state = AppState {
        config: Arc::new(config),
        settings: Arc::new(RwLock::new(settings)),
        sessions: session::SessionStore::default(),
        jobs: jobs::JobStore::default(),
        locales: Arc::new(locales),
        images,
        scripts: Arc::new(scripts),
        voices: Arc::new(voice::BundledVoiceCatalog::new()),
        orchestrator: Arc::new(orchestrator),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?addr, "Panel listening");
    axum::serve(listener, app).await?;
    Ok(())
}
