mod app_state;
mod camera;
mod config;
mod core;
mod form;
mod location;
mod pipeline;
mod records;
mod web;

use std::{sync::Arc, time::Duration};

use app_state::AppState;
use camera::{ffmpeg_backend::FfmpegBackend, service::CameraService, traits::SharedBackend};
use config::AppConfig;
use location::LocationResolver;
use pipeline::{SubmissionPipeline, Submitter};
use records::{RecordStore, pocketbase::PocketBaseStore};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_appender::rolling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tokio::fs::create_dir_all("logs").await?;
    let file_appender = rolling::daily("logs", "treecam.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tokio::fs::create_dir_all("static").await?;

    let backend: SharedBackend = Arc::new(FfmpegBackend::from_config(&config));
    let camera = CameraService::new(backend);

    let location = LocationResolver::new(location::source::from_config(&config));
    if !location.is_supported() {
        warn!("no position source configured, trees will be submitted without a location");
    }

    let store: Arc<dyn RecordStore> = Arc::new(PocketBaseStore::from_config(&config));
    let pipeline = SubmissionPipeline::new(
        store,
        Submitter {
            id: config.submitter_id.clone(),
            name: config.submitter_name.clone(),
        },
        config.delete_orphaned_trees,
    );

    let state = Arc::new(AppState::new(config.clone(), camera, location, pipeline));
    let app = web::routes::build_router(state.clone());

    {
        let auto_state = state.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(15)).await;
                let idle_seconds = auto_state.idle_seconds().await;
                if idle_seconds <= auto_state.config.auto_shutdown_seconds {
                    continue;
                }

                let mut camera = auto_state.camera.lock().await;
                if camera.is_enabled() {
                    info!("Auto shutdown triggered after {idle_seconds} seconds idle");
                    camera.stop();
                }
            }
        });
    }

    info!(
        "{} listening on {} (records at {}, device: {})",
        config.app_name, config.bind_addr, config.pocketbase_url, config.camera_device
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
