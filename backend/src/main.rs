mod config;
mod ingest;
mod job_controller;
mod services;
mod store;

use crate::config::AppConfig;
use crate::job_controller::state::{start_job_updater, JobStateStore};
use crate::services::settings::LOGO_URL_PREFIX;
use crate::store::Db;
use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};
use std::io;

/// Progress messages buffered between the import worker and the state updater.
const JOB_CHANNEL_CAPACITY: usize = 256;

#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("could not read .env: {}", e);
        }
    }
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    std::fs::create_dir_all(&config.upload_dir)?;
    std::fs::create_dir_all(&config.logo_dir)?;
    remove_stale_uploads(&config);

    let db = Db::open(&config.database_path).map_err(io::Error::other)?;
    info!(
        "catalog database at {} holds {} offer records",
        config.database_path.display(),
        db.count_offers().map_err(io::Error::other)?
    );

    // Initialize job controller state
    let (jobs, rx) = JobStateStore::new(JOB_CHANNEL_CAPACITY);
    let updater_state = jobs.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    let bind = (config.host.clone(), config.port);
    info!("Server running at http://{}:{}", bind.0, bind.1);

    let logo_dir = config.logo_dir.clone();
    let db = web::Data::new(db);
    let jobs = web::Data::new(jobs);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::JsonConfig::default().limit(1024 * 1024)) // 1 MB
            .app_data(db.clone())
            .app_data(jobs.clone())
            .app_data(config.clone())
            .configure(services::configure)
            .service(Files::new(LOGO_URL_PREFIX, logo_dir.clone()))
    })
    .bind(bind)?
    .run()
    .await
}

/// Deletes spreadsheets left in the upload folder by an interrupted run.
fn remove_stale_uploads(config: &AppConfig) {
    let entries = match std::fs::read_dir(&config.upload_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("could not list {}: {}", config.upload_dir.display(), e);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("removed stale upload {}", path.display()),
                Err(e) => warn!("could not remove stale upload {}: {}", path.display(), e),
            }
        }
    }
}
