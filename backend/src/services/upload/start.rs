use crate::config::AppConfig;
use crate::ingest::{allowed_extension, IngestError};
use crate::job_controller::runner::schedule_ingest_job;
use crate::job_controller::state::JobStateStore;
use crate::services::ServiceError;
use crate::store::{Db, OfferSink};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use common::requests::UploadAccepted;
use futures_util::StreamExt;
use log::{debug, info, warn};
use md5::Context;
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Staged spreadsheet on disk. Removed on drop unless handed to the import
/// job, so every early return cleans up after itself.
struct StagedFile {
    path: PathBuf,
    handed_off: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        StagedFile {
            path,
            handed_off: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The import job owns the file from now on.
    fn hand_off(&mut self) {
        self.handed_off = true;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.handed_off {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("discarded staged upload {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {}", self.path.display(), e),
        }
    }
}

/// A spreadsheet written to the upload folder, not yet imported.
struct StagedUpload {
    file: StagedFile,
    file_name: String,
    md5: String,
    bytes: u64,
}

pub(crate) async fn process(
    payload: Multipart,
    db: web::Data<Db>,
    jobs: web::Data<JobStateStore>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    // Refuse before reading the body when the slot is visibly taken.
    if jobs.is_processing().await {
        return Err(ServiceError::Conflict(IngestError::AlreadyRunning.to_string()));
    }

    let mut staged = stage_upload(payload, &config.upload_dir, config.max_upload_bytes).await?;
    let sink: Arc<dyn OfferSink> = Arc::new(db.get_ref().clone());
    let path = staged.file.path().to_path_buf();

    match schedule_ingest_job(&jobs, sink, path, config.ingest).await {
        Ok(job_id) => {
            staged.file.hand_off();
            Ok(HttpResponse::Accepted().json(UploadAccepted {
                job_id,
                file_name: staged.file_name,
                md5: staged.md5,
                bytes: staged.bytes,
            }))
        }
        Err(rejected) => {
            warn!(
                "upload {} rejected, import {:?} still running",
                staged.file_name, rejected.running_job
            );
            Err(ServiceError::Conflict(IngestError::AlreadyRunning.to_string()))
        }
    }
}

/// Streams the `file` field of `payload` into `upload_dir`.
async fn stage_upload(
    mut payload: Multipart,
    upload_dir: &Path,
    max_bytes: u64,
) -> Result<StagedUpload, ServiceError> {
    let mut staged: Option<StagedUpload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if name.as_deref() != Some("file") || staged.is_some() {
            // Drain fields we do not use so the stream can advance.
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        if file_name.trim().is_empty() {
            return Err(ServiceError::BadRequest("no file selected".into()));
        }
        let ext = allowed_extension(&file_name).ok_or_else(|| {
            ServiceError::BadRequest(IngestError::UnsupportedExtension(file_name.clone()).to_string())
        })?;

        let file = StagedFile::new(upload_dir.join(format!("{}.{}", uuid::Uuid::new_v4(), ext)));
        let (md5, bytes) = write_field(&mut field, file.path(), max_bytes).await?;
        info!(
            "staged {} ({} bytes, md5 {}) as {}",
            file_name,
            bytes,
            md5,
            file.path().display()
        );
        staged = Some(StagedUpload {
            file,
            file_name,
            md5,
            bytes,
        });
    }

    staged.ok_or_else(|| ServiceError::BadRequest("no file uploaded".into()))
}

/// Writes one multipart field to `path`, hashing it on the way.
async fn write_field(
    field: &mut Field,
    path: &Path,
    max_bytes: u64,
) -> Result<(String, u64), ServiceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut md5_hasher = Context::new();
    let mut bytes = 0u64;

    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        bytes += chunk.len() as u64;
        if bytes > max_bytes {
            return Err(ServiceError::PayloadTooLarge(max_bytes));
        }
        md5_hasher.consume(&chunk);
        writer.write_all(&chunk)?;
    }
    writer.flush()?;

    Ok((format!("{:x}", md5_hasher.finalize()), bytes))
}
