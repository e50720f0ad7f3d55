//! Spreadsheet import endpoints.
//!
//! - `POST /upload`: multipart upload with a `file` field holding an `.xlsx`
//!   or `.xls` price list. The file is streamed to the upload folder under a
//!   random name while its MD5 is computed, then handed to the background
//!   import job. Answers `202 Accepted` with the job id, or `409 Conflict`
//!   when an import is already running.
//! - `GET /upload-status`: snapshot of the current (or last) import job.

use actix_web::web::{get, post, ServiceConfig};

mod get_status;
mod start;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/upload", post().to(start::process))
        .route("/upload-status", get().to(get_status::process));
}
