//! HTTP surface of the catalog.
//!
//! Every sub-module exposes a `configure` function registering its resources;
//! `main.rs` applies them all through [`configure`]. Handlers return
//! `Result<HttpResponse, ServiceError>` and let `?` turn failures into JSON
//! error bodies.
//!
//! - `upload`: spreadsheet import start and status polling.
//! - `catalog`: read side of the offer store (lookups, distinct lists, search).
//! - `orders`, `bank_accounts`, `cancel_requests`: flat admin CRUD.
//! - `settings`: site logo.

mod bank_accounts;
mod cancel_requests;
mod catalog;
mod error;
mod orders;
pub mod settings;
mod upload;

pub use error::ServiceError;

use crate::store::{Db, StoreError};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    upload::configure(cfg);
    catalog::configure(cfg);
    orders::configure(cfg);
    bank_accounts::configure(cfg);
    cancel_requests::configure(cfg);
    settings::configure(cfg);
}

/// Runs `f` against the store on the blocking thread pool, off the worker
/// that serves the request.
pub(crate) async fn with_store<T, F>(db: &web::Data<Db>, f: F) -> Result<T, ServiceError>
where
    F: FnOnce(&Db) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    Ok(web::block(move || f(&db)).await??)
}
