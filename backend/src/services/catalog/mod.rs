//! Read side of the offer catalog, plus the bulk clear used before a fresh
//! import.
//!
//! Lookups go by the `(brand, model, year)` tuple. The tuple is not unique,
//! so "first match" means lowest id.

use actix_web::web::{get, post, ServiceConfig};

mod lists;
mod search;
mod vehicles;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/api/stats", get().to(vehicles::stats))
        .route("/api/vehicles", get().to(vehicles::list))
        .route("/api/vehicles/{id}", get().to(vehicles::by_id))
        .route("/api/vehicle/{brand}/{model}/{year}", get().to(vehicles::lookup))
        .route("/api/brands", get().to(lists::brands))
        .route("/api/models/{brand}", get().to(lists::models))
        .route("/api/years/{brand}", get().to(lists::years))
        .route("/api/models/{brand}/{year}", get().to(lists::models_for_year))
        .route("/api/years/{brand}/{model}", get().to(lists::years_for_model))
        .route("/api/providers", get().to(lists::providers))
        .route("/api/search", get().to(search::process))
        .route("/clear", post().to(vehicles::clear));
}
