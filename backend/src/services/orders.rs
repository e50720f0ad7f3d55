//! Quote purchase orders.
//!
//! - `POST /api/orders`: customer submits an order for one quoted offer.
//! - `GET /admin/orders`: every order, newest first.
//! - `POST /admin/orders/{id}/status`: set `pending` or `paid`.
//! - `DELETE /admin/orders/{id}`
//! - `POST /admin/orders/cleanup`: drop orders older than 48 hours.

use crate::services::ServiceError;
use crate::store::Db;
use actix_web::web::{delete, get, post, ServiceConfig};
use actix_web::{web, HttpResponse};
use chrono::{Duration, SecondsFormat, Utc};
use common::model::order::PaymentStatus;
use common::requests::{NewOrder, StatusChange};
use log::info;
use serde_json::json;

const RETENTION_HOURS: i64 = 48;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/api/orders", post().to(create))
        .route("/admin/orders", get().to(list))
        .route("/admin/orders/cleanup", post().to(cleanup))
        .route("/admin/orders/{id}/status", post().to(set_status))
        .route("/admin/orders/{id}", delete().to(remove));
}

fn validate(order: &NewOrder) -> Result<(), ServiceError> {
    for (name, value) in [
        ("national_id", &order.national_id),
        ("full_name", &order.full_name),
        ("phone", &order.phone),
        ("plate", &order.plate),
        ("brand", &order.brand),
        ("model", &order.model),
        ("year", &order.year),
        ("provider", &order.provider),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::BadRequest(format!("{name} is required")));
        }
    }
    if order.price == 0 || i64::try_from(order.price).is_err() {
        return Err(ServiceError::BadRequest("price is out of range".into()));
    }
    Ok(())
}

async fn create(
    db: web::Data<Db>,
    order: web::Json<NewOrder>,
) -> Result<HttpResponse, ServiceError> {
    validate(&order)?;
    let stored = db.insert_order(&order)?;
    info!("order {} created for {}", stored.id, stored.plate);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "order_id": stored.id,
        "order": stored,
    })))
}

async fn list(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(db.list_orders()?))
}

async fn set_status(
    db: web::Data<Db>,
    id: web::Path<i64>,
    change: web::Json<StatusChange>,
) -> Result<HttpResponse, ServiceError> {
    let id = id.into_inner();
    let status = PaymentStatus::parse(&change.status)
        .ok_or_else(|| ServiceError::BadRequest(format!("invalid status '{}'", change.status)))?;
    if !db.set_order_status(id, status)? {
        return Err(ServiceError::NotFound("order"));
    }
    let order = db.get_order(id)?.ok_or(ServiceError::NotFound("order"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

async fn remove(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    if !db.delete_order(id.into_inner())? {
        return Err(ServiceError::NotFound("order"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn cleanup(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    let cutoff = (Utc::now() - Duration::hours(RETENTION_HOURS))
        .to_rfc3339_opts(SecondsFormat::Micros, true);
    let deleted = db.delete_orders_before(&cutoff)?;
    info!("removed {} orders created before {}", deleted, cutoff);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "deleted": deleted })))
}
