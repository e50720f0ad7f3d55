use crate::services::{with_store, ServiceError};
use crate::store::{Db, OfferField, OfferFilter};
use actix_web::{web, HttpResponse};
use common::model::offer::CatalogStats;
use common::requests::PageQuery;
use log::info;
use serde_json::json;

const DEFAULT_PAGE_SIZE: u32 = 50;
const MAX_PAGE_SIZE: u32 = 500;

pub(crate) async fn stats(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    let stats = with_store(&db, |db| {
        let brands = db.distinct_offer_values(OfferField::Brand, &OfferFilter::default())?;
        Ok(CatalogStats {
            total_records: db.count_offers()?,
            unique_brands: brands.len() as u64,
            providers: db.provider_names()?,
        })
    })
    .await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub(crate) async fn list(
    db: web::Data<Db>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let records = with_store(&db, move |db| db.list_offers(page, per_page)).await?;
    Ok(HttpResponse::Ok().json(records))
}

pub(crate) async fn by_id(
    db: web::Data<Db>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let id = id.into_inner();
    match with_store(&db, move |db| db.get_offer(id)).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Err(ServiceError::NotFound("vehicle")),
    }
}

pub(crate) async fn lookup(
    db: web::Data<Db>,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let (brand, model, year) = path.into_inner();
    let filter = OfferFilter {
        brand: Some(brand),
        model: Some(model),
        year: Some(year),
    };
    let first = with_store(&db, move |db| db.filter_offers(&filter, Some(1))).await?;
    match first.into_iter().next() {
        Some(record) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": record }))),
        None => Ok(HttpResponse::NotFound().json(json!({
            "success": false,
            "message": "no offers for this vehicle",
        }))),
    }
}

pub(crate) async fn clear(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    let deleted = with_store(&db, |db| db.clear_offers()).await?;
    info!("cleared {} offer records", deleted);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "deleted": deleted })))
}
