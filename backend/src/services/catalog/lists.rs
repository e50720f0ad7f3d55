use crate::services::{with_store, ServiceError};
use crate::store::{Db, OfferField, OfferFilter};
use actix_web::{web, HttpResponse};

async fn distinct(
    db: &web::Data<Db>,
    field: OfferField,
    filter: OfferFilter,
) -> Result<HttpResponse, ServiceError> {
    let values = with_store(db, move |db| db.distinct_offer_values(field, &filter)).await?;
    Ok(HttpResponse::Ok().json(values))
}

pub(crate) async fn brands(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    distinct(&db, OfferField::Brand, OfferFilter::default()).await
}

pub(crate) async fn models(
    db: web::Data<Db>,
    brand: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let filter = OfferFilter {
        brand: Some(brand.into_inner()),
        ..Default::default()
    };
    distinct(&db, OfferField::Model, filter).await
}

pub(crate) async fn years(
    db: web::Data<Db>,
    brand: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let filter = OfferFilter {
        brand: Some(brand.into_inner()),
        ..Default::default()
    };
    distinct(&db, OfferField::Year, filter).await
}

pub(crate) async fn models_for_year(
    db: web::Data<Db>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let (brand, year) = path.into_inner();
    let filter = OfferFilter {
        brand: Some(brand),
        year: Some(year),
        ..Default::default()
    };
    distinct(&db, OfferField::Model, filter).await
}

pub(crate) async fn years_for_model(
    db: web::Data<Db>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ServiceError> {
    let (brand, model) = path.into_inner();
    let filter = OfferFilter {
        brand: Some(brand),
        model: Some(model),
        ..Default::default()
    };
    distinct(&db, OfferField::Year, filter).await
}

/// Provider names as found on the first stored record.
pub(crate) async fn providers(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    let names = with_store(&db, |db| db.provider_names()).await?;
    Ok(HttpResponse::Ok().json(names))
}
