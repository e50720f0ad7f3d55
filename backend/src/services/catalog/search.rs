use crate::services::{with_store, ServiceError};
use crate::store::Db;
use actix_web::{web, HttpResponse};
use common::requests::SearchQuery;

const MIN_QUERY_CHARS: usize = 2;
const SEARCH_LIMIT: u32 = 100;

pub(crate) async fn process(
    db: web::Data<Db>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let q = query.into_inner().q.trim().to_string();
    if q.chars().count() < MIN_QUERY_CHARS {
        return Ok(HttpResponse::Ok().json(serde_json::json!([])));
    }
    let hits = with_store(&db, move |db| db.search_offers(&q, SEARCH_LIMIT)).await?;
    Ok(HttpResponse::Ok().json(hits))
}
