//! Policy cancellation requests.

use crate::services::ServiceError;
use crate::store::Db;
use actix_web::web::{delete, get, post, ServiceConfig};
use actix_web::{web, HttpResponse};
use common::model::cancel_request::CancelStatus;
use common::requests::{NewCancelRequest, NotesChange, StatusChange};
use log::info;
use serde_json::json;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/api/cancel-request", post().to(create))
        .route("/admin/cancel-requests", get().to(list))
        .route("/admin/cancel-requests/{id}/status", post().to(set_status))
        .route("/admin/cancel-requests/{id}/notes", post().to(set_notes))
        .route("/admin/cancel-requests/{id}", delete().to(remove));
}

async fn create(
    db: web::Data<Db>,
    request: web::Json<NewCancelRequest>,
) -> Result<HttpResponse, ServiceError> {
    if [&request.name, &request.phone, &request.plate]
        .iter()
        .any(|v| v.trim().is_empty())
    {
        return Err(ServiceError::BadRequest("name, phone and plate are required".into()));
    }
    let stored = db.insert_cancel_request(&request)?;
    info!("cancellation request {} for {}", stored.id, stored.plate);
    Ok(HttpResponse::Created().json(json!({ "success": true, "request": stored })))
}

async fn list(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(db.list_cancel_requests()?))
}

async fn set_status(
    db: web::Data<Db>,
    id: web::Path<i64>,
    change: web::Json<StatusChange>,
) -> Result<HttpResponse, ServiceError> {
    let status = CancelStatus::parse(&change.status)
        .ok_or_else(|| ServiceError::BadRequest(format!("invalid status '{}'", change.status)))?;
    if !db.set_cancel_status(id.into_inner(), status, change.notes.as_deref())? {
        return Err(ServiceError::NotFound("cancellation request"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "status": status })))
}

async fn set_notes(
    db: web::Data<Db>,
    id: web::Path<i64>,
    change: web::Json<NotesChange>,
) -> Result<HttpResponse, ServiceError> {
    if !db.set_cancel_notes(id.into_inner(), &change.notes)? {
        return Err(ServiceError::NotFound("cancellation request"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn remove(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    if !db.delete_cancel_request(id.into_inner())? {
        return Err(ServiceError::NotFound("cancellation request"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn request_is_worked_through_by_admin() {
        let db = Db::open_in_memory().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/cancel-request")
            .set_json(json!({ "name": "Ece Demir", "phone": "05320000000", "plate": "35 XYZ 42" }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["request"]["id"].as_i64().unwrap();
        assert_eq!(created["request"]["status"], "pending");

        let req = test::TestRequest::post()
            .uri(&format!("/admin/cancel-requests/{id}/status"))
            .set_json(json!({ "status": "completed", "notes": "policy closed" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::post()
            .uri(&format!("/admin/cancel-requests/{id}/status"))
            .set_json(json!({ "status": "done" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::get().uri("/admin/cancel-requests").to_request();
        let all: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all[0]["status"], "completed");
        assert_eq!(all[0]["notes"], "policy closed");
    }

    #[actix_web::test]
    async fn blank_fields_and_unknown_ids() {
        let db = Db::open_in_memory().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/cancel-request")
            .set_json(json!({ "name": "", "phone": "0532", "plate": "35 XYZ 42" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::post()
            .uri("/admin/cancel-requests/3/notes")
            .set_json(json!({ "notes": "x" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
        let req = test::TestRequest::delete()
            .uri("/admin/cancel-requests/3")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
