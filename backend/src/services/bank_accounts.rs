//! Bank accounts shown to customers for manual transfers.

use crate::services::ServiceError;
use crate::store::Db;
use actix_web::web::{delete, get, post, put, ServiceConfig};
use actix_web::{web, HttpResponse};
use common::requests::{BankAccountPatch, NewBankAccount};
use serde_json::json;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/api/bank-accounts", get().to(list_active))
        .route("/admin/bank-accounts", get().to(list_all))
        .route("/admin/bank-accounts", post().to(create))
        .route("/admin/bank-accounts/{id}", put().to(update))
        .route("/admin/bank-accounts/{id}/toggle", post().to(toggle))
        .route("/admin/bank-accounts/{id}", delete().to(remove));
}

async fn list_active(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(db.list_bank_accounts(true)?))
}

async fn list_all(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(db.list_bank_accounts(false)?))
}

async fn create(
    db: web::Data<Db>,
    account: web::Json<NewBankAccount>,
) -> Result<HttpResponse, ServiceError> {
    if account.bank_name.trim().is_empty() || account.iban.trim().is_empty() {
        return Err(ServiceError::BadRequest("bank_name and iban are required".into()));
    }
    let stored = db.insert_bank_account(&account)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "account": stored })))
}

async fn update(
    db: web::Data<Db>,
    id: web::Path<i64>,
    patch: web::Json<BankAccountPatch>,
) -> Result<HttpResponse, ServiceError> {
    let account = db
        .update_bank_account(id.into_inner(), &patch)?
        .ok_or(ServiceError::NotFound("bank account"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "account": account })))
}

async fn toggle(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let is_active = db
        .toggle_bank_account(id.into_inner())?
        .ok_or(ServiceError::NotFound("bank account"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "is_active": is_active })))
}

async fn remove(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    if !db.delete_bank_account(id.into_inner())? {
        return Err(ServiceError::NotFound("bank account"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn toggled_accounts_leave_the_public_list() {
        let db = Db::open_in_memory().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admin/bank-accounts")
            .set_json(json!({
                "bank_name": "Ziraat",
                "iban": "TR330006100519786457841326",
                "account_name": "Kasko Sigorta Ltd",
                "branch": "Merkez",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let created: Value = test::read_body_json(resp).await;
        let id = created["account"]["id"].as_i64().unwrap();
        assert_eq!(created["account"]["is_active"], true);

        let req = test::TestRequest::post()
            .uri(&format!("/admin/bank-accounts/{id}/toggle"))
            .to_request();
        let toggled: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(toggled["is_active"], false);

        let req = test::TestRequest::get().uri("/api/bank-accounts").to_request();
        let public: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(public, json!([]));
        let req = test::TestRequest::get().uri("/admin/bank-accounts").to_request();
        let all: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn update_and_delete_unknown_ids_are_404() {
        let db = Db::open_in_memory().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db.clone()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/admin/bank-accounts/5")
            .set_json(json!({ "branch": "Kadıköy" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
        let req = test::TestRequest::delete()
            .uri("/admin/bank-accounts/5")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
        let req = test::TestRequest::post()
            .uri("/admin/bank-accounts/5/toggle")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
