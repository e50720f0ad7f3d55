use crate::job_controller::state::JobStateStore;
use actix_web::{web, HttpResponse};

pub(crate) async fn process(jobs: web::Data<JobStateStore>) -> HttpResponse {
    HttpResponse::Ok().json(jobs.snapshot().await)
}
