//! Site logo.
//!
//! Uploaded images are shrunk to fit a 500×500 box and written to the logo
//! folder, which `main.rs` serves under [`LOGO_URL_PREFIX`]. Only the file
//! name is stored in the settings row.

use crate::config::AppConfig;
use crate::services::ServiceError;
use crate::store::Db;
use actix_multipart::Multipart;
use actix_web::web::{delete, get, post, ServiceConfig};
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use image::{DynamicImage, ImageFormat};
use log::{info, warn};
use serde_json::json;
use std::path::Path;

pub const LOGO_URL_PREFIX: &str = "/static/logos";

const LOGO_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];
const LOGO_MAX_SIDE: u32 = 500;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.route("/api/logo", get().to(current))
        .route("/admin/logo", post().to(upload))
        .route("/admin/logo", delete().to(remove));
}

fn logo_url(file_name: &str) -> String {
    format!("{LOGO_URL_PREFIX}/{file_name}")
}

async fn current(db: web::Data<Db>) -> Result<HttpResponse, ServiceError> {
    let settings = db.site_settings()?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "logo_url": settings.logo_path.as_deref().map(logo_url),
    })))
}

async fn upload(
    mut payload: Multipart,
    db: web::Data<Db>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let mut logo: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if (bytes.len() + chunk.len()) as u64 > config.max_upload_bytes {
                return Err(ServiceError::PayloadTooLarge(config.max_upload_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        if name.as_deref() == Some("logo") && logo.is_none() {
            logo = Some((file_name, bytes));
        }
    }

    let (file_name, bytes) =
        logo.ok_or_else(|| ServiceError::BadRequest("no logo uploaded".into()))?;
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| LOGO_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            ServiceError::BadRequest(format!(
                "unsupported logo type, expected one of {}",
                LOGO_EXTENSIONS.join(", ")
            ))
        })?;

    let stored_name = format!("logo_{}.{}", uuid::Uuid::new_v4().simple(), ext);
    let target = config.logo_dir.join(&stored_name);
    let write_target = target.clone();
    web::block(move || write_thumbnail(&bytes, &write_target)).await??;

    let previous = match db.replace_logo(Some(&stored_name)) {
        Ok(previous) => previous,
        Err(e) => {
            remove_logo_file(&target);
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        remove_logo_file(&config.logo_dir.join(previous));
    }
    info!("logo replaced with {}", stored_name);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "logo_url": logo_url(&stored_name),
    })))
}

/// Decodes `bytes`, shrinks the image to fit the logo box and writes it to
/// `target` in the format its extension names.
fn write_thumbnail(bytes: &[u8], target: &Path) -> Result<(), image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let resized = if decoded.width() > LOGO_MAX_SIDE || decoded.height() > LOGO_MAX_SIDE {
        decoded.thumbnail(LOGO_MAX_SIDE, LOGO_MAX_SIDE)
    } else {
        decoded
    };
    let format = ImageFormat::from_path(target)?;
    let output = match format {
        // JPEG has no alpha channel.
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };
    output.save_with_format(target, format)
}

fn remove_logo_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("could not remove logo {}: {}", path.display(), e);
    }
}

async fn remove(
    db: web::Data<Db>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ServiceError> {
    let previous = db.replace_logo(None)?.ok_or(ServiceError::NotFound("logo"))?;
    remove_logo_file(&config.logo_dir.join(&previous));
    info!("logo {} removed", previous);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
