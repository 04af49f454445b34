use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use shared::LoadingMessageResponse;
use shared::loading::LoadingMessages;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::AnalyzeError;
use crate::intake::read_image;
use crate::pipeline::{Analyzer, Stage};

/// Largest accepted upload, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

#[derive(Debug, Default, Deserialize)]
struct LoadingQuery {
    #[serde(default)]
    shown: u32,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: Option<PathBuf>) {
    cfg.service(web::resource("/api/analyze").route(web::post().to(analyze)))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/loading-message").route(web::get().to(loading_message)));

    if let Some(dir) = static_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
}

async fn analyze(
    req: HttpRequest,
    payload: web::Payload,
    analyzer: web::Data<Analyzer>,
    limit: web::Data<UploadLimit>,
) -> Result<HttpResponse, AnalyzeError> {
    let request_id = Uuid::new_v4();

    if !is_multipart(&req) {
        warn!("[{}] {:?}: request is not multipart", request_id, Stage::Failed);
        return Err(AnalyzeError::MissingImage);
    }

    let image = read_image(Multipart::new(req.headers(), payload), limit.0)
        .await
        .inspect_err(|e| warn!("[{}] {:?}: {}", request_id, Stage::Failed, e))?;

    let response = analyzer.analyze(request_id, &image).await?;
    info!("[{}] {:?}", request_id, Stage::Responded);
    Ok(HttpResponse::Ok().json(response))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn loading_message(query: web::Query<LoadingQuery>) -> HttpResponse {
    let mut rotator = LoadingMessages::resume(query.shown);
    let message = rotator.next_message(&mut rand::rng());
    HttpResponse::Ok().json(LoadingMessageResponse {
        message: message.to_string(),
    })
}
