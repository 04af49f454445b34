mod catalog;
mod config;
mod error;
mod intake;
mod merge;
mod pipeline;
mod routes;
mod vision;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use catalog::CatalogClient;
use config::AppConfig;
use pipeline::Analyzer;
use routes::{UploadLimit, configure_routes};
use std::io;
use vision::VisionClient;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        io::Error::other(e.to_string())
    })?;

    let vision = VisionClient::new(&config.vision).map_err(|e| io::Error::other(e.to_string()))?;
    let catalog = CatalogClient::new(&config.catalog).map_err(|e| io::Error::other(e.to_string()))?;
    let analyzer = web::Data::new(Analyzer::new(vision, catalog));
    let upload_limit = web::Data::new(UploadLimit(config.max_image_bytes));

    log::info!(
        "Vision model {} at {}, catalog at {}",
        config.vision.model,
        config.vision.base_url,
        config.catalog.base_url
    );
    match &config.static_dir {
        Some(dir) => log::info!("Serving static files from {}", dir.display()),
        None => log::info!("STATIC_DIR not set, serving the API only"),
    }

    let bind_address = config.bind_address();
    let static_dir = config.static_dir.clone();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(analyzer.clone())
            .app_data(upload_limit.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
