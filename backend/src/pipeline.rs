use futures::FutureExt;
use log::{error, info};
use shared::{AnalyzeResponse, ProductSource, StatusType};
use std::panic::AssertUnwindSafe;
use uuid::Uuid;

use crate::catalog::{CatalogClient, CatalogProduct};
use crate::error::AnalyzeError;
use crate::intake::UploadedImage;
use crate::merge::merge_product;
use crate::vision::rerank::select_best_match;
use crate::vision::{AiAnalysis, VisionClient};

pub const NUTRITION_AVAILABLE: &str =
    "Nutritional information is available from the product catalog.";
pub const NUTRITION_MISSING: &str =
    "Product found in the catalog but nutritional information is not available.";
pub const NOT_IN_CATALOG: &str =
    "Product not found in the catalog. The details shown are AI-generated and may be inaccurate.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    AiAnalyzed,
    CatalogFound,
    CatalogEmpty,
    Merged,
    Responded,
    Failed,
}

/// Runs one upload through vision analysis, catalog lookup, re-ranking and merge.
#[derive(Clone)]
pub struct Analyzer {
    vision: VisionClient,
    catalog: CatalogClient,
}

impl Analyzer {
    pub fn new(vision: VisionClient, catalog: CatalogClient) -> Self {
        Self { vision, catalog }
    }

    pub async fn analyze(
        &self,
        request_id: Uuid,
        image: &UploadedImage,
    ) -> Result<AnalyzeResponse, AnalyzeError> {
        match AssertUnwindSafe(self.run(request_id, image)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("[{}] {:?}: analysis pipeline panicked", request_id, Stage::Failed);
                Err(AnalyzeError::Processing(
                    "unexpected internal failure while analyzing the image".to_string(),
                ))
            }
        }
    }

    async fn run(
        &self,
        request_id: Uuid,
        image: &UploadedImage,
    ) -> Result<AnalyzeResponse, AnalyzeError> {
        info!(
            "[{}] {:?}: {} ({} bytes of {}, sha256 {})",
            request_id,
            Stage::Received,
            image.file_name.as_deref().unwrap_or("unnamed upload"),
            image.bytes.len(),
            image.mime_type,
            image.digest()
        );

        let analysis = self.vision.analyze_product(image).await.map_err(|e| {
            error!("[{}] {:?}: AI analysis failed: {}", request_id, Stage::Failed, e);
            AnalyzeError::UpstreamAnalysis(e.to_string())
        })?;

        let query = analysis.product.search_query();
        info!("[{}] {:?}: searching catalog for '{}'", request_id, Stage::AiAnalyzed, query);

        let candidates = self.catalog.search(&query).await;
        let best = if candidates.is_empty() {
            info!("[{}] {:?}", request_id, Stage::CatalogEmpty);
            None
        } else {
            info!("[{}] {:?}: {} candidates", request_id, Stage::CatalogFound, candidates.len());
            select_best_match(&self.vision, image, &candidates).await
        };

        let response = build_response(best, analysis);
        info!(
            "[{}] {:?}: '{}' from {} ({})",
            request_id,
            Stage::Merged,
            response.product_data.name,
            response.product_data.source,
            response.ui_content.status.kind
        );
        Ok(response)
    }
}

/// Merges the chosen catalog record (if any) with the guess and sets the
/// status and disclaimer to reflect where the data came from.
pub fn build_response(best: Option<&CatalogProduct>, analysis: AiAnalysis) -> AnalyzeResponse {
    let product_data = merge_product(best, &analysis);
    let mut ui_content = analysis.ui_content;

    if best.is_some() {
        let has_nutrition = product_data.has_nutrition();
        ui_content.status.kind = if has_nutrition {
            StatusType::Success
        } else {
            StatusType::Info
        };
        ui_content.status.message = if has_nutrition {
            NUTRITION_AVAILABLE
        } else {
            NUTRITION_MISSING
        }
        .to_string();
        ui_content.disclaimer.source = ProductSource::Catalog;
    } else {
        ui_content.status.kind = StatusType::Warning;
        ui_content.status.message = NOT_IN_CATALOG.to_string();
        ui_content.disclaimer.source = ProductSource::Ai;
    }

    AnalyzeResponse {
        product_data,
        ui_content,
    }
}
