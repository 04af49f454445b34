use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;
use thiserror::Error;

pub const NO_IMAGE_MESSAGE: &str = "No image provided";

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("No image provided")]
    MissingImage,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("AI analysis failed: {0}")]
    UpstreamAnalysis(String),
    #[error("Failed to process image: {0}")]
    Processing(String),
}

impl AnalyzeError {
    fn body(&self) -> ErrorResponse {
        let (error, details) = match self {
            AnalyzeError::MissingImage => (NO_IMAGE_MESSAGE, None),
            AnalyzeError::InvalidImage(details) => ("Invalid image", Some(details.clone())),
            AnalyzeError::UpstreamAnalysis(details) => {
                ("AI analysis failed", Some(details.clone()))
            }
            AnalyzeError::Processing(details) => {
                ("Failed to process image", Some(details.clone()))
            }
        };
        ErrorResponse {
            error: error.to_string(),
            details,
        }
    }
}

impl ResponseError for AnalyzeError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::MissingImage | AnalyzeError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::UpstreamAnalysis(_) | AnalyzeError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

impl From<actix_multipart::MultipartError> for AnalyzeError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AnalyzeError::Processing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: AnalyzeError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn missing_image_is_a_bare_400() {
        let (status, body) = body_of(AnalyzeError::MissingImage).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "No image provided" }));
    }

    #[actix_web::test]
    async fn upstream_failure_carries_details() {
        let (status, body) =
            body_of(AnalyzeError::UpstreamAnalysis("reply had no product".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "AI analysis failed");
        assert_eq!(body["details"], "reply had no product");
    }

    #[actix_web::test]
    async fn processing_failure_is_generic() {
        let (status, body) = body_of(AnalyzeError::Processing("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to process image");
        assert_eq!(body["details"], "boom");
    }
}
