// Error types shared by storage, generation and routes

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

/// A single field-level validation failure, rendered inside the `detail` array.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub loc: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Unable to generate {0} file.")]
    EmptyGeneration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Validation error for one field.
    pub fn validation(
        loc: impl Into<String>,
        msg: impl Into<String>,
        input: Option<serde_json::Value>,
    ) -> Self {
        AppError::Validation(vec![FieldError {
            loc: loc.into(),
            msg: msg.into(),
            input,
        }])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyGeneration(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::LLMApi(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Validation(errors) => {
                debug!(?errors, "Rejected request input");
                serde_json::json!({ "detail": errors })
            }
            AppError::NotFound(key) => {
                serde_json::json!({ "detail": format!("File not found: {}", key) })
            }
            AppError::EmptyGeneration(_) => {
                error!(error = %self, "Content generator returned no data");
                serde_json::json!({ "detail": self.to_string() })
            }
            AppError::Storage(_) | AppError::LLMApi(_) | AppError::Internal(_) => {
                error!(error = %self, "Unhandled upstream failure");
                serde_json::json!({ "detail": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<s3::error::S3Error> for AppError {
    fn from(err: s3::error::S3Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LLMApi(err.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text(), None)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();

        for (field, field_errors) in errors.field_errors() {
            let name: &str = &field;
            let loc = match name {
                "__all__" => "query".to_string(),
                other => other.to_string(),
            };
            for err in field_errors.iter() {
                details.push(FieldError {
                    loc: loc.clone(),
                    msg: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", loc)),
                    input: err.params.get("value").cloned(),
                });
            }
        }

        // ValidationErrors is backed by a HashMap; keep the envelope stable.
        details.sort_by(|a, b| a.loc.cmp(&b.loc));
        AppError::Validation(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_names_the_key() {
        let (status, body) = body_json(AppError::NotFound("some/file.txt".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "File not found: some/file.txt");
    }

    #[tokio::test]
    async fn test_upstream_errors_do_not_leak_details() {
        for err in [
            AppError::Storage("NoSuchBucket: arn:aws:s3:::secret".into()),
            AppError::LLMApi("401 invalid api key sk-123".into()),
            AppError::Internal("boom".into()),
        ] {
            let (status, body) = body_json(err).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, serde_json::json!({ "detail": "Internal server error" }));
        }
    }

    #[tokio::test]
    async fn test_validation_errors_are_structured() {
        let err = AppError::validation("page_size", "too small", Some(serde_json::json!(3)));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], "page_size");
        assert_eq!(body["detail"][0]["msg"], "too small");
        assert_eq!(body["detail"][0]["input"], 3);
    }

    #[tokio::test]
    async fn test_empty_generation_is_service_unavailable() {
        let (status, body) = body_json(AppError::EmptyGeneration("image".into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Unable to generate image file.");
    }
}
