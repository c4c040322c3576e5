use axum::{
    extract::multipart::{Multipart, MultipartRejection},
    extract::rejection::QueryRejection,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::files::{
    file_body_response, file_metadata_response, remove_file, store_upload, upload_outcome,
};
use crate::llm::GeneratedKind;
use crate::models::{AppState, GenerateFileQuery, PutFileResponse};
use crate::types::{AppError, AppResult};
use crate::utils::validate_file_path;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/files/generate/{file_type}/{*file_path}",
            post(generate_file)
                .put(upload_generate_prefixed)
                .get(get_generate_prefixed)
                .head(head_generate_prefixed)
                .delete(delete_generate_prefixed),
        )
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GenerateFilePath {
    file_type: String,
    file_path: String,
}

impl GenerateFilePath {
    /// The stored key when this route captured a plain `generate/...` file path.
    fn object_key(&self) -> AppResult<String> {
        let key = format!("generate/{}/{}", self.file_type, self.file_path);
        validate_file_path(&key)?;
        Ok(key)
    }
}

/// POST /v1/files/generate/{kind}/{path}?prompt= - Generate a file and store it
async fn generate_file(
    State(state): State<AppState>,
    Path(params): Path<GenerateFilePath>,
    query: Result<Query<GenerateFileQuery>, QueryRejection>,
) -> AppResult<(StatusCode, Json<PutFileResponse>)> {
    let kind: GeneratedKind = params.file_type.parse()?;
    validate_file_path(&params.file_path)?;
    let Query(GenerateFileQuery { prompt }) =
        query.map_err(|e| AppError::validation("prompt", e.body_text(), None))?;
    let file_path = params.file_path;

    let (message, status) = upload_outcome(state.store.as_ref(), &file_path).await?;

    let contents = state.generator.generate(&prompt, kind).await?;
    if contents.is_empty() {
        return Err(AppError::EmptyGeneration(kind.to_string()));
    }

    info!(file_path = %file_path, %kind, bytes = contents.len(), "Storing generated file");
    state
        .store
        .put(&file_path, contents.into(), kind.mime_type())
        .await?;

    Ok((status, Json(PutFileResponse { file_path, message })))
}

// Keys under `generate/<segment>/` match the generate route first, so the
// plain file operations are served here too.

async fn upload_generate_prefixed(
    State(state): State<AppState>,
    Path(params): Path<GenerateFilePath>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<PutFileResponse>)> {
    store_upload(&state, params.object_key()?, multipart).await
}

async fn get_generate_prefixed(
    State(state): State<AppState>,
    Path(params): Path<GenerateFilePath>,
) -> AppResult<Response> {
    file_body_response(&state, &params.object_key()?).await
}

async fn head_generate_prefixed(
    State(state): State<AppState>,
    Path(params): Path<GenerateFilePath>,
) -> AppResult<Response> {
    file_metadata_response(&state, &params.object_key()?).await
}

async fn delete_generate_prefixed(
    State(state): State<AppState>,
    Path(params): Path<GenerateFilePath>,
) -> AppResult<StatusCode> {
    remove_file(&state, &params.object_key()?).await
}
