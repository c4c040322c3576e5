//! File CRUD endpoints.
//!
//! Existence is always probed before acting so a missing key becomes a plain
//! 404 rather than whatever shape the backend's own error takes.

use axum::{
    body::Body,
    extract::multipart::{Multipart, MultipartRejection},
    extract::{DefaultBodyLimit, Query, State},
    extract::rejection::QueryRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, info};
use validator::Validate;

use crate::models::{AppState, FileMetadata, ListFilesQuery, GetFilesResponse, PutFileResponse};
use crate::storage::{list_objects, ObjectStore};
use crate::types::{AppError, AppResult};
use crate::utils::FilePath;

/// `Last-Modified` uses the IMF-fixdate form of an HTTP-date.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/files", get(list_files))
        .route(
            "/v1/files/{*file_path}",
            get(get_file)
                .put(upload_file)
                .head(get_file_metadata)
                .delete(delete_file),
        )
        // uploads are buffered whole, with no size cap
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Message and status for writing `file_path`: 201 when new, 200 when replacing.
pub(crate) async fn upload_outcome(
    store: &dyn ObjectStore,
    file_path: &str,
) -> AppResult<(String, StatusCode)> {
    if store.exists(file_path).await? {
        Ok((
            format!("Existing file updated at path: /{}", file_path),
            StatusCode::OK,
        ))
    } else {
        Ok((
            format!("New file uploaded at path: /{}", file_path),
            StatusCode::CREATED,
        ))
    }
}

pub(crate) async fn ensure_exists(store: &dyn ObjectStore, file_path: &str) -> AppResult<()> {
    if store.exists(file_path).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(file_path.to_string()))
    }
}

/// Pull the `file` part out of the form, with its declared or guessed type.
async fn read_file_field(multipart: &mut Multipart, file_path: &str) -> AppResult<(Bytes, String)> {
    let invalid = |msg: String| AppError::validation("file", msg, None);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_owned)
            .unwrap_or_else(|| {
                mime_guess::from_path(file_path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        let contents = field.bytes().await.map_err(|e| invalid(e.body_text()))?;

        return Ok((contents, content_type));
    }

    Err(invalid("Field required".to_string()))
}

/// PUT /v1/files/{path} - Upload a file
async fn upload_file(
    State(state): State<AppState>,
    FilePath(file_path): FilePath,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<PutFileResponse>)> {
    store_upload(&state, file_path, multipart).await
}

pub(crate) async fn store_upload(
    state: &AppState,
    file_path: String,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<PutFileResponse>)> {
    let mut multipart = multipart.map_err(|e| AppError::validation("file", e.body_text(), None))?;
    let (contents, content_type) = read_file_field(&mut multipart, &file_path).await?;

    let (message, status) = upload_outcome(state.store.as_ref(), &file_path).await?;
    info!(file_path = %file_path, bytes = contents.len(), %content_type, %status, "Uploading file");

    state.store.put(&file_path, contents, &content_type).await?;

    Ok((status, Json(PutFileResponse { file_path, message })))
}

/// GET /v1/files - List files with pagination
async fn list_files(
    State(state): State<AppState>,
    query: Result<Query<ListFilesQuery>, QueryRejection>,
) -> AppResult<Json<GetFilesResponse>> {
    let Query(query) = query?;
    query.validate()?;

    let page = match query.page_token() {
        Some(token) => {
            list_objects(state.store.as_ref(), None, query.page_size(), Some(token)).await?
        }
        None => {
            list_objects(state.store.as_ref(), query.directory(), query.page_size(), None).await?
        }
    };
    debug!(
        files = page.records.len(),
        has_more = page.next_token.is_some(),
        "Listed files"
    );

    Ok(Json(GetFilesResponse {
        files: page.records.into_iter().map(FileMetadata::from).collect(),
        next_page_token: page.next_token,
    }))
}

/// HEAD /v1/files/{path} - Retrieve file metadata
///
/// HEAD responses carry no body.
async fn get_file_metadata(
    State(state): State<AppState>,
    FilePath(file_path): FilePath,
) -> AppResult<Response> {
    file_metadata_response(&state, &file_path).await
}

pub(crate) async fn file_metadata_response(state: &AppState, file_path: &str) -> AppResult<Response> {
    ensure_exists(state.store.as_ref(), file_path).await?;
    let meta = state.store.head(file_path).await?;

    let content_type = meta
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, meta.size.to_string()),
            (
                header::LAST_MODIFIED,
                meta.last_modified.format(HTTP_DATE_FORMAT).to_string(),
            ),
        ],
    )
        .into_response())
}

/// GET /v1/files/{path} - Retrieve a file
async fn get_file(
    State(state): State<AppState>,
    FilePath(file_path): FilePath,
) -> AppResult<Response> {
    file_body_response(&state, &file_path).await
}

pub(crate) async fn file_body_response(state: &AppState, file_path: &str) -> AppResult<Response> {
    ensure_exists(state.store.as_ref(), file_path).await?;
    let object = state.store.get(file_path).await?;

    let content_type = object
        .meta
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, object.meta.size.to_string()),
        ],
        Body::from_stream(object.stream),
    )
        .into_response())
}

/// DELETE /v1/files/{path} - Delete a file
///
/// DELETE responses carry no body.
async fn delete_file(
    State(state): State<AppState>,
    FilePath(file_path): FilePath,
) -> AppResult<StatusCode> {
    remove_file(&state, &file_path).await
}

pub(crate) async fn remove_file(state: &AppState, file_path: &str) -> AppResult<StatusCode> {
    ensure_exists(state.store.as_ref(), file_path).await?;
    state.store.delete(file_path).await?;

    info!(file_path = %file_path, "Deleted file");
    Ok(StatusCode::NO_CONTENT)
}
