use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::config::Config;
use crate::llm::ContentGenerator;
use crate::storage::{ObjectMeta, ObjectStore};

pub const DEFAULT_GET_FILES_PAGE_SIZE: usize = 10;
pub const DEFAULT_GET_FILES_MIN_PAGE_SIZE: i64 = 10;
pub const DEFAULT_GET_FILES_MAX_PAGE_SIZE: i64 = 100;

/// Shared handler state. Everything in here is safe to use concurrently.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        generator: Arc<dyn ContentGenerator>,
        config: Config,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    pub file_path: String,
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
}

impl From<ObjectMeta> for FileMetadata {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            file_path: meta.key,
            last_modified: meta.last_modified,
            size_bytes: meta.size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetFilesResponse {
    pub files: Vec<FileMetadata>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PutFileResponse {
    pub file_path: String,
    pub message: String,
}

/// Query parameters for `GET /v1/files`.
///
/// Fields stay optional so that "not supplied" can be told apart from a
/// default: a page token may not be combined with either other field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_page_token_exclusivity"))]
pub struct ListFilesQuery {
    #[validate(range(
        min = DEFAULT_GET_FILES_MIN_PAGE_SIZE,
        max = DEFAULT_GET_FILES_MAX_PAGE_SIZE,
        message = "page_size must be between 10 and 100"
    ))]
    pub page_size: Option<i64>,
    pub directory: Option<String>,
    pub page_token: Option<String>,
}

fn validate_page_token_exclusivity(query: &ListFilesQuery) -> Result<(), ValidationError> {
    if query.page_token().is_some() && (query.page_size.is_some() || query.directory.is_some()) {
        let mut err = ValidationError::new("mutually_exclusive");
        err.message = Some("page_token is mutually exclusive with page_size and directory".into());
        return Err(err);
    }
    Ok(())
}

impl ListFilesQuery {
    pub fn page_size(&self) -> usize {
        self.page_size
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_GET_FILES_PAGE_SIZE)
    }

    /// Prefix filter; an empty directory lists the whole bucket.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref().filter(|d| !d.is_empty())
    }

    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Query parameters for `POST /v1/files/generate/{kind}/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateFileQuery {
    pub prompt: String,
}
