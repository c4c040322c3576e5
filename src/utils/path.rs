// File path validation and extraction

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use regex::Regex;

use crate::types::{AppError, AppResult};

/// Slash-separated segments of word characters, digits, whitespace, `-` and
/// `.`, ending in a file name with an extension.
pub const FILE_PATH_PATTERN: &str = r"^([\w\d\s\-.]+/)*([\w\d\s\-.])+\.\w+$";

static FILE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FILE_PATH_PATTERN).expect("file path pattern compiles"));

pub fn validate_file_path(file_path: &str) -> AppResult<()> {
    if FILE_PATH_RE.is_match(file_path) {
        Ok(())
    } else {
        Err(AppError::validation(
            "file_path",
            format!("String should match pattern '{}'", FILE_PATH_PATTERN),
            Some(file_path.into()),
        ))
    }
}

/// The `{*file_path}` segment of a route, already validated.
#[derive(Debug, Clone)]
pub struct FilePath(pub String);

impl<S> FromRequestParts<S> for FilePath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(mut params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation("file_path", rejection.body_text(), None))?;

        let file_path = params
            .remove("file_path")
            .ok_or_else(|| AppError::validation("file_path", "Field required", None))?;

        validate_file_path(&file_path)?;
        Ok(Self(file_path))
    }
}
