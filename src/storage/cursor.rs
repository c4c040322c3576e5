// Opaque continuation tokens handed out by the stores

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::types::{AppError, AppResult};

/// Resume point for a listing. `position` is backend specific: the native
/// S3 continuation token, or the last key returned by the memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCursor {
    #[serde(rename = "p", skip_serializing_if = "Option::is_none", default)]
    pub prefix: Option<String>,
    #[serde(rename = "k")]
    pub position: String,
}

impl StoreCursor {
    pub fn new(prefix: Option<&str>, position: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(str::to_owned),
            position: position.into(),
        }
    }

    pub fn encode(&self) -> AppResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode page token: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Tokens come from clients, so a bad one is a validation error.
    pub fn decode(token: &str) -> AppResult<Self> {
        let invalid =
            || AppError::validation("page_token", "Invalid page token", Some(token.into()));

        let json = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        serde_json::from_slice(&json).map_err(|_| invalid())
    }
}
