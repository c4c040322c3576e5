use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::types::{AppError, AppResult};

/// The kinds of file the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratedKind {
    Text,
    Image,
    Audio,
}

impl GeneratedKind {
    pub const ALL: [GeneratedKind; 3] = [GeneratedKind::Text, GeneratedKind::Image, GeneratedKind::Audio];

    /// Content type the generated bytes are stored with.
    pub fn mime_type(&self) -> &'static str {
        match self {
            GeneratedKind::Text => "text/plain",
            GeneratedKind::Image => "image/png",
            GeneratedKind::Audio => "audio/mpeg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratedKind::Text => "text",
            GeneratedKind::Image => "image",
            GeneratedKind::Audio => "audio",
        }
    }
}

impl fmt::Display for GeneratedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratedKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeneratedKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                AppError::validation(
                    "file_type",
                    "Input should be 'text', 'image' or 'audio'",
                    Some(s.into()),
                )
            })
    }
}

/// Produces file content from a prompt.
///
/// An empty result means the provider answered but with nothing usable;
/// callers report that separately from a failed call.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, kind: GeneratedKind) -> AppResult<Vec<u8>>;
}
