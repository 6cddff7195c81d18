// ── Upload sessions ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadState {
    Active,
    Done,
    Error,
    Canceled,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Server-side view of one update session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
    pub library_item_id: String,
    pub state: UploadState,
    /// 0..=100
    pub client_progress: u8,
    pub error_message: Option<String>,
}

/// Where the bytes of one file come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSource {
    /// The server fetches the file itself.
    Pull {
        uri: String,
        ssl_thumbprint: Option<String>,
    },
    /// The client streams the file to an upload endpoint.
    ///
    /// Only the file entry is registered with the session. Streaming the
    /// bytes belongs to the caller, and a session nobody uploads to ends in
    /// `UploadTimedOut`.
    Push { size: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub name: String,
    pub source: FileSource,
}

impl FileSpec {
    pub fn pull(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Pull {
                uri: uri.into(),
                ssl_thumbprint: None,
            },
        }
    }
}
