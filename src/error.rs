use std::path::PathBuf;

/// Error types for the sync pipeline
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("GOOGLE_API_KEY is not defined in environment variables")]
    MissingApiKey,

    #[error("Video {video_id} references channel {channel_id} which has no channel definition")]
    UnknownChannelId { video_id: String, channel_id: String },

    #[error("Video {video_id} has tags {tags:?} but {unknown:?} is not in the member roster")]
    MissingRosterMember {
        video_id: String,
        tags: Vec<String>,
        unknown: String,
    },

    #[error("Duplicate dictionary key: {key}")]
    DuplicateKey { key: String },

    #[error("Tag entry {key:?} in {} has videoId {video_id:?}", path.display())]
    TagKeyMismatch {
        path: PathBuf,
        key: String,
        video_id: String,
    },

    #[error("YouTube API error on {endpoint} ({status}): {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SyncError::Json {
            path: path.into(),
            source,
        }
    }

    /// Errors raised before any I/O is attempted
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, SyncError::MissingApiKey | SyncError::Config(_))
    }

    /// Errors caused by a corrupted curated dataset that a human has to fix
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            SyncError::UnknownChannelId { .. }
                | SyncError::MissingRosterMember { .. }
                | SyncError::DuplicateKey { .. }
                | SyncError::TagKeyMismatch { .. }
        )
    }
}
