//! Error types for the prompter bridge

use thiserror::Error;

/// Failures while turning a file into script text
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file type: {0}. Only .txt and .docx files are allowed")]
    UnsupportedExtension(String),

    #[error("The file is empty")]
    EmptyFile,

    #[error("The file is too large ({size} bytes). Maximum allowed: {limit} bytes")]
    OversizeFile { size: u64, limit: u64 },

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Frames the receiving side refuses to apply
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("Stale frame: seq {seq} is not newer than {last_applied}")]
    Stale { seq: u64, last_applied: u64 },
}

/// Bridge-wide error type
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Stage window unavailable: {0}")]
    WindowUnavailable(String),

    #[error("Failed to create stage window: {0}")]
    WindowCreationFailed(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Channel send error")]
    ChannelSendError,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
