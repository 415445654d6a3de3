use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Path '{0}' does not exist")]
    PathNotFound(PathBuf),

    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to access '{path}': {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File too large (>{limit} bytes). Size: {size} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Invalid line range {start}..={end} for a file with {line_count} lines")]
    InvalidLineRange {
        start: usize,
        end: usize,
        line_count: usize,
    },

    #[error("Command not allowed for security reasons (matched '{pattern}')")]
    CommandBlocked { command: String, pattern: String },

    #[error("Command timed out ({secs}s limit)")]
    CommandTimeout { command: String, secs: u64 },

    #[error("No formatter configured for {0} files")]
    NoFormatter(String),

    #[error("Malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ToolError {
    pub fn file_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ToolError::FileIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;
