use std::path::{Path, PathBuf};

use std::process::ExitStatus;

/// The primary error type for all operations in the `treetar` crate.
#[derive(Debug)]
pub enum ArchiverError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    Io { source: std::io::Error, path: PathBuf },

    /// An error occurred when trying to strip a prefix from a file path.
    StripPrefix { prefix: PathBuf, path: PathBuf },

    /// The archive stream is truncated or structurally invalid.
    Format(String),

    /// The system `tar` subprocess exited with a failure status.
    Tool { status: ExitStatus, stderr: String },

    /// A wrapper for any other error that doesn't fit the specific variants.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ArchiverError {
    pub(crate) fn io(source: std::io::Error, path: &Path) -> Self {
        ArchiverError::Io { source, path: path.to_path_buf() }
    }
}

impl std::fmt::Display for ArchiverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiverError::Io { source, path } => write!(f, "I/O error on path '{}': {}", path.display(), source),
            ArchiverError::StripPrefix { prefix, path } => write!(f, "Could not strip prefix '{}' from path '{}'", prefix.display(), path.display()),
            ArchiverError::Format(msg) => write!(f, "Archive format error: {}", msg),
            ArchiverError::Tool { status, stderr } => write!(f, "System tar failed ({}): {}", status, stderr.trim_end()),
            ArchiverError::Other(e) => write!(f, "An unexpected error occurred: {}", e),
        }
    }
}

impl std::error::Error for ArchiverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiverError::Io { source, .. } => Some(source),
            ArchiverError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for ArchiverError {
    fn from(err: std::io::Error) -> Self {
        ArchiverError::Io { source: err, path: PathBuf::new() } // Generic path
    }
}

impl From<walkdir::Error> for ArchiverError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected"));
        ArchiverError::Io { source, path }
    }
}
