//! Storage-specific error type wrapping I/O and codec errors.

use std::io;
use std::path::PathBuf;

use domintell_domain::error::DomintellError;

/// Errors originating from the snapshot file layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The snapshot path does not end in a supported extension.
    #[error("unsupported snapshot extension {extension:?}, expected \"bin\" or \"json\"")]
    UnsupportedExtension {
        /// Extension found, empty when there is none.
        extension: String,
    },

    /// The directory that should hold the snapshot does not exist.
    #[error("snapshot directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    /// The snapshot directory or file is not writable.
    #[error("permission denied on {}", .0.display())]
    PermissionDenied(PathBuf),

    /// A file operation failed.
    #[error("i/o error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The binary codec failed.
    #[error("postcard codec error")]
    Postcard(#[from] postcard::Error),

    /// The JSON codec failed.
    #[error("JSON codec error")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Wrap an I/O error, singling out permission problems.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path)
        } else {
            Self::Io { path, source }
        }
    }
}

impl From<StorageError> for DomintellError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
