use std::io::ErrorKind;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("object not found: {container}/{key}")]
    ObjectNotFound { container: String, key: String },
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("operation not supported: {0}")]
    Unsupported(String),
    #[error("authentication failed: {0}")]
    AuthFailure(String),
    #[error("too many objects under {prefix}: limit is {limit}")]
    CapacityExceeded { prefix: String, limit: usize },
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),
    #[error("is a directory: {0}")]
    IsDirectory(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::ContainerNotFound(_) | Self::ObjectNotFound { .. }
        )
    }

    /// Category of the error as seen by callers speaking `std::io`.
    pub fn io_kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::ContainerNotFound(_) | Self::ObjectNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::AuthFailure(_) => ErrorKind::PermissionDenied,
            Self::CapacityExceeded { .. } => ErrorKind::Other,
            Self::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            Self::IsDirectory(_) => ErrorKind::IsADirectory,
            Self::InvalidPath(_) | Self::InvalidArgument(_) | Self::InvalidConfig(_) => {
                ErrorKind::InvalidInput
            }
            Self::Internal(_) => ErrorKind::Other,
            Self::Io(err) => err.kind(),
        }
    }
}

impl From<FsError> for std::io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Io(inner) => inner,
            other => std::io::Error::new(other.io_kind(), other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
