pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Invalid path")]
    InvalidPath,
    #[error("Invalid file reference: {0}")]
    InvalidReference(String),
    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Blob service responded {status}: {message}")]
    BlobServiceError { status: u16, message: String },
    #[error("Failed to remove previous file: {0}")]
    EditFailed(Box<StoreError>),
}

impl StoreError {
    /// Errors caused by temporary unavailability of the storage
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::IoError(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::InvalidInput
            ),
            StoreError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StoreError::BlobServiceError { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            StoreError::EditFailed(inner) => inner.is_transient(),
            StoreError::InvalidPath
            | StoreError::InvalidReference(_)
            | StoreError::InvalidConnectionString(_) => false,
        }
    }
}
