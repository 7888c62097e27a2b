pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("Invalid CORS origin {0}")]
    InvalidOrigin(String),

    #[error("Database error: {0}")]
    Database(#[from] cinedb_dal::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] cinedb_store::error::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
