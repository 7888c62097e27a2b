#![allow(async_fn_in_trait)]
use bytes::Bytes;
use cinedb_types::utils::file_ext;
use error::{StoreError, StoreResult};

pub mod blob_store;
pub mod error;
pub mod file_store;

pub use blob_store::BlobStore;
pub use file_store::FileStore;
use tracing::debug;

/// Container for actors photos
pub const ACTORS_CONTAINER: &str = "actores";

const MAX_PATH_LEN: usize = 1024;
const MAX_SEGMENT_LEN: usize = 255;
const MAX_PATH_DEPTH: usize = 2;
const PATH_INVALID_CHARS: &str = r#"/\:?#%"#;

fn is_segment_invalid(s: &str) -> bool {
    s.is_empty()
        || s.starts_with(".")
        || s.len() > MAX_SEGMENT_LEN
        || s.chars()
            .any(|c| PATH_INVALID_CHARS.contains(c) || c.is_ascii_control())
}

fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath);
    }
    if path.starts_with("/") || path.ends_with("/") {
        return Err(StoreError::InvalidPath);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(StoreError::InvalidPath);
    }
    let segments = path.split('/').collect::<Vec<_>>();
    if segments.len() > MAX_PATH_DEPTH {
        return Err(StoreError::InvalidPath);
    }
    let invalid_path = segments.into_iter().any(is_segment_invalid);
    if invalid_path {
        Err(StoreError::InvalidPath)
    } else {
        Ok(())
    }
}

/// container/blob relative path, utf8, validated not to escape root and use . segments and some special chars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPath(String);

impl ValidPath {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        validate_path(path.as_str()).inspect_err(|_| debug!("Invalid path: {path}"))?;
        Ok(ValidPath(path))
    }

    /// Path of blob `name` within `container`
    pub fn in_container(container: &str, name: &str) -> StoreResult<Self> {
        if is_segment_invalid(container) || is_segment_invalid(name) {
            debug!("Invalid container {container} or name {name}");
            return Err(StoreError::InvalidPath);
        }
        ValidPath::new(format!("{container}/{name}"))
    }

    /// Name of the blob, without container
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl AsRef<str> for ValidPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidPath> for String {
    fn from(value: ValidPath) -> Self {
        value.0
    }
}

/// File received from client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// original file name as sent by client
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<impl Into<String>>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type
                .map(Into::into)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Random unique name in the container, keeps extension of the original file name
pub fn unique_path(container: &str, original_name: &str) -> StoreResult<ValidPath> {
    let id = uuid::Uuid::new_v4().to_string();
    let name = match file_ext(original_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    };
    ValidPath::in_container(container, &name)
}

/// Extracts blob location from reference (URL or path) returned by [`FileStorage::store`]
pub fn path_from_reference(reference: &str, container: &str) -> StoreResult<ValidPath> {
    let without_query = reference
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let name = without_query
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| StoreError::InvalidReference(reference.to_string()))?;
    ValidPath::in_container(container, name)
        .map_err(|_| StoreError::InvalidReference(reference.to_string()))
}

/// Storage for uploaded files, organized into named containers
pub trait FileStorage {
    /// Stores file under new unique name and returns public URL
    async fn store(&self, container: &str, file: &UploadedFile) -> StoreResult<String>;

    /// Deletes file given by reference, missing or empty reference is no-op
    async fn delete(&self, reference: Option<&str>, container: &str) -> StoreResult<()>;

    /// Replaces previous file with new one.
    ///
    /// If deletion fails new file is not stored. There is no rollback, when
    /// store fails after delete the previous file is gone.
    async fn edit(
        &self,
        reference: Option<&str>,
        container: &str,
        file: &UploadedFile,
    ) -> StoreResult<String> {
        if reference.is_some_and(|r| !r.trim().is_empty()) {
            self.delete(reference, container)
                .await
                .map_err(|e| StoreError::EditFailed(Box::new(e)))?;
        }
        self.store(container, file).await
    }
}

/// Backend chosen at startup from configuration
#[derive(Clone)]
pub enum StorageBackend {
    Local(FileStore),
    Blob(BlobStore),
}

impl FileStorage for StorageBackend {
    async fn store(&self, container: &str, file: &UploadedFile) -> StoreResult<String> {
        match self {
            StorageBackend::Local(store) => store.store(container, file).await,
            StorageBackend::Blob(store) => store.store(container, file).await,
        }
    }

    async fn delete(&self, reference: Option<&str>, container: &str) -> StoreResult<()> {
        match self {
            StorageBackend::Local(store) => store.delete(reference, container).await,
            StorageBackend::Blob(store) => store.delete(reference, container).await,
        }
    }
}

impl From<FileStore> for StorageBackend {
    fn from(value: FileStore) -> Self {
        StorageBackend::Local(value)
    }
}

impl From<BlobStore> for StorageBackend {
    fn from(value: BlobStore) -> Self {
        StorageBackend::Blob(value)
    }
}
