use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::TryFutureExt as _;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{
    FileStorage, UploadedFile, ValidPath,
    error::{StoreError, StoreResult},
    path_from_reference, unique_path,
};

/// Prefix of URLs under which server publishes stored files
pub const FILES_URL_PREFIX: &str = "files";

async fn tmp_path(root: &Path, path: &Path) -> StoreResult<PathBuf> {
    let id = uuid::Uuid::new_v4().to_string();
    let tmp_ext = format!("{id}.tmp");
    let tmp_path = path.with_extension(&tmp_ext);
    let tmp_path = root.join(tmp_path);
    if let Some(parent) = tmp_path.parent() {
        let meta = fs::metadata(parent).await;
        match meta {
            Ok(meta) => {
                if !meta.is_dir() {
                    error!("Parent is not a directory: {parent:?}");
                    return Err(StoreError::InvalidPath);
                }
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::NotFound {
                    // container is created on first use
                    fs::create_dir_all(parent).await?;
                    info!("Created container directory {parent:?}");
                } else {
                    error!("Failed to stat parent: {parent:?}: {e}");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(tmp_path)
}

async fn cleanup<E: Display>(path: &Path, error: E) -> Result<(), E> {
    error!("Failed to store file to path {path:?}: {error}");
    if path.exists() {
        fs::remove_file(path)
            .await
            .map_err(|e| error!("Failed to remove file {path:?}: {e}"))
            .ok();
    }
    Err(error)
}

struct FileStoreInner {
    root: PathBuf,
    base_url: Url,
}

/// Stores files in local directory, one subdirectory per container
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

impl FileStore {
    /// `base_url` is public URL of the server, files are expected to be served under `/files`
    pub fn new(root: impl Into<PathBuf>, base_url: Url) -> Self {
        Self {
            inner: Arc::new(FileStoreInner {
                root: root.into(),
                base_url,
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn local_path(&self, path: &ValidPath) -> PathBuf {
        self.inner.root.join(path.as_ref())
    }

    fn public_url(&self, path: &ValidPath) -> StoreResult<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidReference(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .push(FILES_URL_PREFIX)
            .extend(path.as_ref().split('/'));
        Ok(url)
    }
}

impl FileStorage for FileStore {
    async fn store(&self, container: &str, file: &UploadedFile) -> StoreResult<String> {
        let path = unique_path(container, &file.file_name)?;
        let tmp_path = tmp_path(&self.inner.root, Path::new(path.as_ref())).await?;
        let mut new_file = fs::File::create(&tmp_path)
            .await
            .inspect_err(|e| error!("Failed to create tmp file {tmp_path:?}: {e}"))?;
        new_file
            .write_all(&file.data)
            .or_else(|e| cleanup(&tmp_path, e))
            .await?;
        new_file.flush().await?;
        let final_path = self.local_path(&path);
        fs::rename(&tmp_path, &final_path)
            .or_else(|e| cleanup(&tmp_path, e))
            .await?;
        debug!(
            "Stored {} bytes of {} to {final_path:?}",
            file.size(),
            file.content_type
        );
        Ok(self.public_url(&path)?.to_string())
    }

    async fn delete(&self, reference: Option<&str>, container: &str) -> StoreResult<()> {
        let reference = match reference {
            Some(r) if !r.trim().is_empty() => r,
            _ => {
                debug!("Empty file reference, nothing to delete");
                return Ok(());
            }
        };
        let path = path_from_reference(reference, container)?;
        match fs::remove_file(self.local_path(&path)).await {
            Ok(()) => {
                debug!("Deleted file {} from container {container}", path.name());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "File {} did not exist in container {container}",
                    path.name()
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
