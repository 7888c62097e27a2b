//! Blob container storage speaking the Azure Blob REST protocol.
//!
//! Requests are authorized with a shared access signature (SAS) taken from
//! the connection string, so no request signing is needed. Returned URLs are
//! the public blob URLs, without the signature.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, header::CONTENT_TYPE};
use tracing::{debug, error, info, warn};
use url::Url;

use super::{
    FileStorage, UploadedFile, ValidPath,
    error::{StoreError, StoreResult},
    path_from_reference, unique_path,
};

const API_VERSION: &str = "2023-11-03";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Parsed storage connection string.
///
/// Supports `BlobEndpoint=https://...;SharedAccessSignature=sv=...` or
/// `DefaultEndpointsProtocol=https;AccountName=...;EndpointSuffix=core.windows.net;SharedAccessSignature=...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub endpoint: Url,
    pub sas: String,
}

impl std::str::FromStr for ConnectionString {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut blob_endpoint = None;
        let mut account_name = None;
        let mut protocol = "https";
        let mut suffix = "core.windows.net";
        let mut sas = None;
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StoreError::InvalidConnectionString(format!("Missing value for {part}"))
            })?;
            match key.trim() {
                "BlobEndpoint" => blob_endpoint = Some(value.trim()),
                "AccountName" => account_name = Some(value.trim()),
                "DefaultEndpointsProtocol" => protocol = value.trim(),
                "EndpointSuffix" => suffix = value.trim(),
                "SharedAccessSignature" => sas = Some(value.trim().trim_start_matches('?')),
                "AccountKey" => {
                    return Err(StoreError::InvalidConnectionString(
                        "Account key authorization is not supported, use SharedAccessSignature"
                            .into(),
                    ));
                }
                other => debug!("Ignoring connection string key {other}"),
            }
        }

        let endpoint = match (blob_endpoint, account_name) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, Some(account)) => format!("{protocol}://{account}.blob.{suffix}"),
            (None, None) => {
                return Err(StoreError::InvalidConnectionString(
                    "Missing BlobEndpoint or AccountName".into(),
                ));
            }
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| StoreError::InvalidConnectionString(format!("Invalid endpoint: {e}")))?;
        let sas = sas
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                StoreError::InvalidConnectionString("Missing SharedAccessSignature".into())
            })?
            .to_string();
        Ok(ConnectionString { endpoint, sas })
    }
}

struct BlobStoreInner {
    client: reqwest::Client,
    connection: ConnectionString,
}

#[derive(Clone)]
pub struct BlobStore {
    inner: std::sync::Arc<BlobStoreInner>,
}

impl BlobStore {
    pub fn new(connection: ConnectionString) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(connection, client))
    }

    pub fn with_client(connection: ConnectionString, client: reqwest::Client) -> Self {
        Self {
            inner: std::sync::Arc::new(BlobStoreInner { client, connection }),
        }
    }

    pub fn from_connection_string(connection_string: &str) -> StoreResult<Self> {
        Self::new(connection_string.parse()?)
    }

    /// Public URL of the resource (container or blob), without signature
    fn resource_url(&self, path: &str) -> StoreResult<Url> {
        let mut url = self.inner.connection.endpoint.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| {
                StoreError::InvalidConnectionString(format!(
                    "Endpoint {} cannot be base",
                    self.inner.connection.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    fn signed_url(&self, path: &str, params: &[(&str, &str)]) -> StoreResult<Url> {
        let mut url = self.resource_url(path)?;
        url.set_query(Some(&self.inner.connection.sas));
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("x-ms-version", API_VERSION)
    }

    async fn ensure_container(&self, container: &str) -> StoreResult<()> {
        let url = self.signed_url(container, &[("restype", "container")])?;
        let response = self
            .request(Method::PUT, url)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;
        match response.status() {
            StatusCode::CREATED => info!("Created blob container {container}"),
            StatusCode::CONFLICT => debug!("Blob container {container} already exists"),
            _ => return Err(service_error(response).await),
        }

        let url = self.signed_url(container, &[("restype", "container"), ("comp", "acl")])?;
        let response = self
            .request(Method::PUT, url)
            .header("x-ms-blob-public-access", "blob")
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn upload(&self, path: &ValidPath, file: &UploadedFile) -> StoreResult<Url> {
        let url = self.signed_url(path.as_ref(), &[])?;
        let response = self
            .request(Method::PUT, url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_TYPE, &file.content_type)
            .body(file.data.clone())
            .send()
            .await?;
        check_status(response).await?;
        self.resource_url(path.as_ref())
    }
}

async fn service_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let message = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let message = match message {
        Some(code) => code,
        None => response.text().await.unwrap_or_default(),
    };
    error!("Blob service error {status}: {message}");
    StoreError::BlobServiceError { status, message }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(service_error(response).await)
    }
}

impl FileStorage for BlobStore {
    async fn store(&self, container: &str, file: &UploadedFile) -> StoreResult<String> {
        let path = unique_path(container, &file.file_name)?;
        self.ensure_container(container).await?;
        let url = self.upload(&path, file).await?;
        debug!(
            "Uploaded {} bytes of {} to {url}",
            file.size(),
            file.content_type
        );
        Ok(url.to_string())
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
        let url = self.signed_url(path.as_ref(), &[])?;
        let response = self.request(Method::DELETE, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!(
                "Blob {} did not exist in container {container}",
                path.name()
            );
            return Ok(());
        }
        check_status(response).await?;
        debug!("Deleted blob {} from container {container}", path.name());
        Ok(())
    }
}
