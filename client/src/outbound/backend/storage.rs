//! Reqwest-backed object storage adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use url::Url;

use super::dto::{RemoveRequestDto, SignRequestDto, SignedUrlDto, StorageErrorDto};
use super::{BackendClient, RawResponse, execute, status_message};
use crate::domain::ports::{ObjectStorage, StorageError};
use crate::domain::{Bucket, ObjectPath, ObjectUpload};

/// Object storage adapter over the storage REST API.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: BackendClient,
}

impl HttpObjectStorage {
    /// Wrap a shared backend client.
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    fn storage_url<'a>(
        &self,
        prefix: &[&'a str],
        bucket: Bucket,
        path: Option<&'a ObjectPath>,
    ) -> Result<Url, StorageError> {
        let segments = ["storage", "v1"]
            .into_iter()
            .chain(prefix.iter().copied())
            .chain([bucket.as_str()])
            .chain(path.into_iter().flat_map(ObjectPath::segments));
        self.client.url(segments).map_err(StorageError::transport)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send,
    ) -> Result<RawResponse, StorageError> {
        let builder = self
            .client
            .request(method, url)
            .map_err(StorageError::transport)?;
        let response = execute(build(builder))
            .await
            .map_err(|error| StorageError::transport(error.to_string()))?;
        if !response.status.is_success() {
            return Err(map_status_error(response.status, &response.body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, object: &ObjectUpload) -> Result<(), StorageError> {
        let url = self.storage_url(&["object"], object.bucket, Some(&object.path))?;
        let upsert = if object.overwrite { "true" } else { "false" };
        let bytes = object.bytes.clone();
        let content_type = object.content_type.clone();
        self.send(Method::POST, url, move |builder| {
            builder
                .header("x-upsert", upsert)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes)
        })
        .await
        .map(drop)
    }

    async fn remove(&self, bucket: Bucket, paths: &[ObjectPath]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&["object"], bucket, None)?;
        let body = RemoveRequestDto {
            prefixes: paths.iter().map(ObjectPath::as_str).collect(),
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|error| StorageError::decode(format!("remove request: {error}")))?;
        self.send(Method::DELETE, url, move |builder| {
            builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload)
        })
        .await
        .map(drop)
    }

    async fn create_signed_url(
        &self,
        bucket: Bucket,
        path: &ObjectPath,
        ttl: Duration,
    ) -> Result<Url, StorageError> {
        let url = self.storage_url(&["object", "sign"], bucket, Some(path))?;
        let body = SignRequestDto {
            expires_in: ttl.as_secs(),
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|error| StorageError::decode(format!("sign request: {error}")))?;
        let response = self
            .send(Method::POST, url, move |builder| {
                builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload)
            })
            .await?;
        let signed: SignedUrlDto = serde_json::from_slice(&response.body)
            .map_err(|error| StorageError::decode(format!("signed url response: {error}")))?;
        self.resolve_signed(&signed.signed_url)
    }

    fn public_url(&self, bucket: Bucket, path: &ObjectPath) -> Result<Url, StorageError> {
        self.storage_url(&["object", "public"], bucket, Some(path))
    }
}

impl HttpObjectStorage {
    /// Signed URLs come back relative to `/storage/v1`, with their token in
    /// the query string.
    fn resolve_signed(&self, relative: &str) -> Result<Url, StorageError> {
        let base = self
            .client
            .url(["storage", "v1", ""])
            .map_err(StorageError::transport)?;
        base.join(relative.trim_start_matches('/'))
            .map_err(|error| StorageError::decode(format!("signed url `{relative}`: {error}")))
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> StorageError {
    let detail = serde_json::from_slice::<StorageErrorDto>(body).unwrap_or_default();
    let message = detail
        .message
        .clone()
        .unwrap_or_else(|| status_message(status, body));
    if status == StatusCode::NOT_FOUND || detail.is_not_found() {
        return StorageError::not_found(message);
    }
    if status.is_client_error() {
        return StorageError::rejected(message);
    }
    StorageError::transport(message)
}
