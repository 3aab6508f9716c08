//! Reqwest adapters for the hosted backend's REST, storage and auth APIs.
//!
//! [`BackendClient`] owns transport details shared by every adapter: the
//! endpoint, the `apikey` header, and the bearer token taken from the
//! current session. Adapters decode responses into the DTOs in `dto` and
//! map them into domain records in one pass.

mod auth;
mod data_store;
mod dto;
mod rest_query;
mod storage;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use tokio::sync::watch;
use url::Url;

use crate::config::BackendEndpoint;
use crate::domain::Session;

pub use auth::HttpAuthProvider;
pub use data_store::RestDataStore;
pub use rest_query::{Order, TableQuery};
pub use storage::HttpObjectStorage;

const USER_AGENT: &str = concat!("trackshare/", env!("CARGO_PKG_VERSION"));
const UNCONFIGURED: &str =
    "backend url and anon key are not configured (set TRACKSHARE_BACKEND_URL and TRACKSHARE_ANON_KEY)";

/// Raw response parts handed to adapter-specific mapping.
pub(crate) struct RawResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

/// Shared HTTP client bound to one backend endpoint.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    endpoint: Option<BackendEndpoint>,
    session: watch::Receiver<Option<Session>>,
}

impl BackendClient {
    /// Build a client. `endpoint` of `None` yields an unconfigured client
    /// whose requests fail without touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Option<BackendEndpoint>,
        session: watch::Receiver<Option<Session>>,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            endpoint,
            session,
        })
    }

    /// Whether a backend endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn endpoint(&self) -> Result<&BackendEndpoint, String> {
        self.endpoint.as_ref().ok_or_else(|| UNCONFIGURED.to_owned())
    }

    /// Absolute URL for `segments` below the base URL; each segment is
    /// percent-encoded.
    pub(crate) fn url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, String> {
        let mut url = self.endpoint()?.base_url().clone();
        let rendered = url.to_string();
        url.path_segments_mut()
            .map_err(|()| format!("backend url {rendered} cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request carrying the `apikey` header and the bearer token of
    /// the current session, or the anon key when signed out.
    pub(crate) fn request(&self, method: reqwest::Method, url: Url) -> Result<RequestBuilder, String> {
        let endpoint = self.endpoint()?;
        let bearer = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.access_token().expose().to_owned())
            .unwrap_or_else(|| endpoint.anon_key().to_owned());
        Ok(self
            .http
            .request(method, url)
            .header("apikey", endpoint.anon_key())
            .bearer_auth(bearer))
    }

    /// Like [`request`](Self::request) but always authorised by the anon
    /// key, for the auth API's token endpoint.
    pub(crate) fn anon_request(&self, method: reqwest::Method, url: Url) -> Result<RequestBuilder, String> {
        let endpoint = self.endpoint()?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", endpoint.anon_key())
            .bearer_auth(endpoint.anon_key()))
    }
}

/// Send a request and collect status, headers and body.
pub(crate) async fn execute(builder: RequestBuilder) -> Result<RawResponse, reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

/// Header value as UTF-8, if present and valid.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value: &HeaderValue| value.to_str().ok())
}

/// `status N` or `status N: <preview>` for error messages.
pub(crate) fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
