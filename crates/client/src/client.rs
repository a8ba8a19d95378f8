//! Drive API client.
//!
//! Async HTTP client using `reqwest` with bearer-token authentication.
//! All item addressing is path-based: `{base}/drive/root:/{path}:/…` with
//! each path segment percent-encoded.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{
    ContentRange, FolderFacet, FolderRequest, RangeStatus, SharePermission, UploadSessionResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.onedrive.com/v1.0";

/// Per-request timeout. Bounds each chunk PUT as well; a 5 MiB chunk that
/// cannot complete within this window is treated as a transport failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from the drive client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid access token")]
    InvalidToken,
}

/// Opaque credential provider.
///
/// Token acquisition (sign-in flows, refresh, credential vaults) lives
/// outside this crate; the engine only ever sees the resulting token.
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the upload API.
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String, Error>> + Send + '_>>;
}

/// A fixed, pre-acquired token.
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String, Error>> + Send + '_>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Drive API client.
///
/// The bearer token is installed as a default header, so every request —
/// including chunk PUTs against the session endpoint — carries it.
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl DriveClient {
    /// Creates a client around an already-acquired bearer token.
    pub fn new(token: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("bearer {token}")).map_err(|_| Error::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Obtains a token from `provider` and creates a client with it.
    pub async fn authenticate(provider: &dyn TokenProvider) -> Result<Self, Error> {
        let token = provider.access_token().await?;
        Self::new(&token)
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Creates one folder, either under the drive root or under an
    /// existing parent path. A 409 response means the folder already
    /// exists and is not an error.
    pub async fn create_folder(
        &self,
        parent: Option<&str>,
        name: &str,
    ) -> Result<FolderStatus, Error> {
        let url = match parent {
            None => format!("{}/drive/root/children", self.base_url),
            Some(p) => format!("{}/drive/root:/{}:/children", self.base_url, encode_path(p)),
        };

        let body = FolderRequest {
            name,
            folder: FolderFacet::default(),
        };
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();

        if status.as_u16() == 409 {
            debug!(folder = name, "folder already exists");
            return Ok(FolderStatus::AlreadyExists);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(folder = name, "folder created");
        Ok(FolderStatus::Created)
    }

    /// Creates every `/`-separated segment of `path`, treating
    /// already-exists as success at each level. Returns `true` if the leaf
    /// segment was newly created.
    pub async fn ensure_folder(&self, path: &str) -> Result<bool, Error> {
        let mut parent: Option<String> = None;
        let mut leaf_created = false;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let status = self.create_folder(parent.as_deref(), segment).await?;
            leaf_created = status == FolderStatus::Created;
            parent = Some(match parent {
                Some(p) => format!("{p}/{segment}"),
                None => segment.to_string(),
            });
        }

        Ok(leaf_created)
    }

    /// Opens a chunked upload session for the item at `item_path` and
    /// returns the session's upload URL.
    pub async fn create_session(&self, item_path: &str) -> Result<String, Error> {
        let name = item_path.rsplit('/').next().unwrap_or(item_path);
        let url = format!(
            "{}/drive/root:/{}:/createSession",
            self.base_url,
            encode_path(item_path)
        );

        let body = serde_json::json!({ "item": { "name": name } });
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session: UploadSessionResponse = serde_json::from_slice(&resp.bytes().await?)?;
        debug!(item = item_path, "upload session opened");
        Ok(session.upload_url)
    }

    /// PUTs one byte range against a session endpoint.
    ///
    /// 200/201 finalize the item, 202 asks for the next range; anything
    /// else is surfaced as an API error with the response body as detail.
    pub async fn put_range(
        &self,
        upload_url: &str,
        range: ContentRange,
        data: Vec<u8>,
    ) -> Result<RangeStatus, Error> {
        let resp = self
            .http
            .put(upload_url)
            .header(CONTENT_RANGE, range.to_string())
            .body(data)
            .send()
            .await?;

        match resp.status().as_u16() {
            200 | 201 => Ok(RangeStatus::Complete),
            202 => Ok(RangeStatus::Accepted),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Api { status, body })
            }
        }
    }

    /// Deletes an open upload session, releasing server-side resources.
    pub async fn delete_session(&self, upload_url: &str) -> Result<(), Error> {
        let resp = self.http.delete(upload_url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Requests a view-type share link for an item or folder.
    pub async fn create_share_link(&self, item_path: &str) -> Result<String, Error> {
        let url = format!(
            "{}/drive/root:/{}:/createLink",
            self.base_url,
            encode_path(item_path)
        );

        let body = serde_json::json!({ "type": "view" });
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let share: SharePermission = serde_json::from_slice(&resp.bytes().await?)?;
        debug!(item = item_path, "share link created");
        Ok(share.link.web_url)
    }
}

/// Outcome of a folder-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderStatus {
    Created,
    AlreadyExists,
}

/// Percent-encodes each `/`-separated segment of a drive path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
