//! HTTP Peer Client
//!
//! Fetches a key from one remote peer over the wire protocol.

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::peers::protocol::{self, Request, Response};
use crate::peers::PeerGetter;

/// Characters left as-is in a path segment; everything else is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// == HTTP Getter ==
/// Client for the peer at `base_url` (peer address followed by the base
/// path, e.g. `http://10.0.0.2:8001/_peercache/`).
#[derive(Debug, Clone)]
pub struct HttpGetter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGetter {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<base_url><group>/<key>` with both segments escaped.
    pub fn request_url(&self, request: &Request) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            utf8_percent_encode(&request.group, PATH_SEGMENT),
            utf8_percent_encode(&request.key, PATH_SEGMENT),
        )
    }

    // == Fetch ==
    /// Sends one request; any failure is an error, never a partial value.
    pub async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = self.request_url(request);
        debug!(%url, "Fetching from peer");

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CacheError::Peer(format!("requesting {}: {}", url, e)))?;

        if res.status() != StatusCode::OK {
            return Err(CacheError::Peer(format!("server returned: {}", res.status())));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| CacheError::Peer(format!("reading response body: {}", e)))?;

        Ok(Response {
            value: protocol::decode_response(&body)?,
        })
    }
}

#[async_trait]
impl PeerGetter for HttpGetter {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let request = Request {
            group: group.to_string(),
            key: key.to_string(),
        };
        Ok(self.fetch(&request).await?.value)
    }
}
