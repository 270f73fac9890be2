//! HTTP transport layer for the PxWeb client.

use crate::config::ClientConfig;
use crate::error::{PxWebError, PxWebResult};
use reqwest::{header, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// UTF-8 byte order mark that PxWeb prepends to some JSON bodies.
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// HTTP transport for making API requests.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> PxWebResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a URL below `{base}/{language}/{database}`.
    ///
    /// Empty segments of `path` are skipped. With `trailing_slash` the URL
    /// addresses a catalog level rather than a table.
    pub fn build_url(&self, path: &str, trailing_slash: bool) -> PxWebResult<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| PxWebError::Config("base URL cannot carry a path".to_string()))?;
            segments.pop_if_empty();
            segments.push(self.config.language.code());
            segments.push(&self.config.database);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
            if trailing_slash {
                segments.push("");
            }
        }
        Ok(url)
    }

    /// Execute a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(&self, url: &Url, request: RequestBuilder) -> PxWebResult<T> {
        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(PxWebError::from_response(status.as_u16(), url, &text));
        }

        let body = body.strip_prefix(BOM).unwrap_or(&body[..]);
        Ok(serde_json::from_slice(body)?)
    }

    fn classify(&self, err: reqwest::Error) -> PxWebError {
        if err.is_timeout() {
            PxWebError::Timeout(self.config.timeout)
        } else {
            PxWebError::Http(err)
        }
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> PxWebResult<T> {
        debug!(url = %url, "GET request");
        self.execute(&url, self.client.get(url.clone())).await
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &Q,
    ) -> PxWebResult<T> {
        debug!(url = %url, "GET request with query");
        self.execute(&url, self.client.get(url.clone()).query(query))
            .await
    }

    /// Execute a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: Url, body: &B) -> PxWebResult<T> {
        debug!(url = %url, "POST request");
        self.execute(&url, self.client.post(url.clone()).json(body))
            .await
    }
}
