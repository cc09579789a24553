//! HTTP transport seam
//!
//! The client only needs one primitive: POST a JSON body with some headers
//! and get back status, headers and body. [`ReqwestTransport`] is the real
//! implementation; tests substitute a scripted one.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

use crate::error::{TcError, TcResult};

/// A response as seen by the client
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header pairs in arrival order; repeated names (e.g. `set-cookie`) are kept
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// All values of a header, case-insensitive
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request/response primitive used by [`TcClient`](crate::remote::TcClient)
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> TcResult<HttpResponse>;
}

/// Production transport backed by `reqwest`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> TcResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: String,
    ) -> TcResult<HttpResponse> {
        let mut header_map = HeaderMap::new();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TcError::Transport(format!("invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TcError::Transport(format!("invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        let response = self
            .http_client
            .post(url)
            .headers(header_map)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values_case_insensitive() {
        let resp = HttpResponse::new(200, "{}")
            .with_header("Set-Cookie", "a=1")
            .with_header("content-type", "application/json")
            .with_header("set-cookie", "b=2");
        assert_eq!(resp.header_values("set-cookie"), vec!["a=1", "b=2"]);
        assert!(resp.is_success());
    }

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new(30).is_ok());
    }
}
