//! [`HttpSend`] implementation backed by [`reqwest`].
//!
//! Token credentials use this to reach the managed identity endpoint or the
//! OAuth token endpoint.
//!
//! ```no_run
//! use azsign_core::Context;
//! use azsign_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use azsign_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Send requests with a shared [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    ///
    /// Timeouts configured on the client apply to every token fetch.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::token_fetch("failed to send request").with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::token_fetch("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azsign_core::ErrorKind;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_token_fetch_error() {
        let http = ReqwestHttpSend::default();
        let req = http::Request::get("http://127.0.0.1:1/metadata/identity/oauth2/token")
            .body(Bytes::new())
            .unwrap();

        let err = http.http_send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenFetch);
        assert!(err.is_retryable());
    }
}
