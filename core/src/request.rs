use std::borrow::Cow;

use http::header::HeaderName;
use http::uri::Authority;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;

use crate::{Error, Result};

/// Signing context for request.
///
/// This is a detached copy of the parts of an outgoing request that signing
/// needs. It is built fresh for every request and consumed once. Nothing is
/// written back to the original request until [`SigningRequest::apply`] is
/// called, so a signing attempt that fails halfway leaves the caller's
/// request exactly as it was.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as sent on the wire (still percent encoded).
    pub path: String,
    /// HTTP query parameters, percent decoded, in request order.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &http::request::Parts) -> Result<Self> {
        let uri = &parts.uri;

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme().cloned().unwrap_or(Scheme::HTTP),
            authority: uri.authority().cloned().ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: match uri.path() {
                "" => "/".to_string(),
                v => v.to_string(),
            },
            query: uri
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),
            headers: parts.headers.clone(),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Only headers are written back. Signing never rewrites the URI.
    pub fn apply(self, parts: &mut http::request::Parts) {
        parts.headers = self.headers;
    }

    /// Whether this request travels over TLS.
    #[inline]
    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::HTTPS
    }

    /// Get the path percent decoded.
    ///
    /// A path that does not decode to valid UTF-8 cannot be canonicalized.
    pub fn path_percent_decoded(&self) -> Result<Cow<'_, str>> {
        percent_encoding::percent_decode_str(&self.path)
            .decode_utf8()
            .map_err(|e| {
                Error::canonicalization(format!("path {} is not valid utf-8", self.path))
                    .with_source(e)
            })
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found. When a header is repeated,
    /// the first value is returned.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Insert a header, replacing every existing value under the same name.
    #[inline]
    pub fn header_insert(&mut self, key: HeaderName, value: HeaderValue) {
        self.headers.insert(key, value);
    }

    /// Collect headers whose name starts with `prefix`.
    ///
    /// Header names are case-insensitive and already stored lowercased, so
    /// `prefix` must be given in lowercase. Every name appears once with all
    /// of its values in the order they were added to the request.
    pub fn header_to_vec_with_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<&str>)>> {
        self.headers
            .keys()
            .filter(|k| k.as_str().starts_with(prefix))
            .map(|k| {
                let values = self
                    .headers
                    .get_all(k)
                    .iter()
                    .map(|v| v.to_str().map_err(Error::from))
                    .collect::<Result<Vec<_>>>()?;
                Ok((k.as_str().to_string(), values))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parts(req: http::request::Builder) -> http::request::Parts {
        req.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_build() {
        let parts = parts(
            http::Request::put("https://account.blob.core.windows.net/container/a%20b?comp=block&blockid=YQ%3D%3D")
                .header("x-ms-version", "2021-12-02"),
        );
        let req = SigningRequest::build(&parts).unwrap();

        assert_eq!(req.method, Method::PUT);
        assert!(req.is_https());
        assert_eq!(req.authority.as_str(), "account.blob.core.windows.net");
        assert_eq!(req.path, "/container/a%20b");
        assert_eq!(req.path_percent_decoded().unwrap(), "/container/a b");
        assert_eq!(
            req.query,
            vec![
                ("comp".to_string(), "block".to_string()),
                ("blockid".to_string(), "YQ==".to_string()),
            ]
        );
    }

    #[test]
    fn test_path_percent_decoded_invalid_utf8() {
        let parts = parts(http::Request::get("https://account.blob.core.windows.net/c/%FF%FE"));
        let req = SigningRequest::build(&parts).unwrap();

        let err = req.path_percent_decoded().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Canonicalization);
    }

    #[test]
    fn test_build_without_authority() {
        let parts = parts(http::Request::get("/container/blob"));
        let err = SigningRequest::build(&parts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_build_does_not_touch_parts() {
        let mut parts = parts(http::Request::get("http://127.0.0.1:10000/devstoreaccount1/c"));
        let mut req = SigningRequest::build(&parts).unwrap();
        assert!(!req.is_https());

        req.header_insert(http::header::DATE, HeaderValue::from_static("now"));
        assert!(parts.headers.is_empty());

        req.apply(&mut parts);
        assert_eq!(parts.headers.get(http::header::DATE).unwrap(), "now");
        assert_eq!(parts.uri, "http://127.0.0.1:10000/devstoreaccount1/c");
    }

    #[test]
    fn test_header_to_vec_with_prefix() {
        let parts = parts(
            http::Request::get("https://account.blob.core.windows.net/c")
                .header("X-MS-Meta-B", " two ")
                .header("x-ms-meta-a", "1")
                .header("Content-Type", "text/plain")
                .header("x-ms-meta-a", "2"),
        );
        let req = SigningRequest::build(&parts).unwrap();

        let mut headers = req.header_to_vec_with_prefix("x-ms-").unwrap();
        headers.sort();
        assert_eq!(
            headers,
            vec![
                ("x-ms-meta-a".to_string(), vec!["1", "2"]),
                ("x-ms-meta-b".to_string(), vec![" two "]),
            ]
        );
    }
}
