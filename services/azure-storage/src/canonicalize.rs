use std::collections::BTreeMap;
use std::fmt::Write;

use azsign_core::{Error, Result, SigningRequest};
use http::header::{self, HeaderName};

use crate::constants::*;

/// The Shared Key sub-protocol used to build the string to sign.
///
/// - [Blob, Queue, and File services (Shared Key authorization)](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#blob-queue-and-file-services-shared-key-authorization)
/// - [Table service (Shared Key authorization)](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#table-service-shared-key-authorization)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    /// Blob, Queue and File services.
    #[default]
    BlobQueueFile,
    /// Table service.
    Table,
}

impl Protocol {
    /// Construct the string to sign for `req`.
    ///
    /// `content_length` is the length of the body that will be written, or
    /// `-1` when it is unknown. This function is pure: it never mutates the
    /// request and never performs I/O, so the same input always yields the
    /// same output.
    pub fn canonicalize(
        &self,
        req: &SigningRequest,
        account_name: &str,
        content_length: i64,
    ) -> Result<String> {
        if content_length < -1 {
            return Err(Error::canonicalization(format!(
                "content length must be -1 (unknown) or greater, got {content_length}"
            )));
        }

        match self {
            Protocol::BlobQueueFile => {
                string_to_sign_blob_queue_file(req, account_name, content_length)
            }
            Protocol::Table => string_to_sign_table(req, account_name),
        }
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
fn string_to_sign_blob_queue_file(
    req: &SigningRequest,
    account_name: &str,
    content_length: i64,
) -> Result<String> {
    let content_length = if content_length <= 0 {
        String::new()
    } else {
        content_length.to_string()
    };
    // x-ms-date takes over from Date and is signed as a canonicalized header.
    let date = if req.headers.contains_key(X_MS_DATE) {
        ""
    } else {
        req.header_get_or_default(&header::DATE)?
    };

    let mut s = String::with_capacity(256);
    s.push_str(req.method.as_str());
    for value in [
        req.header_get_or_default(&header::CONTENT_ENCODING)?,
        req.header_get_or_default(&header::CONTENT_LANGUAGE)?,
        content_length.as_str(),
        req.header_get_or_default(&HeaderName::from_static(CONTENT_MD5))?,
        req.header_get_or_default(&header::CONTENT_TYPE)?,
        date,
        req.header_get_or_default(&header::IF_MODIFIED_SINCE)?,
        req.header_get_or_default(&header::IF_MATCH)?,
        req.header_get_or_default(&header::IF_NONE_MATCH)?,
        req.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?,
        req.header_get_or_default(&header::RANGE)?,
    ] {
        write!(&mut s, "\n{value}")?;
    }
    for line in canonicalize_header(req)? {
        write!(&mut s, "\n{line}")?;
    }
    write!(&mut s, "\n{}", canonicalize_resource(req, account_name)?)?;

    Ok(s)
}

/// Construct string to sign for the table service.
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// CanonicalizedResource;
/// ```
fn string_to_sign_table(req: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = String::with_capacity(128);
    s.push_str(req.method.as_str());
    for value in [
        req.header_get_or_default(&HeaderName::from_static(CONTENT_MD5))?,
        req.header_get_or_default(&header::CONTENT_TYPE)?,
        req.header_get_or_default(&header::DATE)?,
    ] {
        write!(&mut s, "\n{value}")?;
    }
    write!(&mut s, "\n{}", canonicalize_resource_table(req, account_name)?)?;

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(req: &SigningRequest) -> Result<Vec<String>> {
    let mut headers = req.header_to_vec_with_prefix(X_MS_HEADER_PREFIX)?;
    headers.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    Ok(headers
        .into_iter()
        .map(|(name, values)| {
            let values: Vec<&str> = values.into_iter().map(str::trim).collect();
            format!("{name}:{}", values.join(","))
        })
        .collect())
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(req: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = format!("/{}{}", account_name, req.path_percent_decoded()?);

    let mut query: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (k, v) in &req.query {
        query.entry(k.to_lowercase()).or_default().push(v);
    }
    for (k, mut values) in query {
        values.sort_unstable();
        s.push('\n');
        s.push_str(&k);
        s.push(':');
        s.push_str(&values.join(","));
    }

    Ok(s)
}

/// Only `comp` survives in the table service's canonicalized resource.
fn canonicalize_resource_table(req: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = format!("/{}{}", account_name, req.path_percent_decoded()?);

    if let Some((_, comp)) = req
        .query
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(COMP))
    {
        s.push_str("?comp=");
        s.push_str(comp);
    }

    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azsign_core::ErrorKind;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn signing_request(req: http::request::Builder) -> SigningRequest {
        let (parts, _) = req.body(()).unwrap().into_parts();
        SigningRequest::build(&parts).unwrap()
    }

    #[test]
    fn test_blob_get_without_optional_headers() {
        let req = signing_request(
            http::Request::get("https://myaccount.blob.core.windows.net/mycontainer/myblob")
                .header("Date", "Fri, 26 Jun 2015 23:39:12 GMT"),
        );

        let s = Protocol::BlobQueueFile
            .canonicalize(&req, "myaccount", -1)
            .unwrap();

        assert_eq!(
            s,
            "GET\n\n\n\n\n\nFri, 26 Jun 2015 23:39:12 GMT\n\n\n\n\n\n/myaccount/mycontainer/myblob"
        );
    }

    #[test]
    fn test_blob_put_with_headers_and_query() {
        let req = signing_request(
            http::Request::put(
                "https://myaccount.blob.core.windows.net/mycontainer/my%20blob?comp=block&blockid=YQ%3D%3D&timeout=30",
            )
            .header("Content-Type", "application/octet-stream")
            .header("Content-MD5", "Q2hlY2sgSW50ZWdyaXR5IQ==")
            .header("x-ms-version", "2021-12-02")
            .header("x-ms-date", "Fri, 26 Jun 2015 23:39:12 GMT")
            .header("Date", "Thu, 25 Jun 2015 00:00:00 GMT")
            .header("X-MS-Meta-Color", "  blue ")
            .header("Range", "bytes=0-1023"),
        );

        let s = Protocol::BlobQueueFile
            .canonicalize(&req, "myaccount", 1024)
            .unwrap();

        assert_eq!(
            s,
            [
                "PUT",
                "",
                "",
                "1024",
                "Q2hlY2sgSW50ZWdyaXR5IQ==",
                "application/octet-stream",
                "",
                "",
                "",
                "",
                "",
                "bytes=0-1023",
                "x-ms-date:Fri, 26 Jun 2015 23:39:12 GMT",
                "x-ms-meta-color:blue",
                "x-ms-version:2021-12-02",
                "/myaccount/mycontainer/my blob",
                "blockid:YQ==",
                "comp:block",
                "timeout:30",
            ]
            .join("\n")
        );
    }

    #[test_case(0; "zero")]
    #[test_case(-1; "unknown")]
    fn test_blob_content_length_line_empty(content_length: i64) {
        let req = signing_request(http::Request::put("https://a.blob.core.windows.net/c/b"));

        let s = Protocol::BlobQueueFile
            .canonicalize(&req, "a", content_length)
            .unwrap();

        assert_eq!(s.split('\n').nth(3), Some(""));
    }

    #[test]
    fn test_blob_invalid_content_length() {
        let req = signing_request(http::Request::put("https://a.blob.core.windows.net/c/b"));

        let err = Protocol::BlobQueueFile
            .canonicalize(&req, "a", -2)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Canonicalization);
    }

    #[test]
    fn test_blob_duplicate_headers_are_folded() {
        let req = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b")
                .header("x-ms-meta-a", "1")
                .header("x-ms-meta-a", "2"),
        );

        let s = Protocol::BlobQueueFile.canonicalize(&req, "a", -1).unwrap();

        assert!(s.contains("\nx-ms-meta-a:1,2\n"), "{s}");
    }

    #[test]
    fn test_blob_header_name_case_is_ignored() {
        let lower = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b")
                .header("x-ms-meta-owner", "alice"),
        );
        let upper = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b")
                .header("X-Ms-META-Owner", "alice"),
        );

        assert_eq!(
            Protocol::BlobQueueFile.canonicalize(&lower, "a", -1).unwrap(),
            Protocol::BlobQueueFile.canonicalize(&upper, "a", -1).unwrap()
        );
    }

    #[test]
    fn test_blob_headers_sorted_by_name() {
        let req = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b")
                .header("x-ms-version", "2021-12-02")
                .header("x-ms-client-request-id", "id")
                .header("x-ms-blob-type", "BlockBlob"),
        );

        let s = Protocol::BlobQueueFile.canonicalize(&req, "a", -1).unwrap();
        let lines: Vec<&str> = s.split('\n').skip(12).collect();

        assert_eq!(
            lines,
            vec![
                "x-ms-blob-type:BlockBlob",
                "x-ms-client-request-id:id",
                "x-ms-version:2021-12-02",
                "/a/c/b",
            ]
        );
    }

    #[test]
    fn test_blob_query_values_sorted_and_joined() {
        let req = signing_request(http::Request::get(
            "https://a.blob.core.windows.net/c?Restype=container&comp=list&include=snapshots&include=metadata",
        ));

        let s = Protocol::BlobQueueFile.canonicalize(&req, "a", -1).unwrap();

        assert!(
            s.ends_with("\n/a/c\ncomp:list\ninclude:metadata,snapshots\nrestype:container"),
            "{s}"
        );
    }

    #[test]
    fn test_blob_line_count_is_fixed() {
        let bare = signing_request(http::Request::get("https://a.blob.core.windows.net/c/b"));
        let full = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b")
                .header("Content-Encoding", "gzip")
                .header("Content-Language", "en-US")
                .header("Content-MD5", "md5")
                .header("Content-Type", "text/plain")
                .header("Date", "Fri, 26 Jun 2015 23:39:12 GMT")
                .header("If-Modified-Since", "Fri, 26 Jun 2015 23:39:12 GMT")
                .header("If-Match", "\"etag\"")
                .header("If-None-Match", "*")
                .header("If-Unmodified-Since", "Fri, 26 Jun 2015 23:39:12 GMT")
                .header("Range", "bytes=0-1"),
        );

        let bare = Protocol::BlobQueueFile.canonicalize(&bare, "a", -1).unwrap();
        let full = Protocol::BlobQueueFile.canonicalize(&full, "a", 12).unwrap();

        assert_eq!(bare.split('\n').count(), 13);
        assert_eq!(full.split('\n').count(), 13);
    }

    #[test]
    fn test_blob_is_deterministic() {
        let req = signing_request(
            http::Request::get("https://a.blob.core.windows.net/c/b?b=2&a=1")
                .header("x-ms-meta-z", "z")
                .header("x-ms-meta-y", "y")
                .header("x-ms-meta-x", "x"),
        );

        let first = Protocol::BlobQueueFile.canonicalize(&req, "a", 5).unwrap();
        let second = Protocol::BlobQueueFile.canonicalize(&req, "a", 5).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_blob_non_ascii_header_value() {
        let mut req = signing_request(http::Request::get("https://a.blob.core.windows.net/c/b"));
        req.header_insert(
            HeaderName::from_static("x-ms-meta-name"),
            http::HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap(),
        );

        let err = Protocol::BlobQueueFile
            .canonicalize(&req, "a", -1)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Canonicalization);
    }

    #[test_case(Protocol::BlobQueueFile; "blob")]
    #[test_case(Protocol::Table; "table")]
    fn test_path_not_utf8(protocol: Protocol) {
        let req = signing_request(http::Request::get("https://a.blob.core.windows.net/c/%FF%FE"));

        let err = protocol.canonicalize(&req, "a", -1).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Canonicalization);
    }

    #[test]
    fn test_table() {
        let req = signing_request(
            http::Request::get("https://myaccount.table.core.windows.net/mytable(PartitionKey='p',RowKey='r')?$select=Name&comp=metadata")
                .header("Content-Type", "application/json")
                .header("Date", "Fri, 26 Jun 2015 23:39:12 GMT")
                .header("x-ms-version", "2021-12-02"),
        );

        let s = Protocol::Table.canonicalize(&req, "myaccount", -1).unwrap();

        assert_eq!(
            s,
            "GET\n\napplication/json\nFri, 26 Jun 2015 23:39:12 GMT\n/myaccount/mytable(PartitionKey='p',RowKey='r')?comp=metadata"
        );
    }

    #[test]
    fn test_table_line_count_is_fixed() {
        let bare = signing_request(http::Request::get("https://a.table.core.windows.net/t"));
        let full = signing_request(
            http::Request::post("https://a.table.core.windows.net/t?timeout=30")
                .header("Content-MD5", "md5")
                .header("Content-Type", "application/json")
                .header("Date", "Fri, 26 Jun 2015 23:39:12 GMT")
                .header("x-ms-meta-a", "1"),
        );

        for req in [bare, full] {
            let s = Protocol::Table.canonicalize(&req, "a", 10).unwrap();
            assert_eq!(s.split('\n').count(), 5, "{s}");
        }
    }
}
