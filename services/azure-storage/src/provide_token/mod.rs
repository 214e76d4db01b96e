mod client_credentials;
pub use client_credentials::ClientCredentialsTokenProvider;

mod msi;
pub use msi::MsiTokenProvider;

use azsign_core::time::{from_timestamp, now, parse_rfc3339, DateTime};
use azsign_core::{Error, Result};
use bytes::Bytes;
use chrono::TimeDelta;
use http::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::AccessToken;

#[derive(Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
}

/// Identity endpoints disagree on whether numbers are quoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrString::Number(v) => Some(*v),
            NumberOrString::String(v) => v.trim().parse().ok(),
        }
    }
}

/// Turn an identity endpoint's response into an [`AccessToken`].
///
/// Both providers share this so they agree on status handling and on the
/// accepted expiry formats.
pub(crate) fn parse_token_response(
    endpoint: &str,
    resp: http::Response<Bytes>,
) -> Result<AccessToken> {
    let status = resp.status();
    if !status.is_success() {
        let body = String::from_utf8_lossy(resp.body());
        return Err(Error::token_fetch(format!(
            "request to {endpoint} failed with status {status}: {body}"
        )));
    }

    let is_form = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    let token = if is_form {
        let mut token = TokenResponse::default();
        for (k, v) in form_urlencoded::parse(resp.body()) {
            match k.as_ref() {
                "access_token" => token.access_token = Some(v.into_owned()),
                "expires_on" => token.expires_on = Some(NumberOrString::String(v.into_owned())),
                "expires_in" => token.expires_in = Some(NumberOrString::String(v.into_owned())),
                _ => {}
            }
        }
        token
    } else {
        serde_json::from_slice::<TokenResponse>(resp.body()).map_err(|e| {
            Error::token_fetch(format!("failed to parse token response from {endpoint}"))
                .with_source(e)
        })?
    };

    let access_token = token
        .access_token
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Error::token_fetch(format!("token response from {endpoint} has no access_token"))
        })?;
    let expires_on = match (token.expires_on, token.expires_in) {
        (Some(expires_on), _) => parse_expires_on(&expires_on)?,
        (None, Some(expires_in)) => parse_expires_in(&expires_in)?,
        (None, None) => {
            return Err(Error::token_fetch(format!(
                "token response from {endpoint} has neither expires_on nor expires_in"
            )))
        }
    };

    Ok(AccessToken::new(access_token, expires_on))
}

fn parse_expires_on(v: &NumberOrString) -> Result<DateTime> {
    let parsed = match v {
        NumberOrString::Number(secs) => from_timestamp(*secs),
        NumberOrString::String(s) => match s.trim().parse::<i64>() {
            Ok(secs) => from_timestamp(secs),
            Err(_) => parse_rfc3339(s.trim()),
        },
    };

    parsed.map_err(|e| Error::token_fetch("invalid expires_on in token response").with_source(e))
}

fn parse_expires_in(v: &NumberOrString) -> Result<DateTime> {
    v.as_i64()
        .and_then(TimeDelta::try_seconds)
        .and_then(|d| now().checked_add_signed(d))
        .ok_or_else(|| Error::token_fetch("invalid expires_in in token response"))
}
