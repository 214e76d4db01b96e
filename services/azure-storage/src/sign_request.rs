use http::request::Parts;
use http::{header, HeaderValue};
use log::{debug, trace};

use azsign_core::hash::base64_decode;
use azsign_core::time::{format_http_date, now, DateTime};
use azsign_core::{Context, Error, Result, SigningRequest};

use crate::signer::sign_string_with_decoded_key;
use crate::{Credential, Protocol, ProvideToken, TokenCache};

/// RequestSigner attaches Azure Storage authorization to outgoing requests.
///
/// - [Authorize with Shared Key](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
/// - [Authorize with Microsoft Entra ID](https://learn.microsoft.com/en-us/rest/api/storageservices/authorize-with-azure-active-directory)
#[derive(Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new Azure Storage request signer.
    pub fn new() -> Self {
        Self { time: None }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Authorize `parts` with `credential`.
    ///
    /// Returns the `Authorization` header value that was attached, or `None`
    /// for SAS credentials whose token already lives in the URL. When an
    /// error is returned, `parts` is left exactly as it was.
    ///
    /// `content_length` is the length of the body that will be sent, or `-1`
    /// when unknown. It only matters for Shared Key signing.
    pub async fn sign(
        &self,
        ctx: &Context,
        parts: &mut Parts,
        credential: &Credential,
        protocol: Protocol,
        content_length: i64,
    ) -> Result<Option<String>> {
        let authorization = match credential {
            Credential::SharedKey {
                account_name,
                account_key,
            } => {
                let key = base64_decode(account_key)?;
                let mut req = SigningRequest::build(parts)?;

                let date = format_http_date(self.time.unwrap_or_else(now));
                req.header_insert(header::DATE, HeaderValue::from_str(&date)?);

                let string_to_sign = protocol.canonicalize(&req, account_name, content_length)?;
                trace!("calculated string to sign: {string_to_sign:?}");
                let signature = sign_string_with_decoded_key(&string_to_sign, &key)?;

                let authorization = format!("SharedKey {account_name}:{signature}");
                insert_authorization(&mut req, &authorization)?;
                debug!("signed {} {} with shared key", req.method, req.path);
                req.apply(parts);
                authorization
            }
            Credential::TokenMsi { token, .. } => sign_bearer(ctx, parts, token).await?,
            Credential::TokenOAuth { token, .. } => sign_bearer(ctx, parts, token).await?,
            Credential::SasToken { .. } => return Ok(None),
        };

        Ok(Some(authorization))
    }
}

async fn sign_bearer<P: ProvideToken>(
    ctx: &Context,
    parts: &mut Parts,
    token: &TokenCache<P>,
) -> Result<String> {
    let mut req = SigningRequest::build(parts)?;
    if !req.is_https() {
        return Err(Error::unsupported_transport(format!(
            "bearer tokens must be sent over https, got scheme {}",
            req.scheme
        )));
    }

    let authorization = format!("Bearer {}", token.get_token(ctx).await?);
    insert_authorization(&mut req, &authorization)?;
    debug!("attached bearer token to {} {}", req.method, req.path);
    req.apply(parts);
    Ok(authorization)
}

fn insert_authorization(req: &mut SigningRequest, authorization: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(authorization)?;
    value.set_sensitive(true);
    req.header_insert(header::AUTHORIZATION, value);
    Ok(())
}
