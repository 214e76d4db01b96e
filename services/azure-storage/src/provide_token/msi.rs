use async_trait::async_trait;
use azsign_core::{Context, Error, Result};
use bytes::Bytes;
use log::debug;

use super::parse_token_response;
use crate::constants::*;
use crate::{AccessToken, ProvideToken};

/// Fetch tokens from the Azure Instance Metadata Service (managed identity).
///
/// Reference: <https://learn.microsoft.com/en-us/entra/identity/managed-identities-azure-resources/how-to-use-vm-token#get-a-token-using-http>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsiTokenProvider {
    auth_endpoint: String,
    tenant_id: Option<String>,
    client_id: Option<String>,
    authority: String,
}

impl MsiTokenProvider {
    /// Create a new managed identity provider.
    ///
    /// Blank arguments fall back to defaults: the IMDS endpoint for
    /// `auth_endpoint` and `https://login.microsoftonline.com/` for
    /// `authority`. `tenant_id` and `client_id` are only sent when set.
    pub fn new(auth_endpoint: &str, tenant_id: &str, client_id: &str, authority: &str) -> Self {
        let auth_endpoint = match auth_endpoint.trim() {
            "" => DEFAULT_MSI_ENDPOINT,
            v => v,
        };
        let authority = match authority.trim() {
            "" => DEFAULT_MSI_AUTHORITY,
            v => v,
        };

        Self {
            auth_endpoint: auth_endpoint.to_string(),
            tenant_id: non_blank(tenant_id),
            client_id: non_blank(client_id),
            authority: format!("{}/", authority.trim_end_matches('/')),
        }
    }

    /// The metadata endpoint tokens are requested from.
    pub fn auth_endpoint(&self) -> &str {
        &self.auth_endpoint
    }

    /// The authority, always ending with a single `/`.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The tenant to request the token for, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    /// The client id of a user assigned identity, if any.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    fn token_url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("api-version", MSI_API_VERSION)
            .append_pair("resource", STORAGE_RESOURCE);
        if let Some(tenant_id) = &self.tenant_id {
            query.append_pair("authority", &format!("{}{tenant_id}", self.authority));
        }
        if let Some(client_id) = &self.client_id {
            query.append_pair("client_id", client_id);
        }

        let sep = if self.auth_endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", self.auth_endpoint, query.finish())
    }
}

#[async_trait]
impl ProvideToken for MsiTokenProvider {
    async fn provide_token(&self, ctx: &Context) -> Result<AccessToken> {
        debug!("fetching managed identity token from {}", self.auth_endpoint);

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(self.token_url())
            .header(METADATA, "true")
            .body(Bytes::new())
            .map_err(|e| {
                Error::token_fetch(format!(
                    "invalid managed identity endpoint {}",
                    self.auth_endpoint
                ))
                .with_source(e)
            })?;

        let resp = ctx.http_send(req).await?;
        parse_token_response(&self.auth_endpoint, resp)
    }
}

fn non_blank(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}
