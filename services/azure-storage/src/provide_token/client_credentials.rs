// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use azsign_core::utils::Redact;
use azsign_core::{Context, Error, Result};
use bytes::Bytes;
use log::debug;

use super::parse_token_response;
use crate::constants::*;
use crate::{AccessToken, ProvideToken};

/// Fetch tokens with the OAuth 2.0 client credentials grant.
///
/// Both the v1 (`.../oauth2/token`) and v2 (`.../oauth2/v2.0/token`) Entra ID
/// endpoints are supported; v2 endpoints are asked for a `scope`, v1
/// endpoints for a `resource`.
///
/// Reference: <https://learn.microsoft.com/en-us/entra/identity-platform/v2-oauth2-client-creds-grant-flow>
#[derive(Clone)]
pub struct ClientCredentialsTokenProvider {
    client_endpoint: String,
    client_id: String,
    client_secret: String,
}

impl Debug for ClientCredentialsTokenProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsTokenProvider")
            .field("client_endpoint", &self.client_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &Redact::from(&self.client_secret))
            .finish()
    }
}

impl ClientCredentialsTokenProvider {
    /// Create a new client credentials provider.
    pub fn new(
        client_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_endpoint: client_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// The token endpoint.
    pub fn client_endpoint(&self) -> &str {
        &self.client_endpoint
    }

    /// The application (client) id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn is_v2_endpoint(&self) -> bool {
        self.client_endpoint.contains(OAUTH2_V2_PATH)
    }

    fn form_body(&self) -> String {
        let mut body = form_urlencoded::Serializer::new(String::new());
        if self.is_v2_endpoint() {
            body.append_pair("scope", STORAGE_SCOPE);
        } else {
            body.append_pair("resource", STORAGE_RESOURCE);
        }
        body.append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish()
    }
}

#[async_trait]
impl ProvideToken for ClientCredentialsTokenProvider {
    async fn provide_token(&self, ctx: &Context) -> Result<AccessToken> {
        debug!(
            "fetching client credentials token from {}",
            self.client_endpoint
        );

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(&self.client_endpoint)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Bytes::from(self.form_body()))
            .map_err(|e| {
                Error::token_fetch(format!(
                    "invalid client credentials endpoint {}",
                    self.client_endpoint
                ))
                .with_source(e)
            })?;

        let resp = ctx.http_send(req).await?;
        parse_token_response(&self.client_endpoint, resp)
    }
}
