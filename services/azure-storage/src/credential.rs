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

use azsign_core::utils::Redact;
use std::fmt::{Debug, Formatter};

use crate::{ClientCredentialsTokenProvider, MsiTokenProvider, TokenCache};

/// Credential enum for different Azure Storage authentication methods.
///
/// The variant and its configuration never change after construction; only
/// the token held by a token variant's cache does. Clones share that cache.
#[derive(Clone)]
pub enum Credential {
    /// Shared Key authentication with account name and key
    SharedKey {
        /// Azure storage account name.
        account_name: String,
        /// Azure storage account key, Base64 encoded.
        account_key: String,
    },
    /// Bearer token issued by the managed identity endpoint
    TokenMsi {
        /// Azure storage account name.
        account_name: String,
        /// Cached token in front of the managed identity endpoint.
        token: TokenCache<MsiTokenProvider>,
    },
    /// Bearer token issued through the OAuth client credentials grant
    TokenOAuth {
        /// Azure storage account name.
        account_name: String,
        /// Cached token in front of the OAuth token endpoint.
        token: TokenCache<ClientCredentialsTokenProvider>,
    },
    /// SAS (Shared Access Signature) token authentication
    ///
    /// The token is already part of the request URL, so nothing is signed.
    SasToken {
        /// SAS token.
        token: String,
    },
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("Credential::SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::TokenMsi {
                account_name,
                token,
            } => f
                .debug_struct("Credential::TokenMsi")
                .field("account_name", account_name)
                .field("token", token)
                .finish(),
            Credential::TokenOAuth {
                account_name,
                token,
            } => f
                .debug_struct("Credential::TokenOAuth")
                .field("account_name", account_name)
                .field("token", token)
                .finish(),
            Credential::SasToken { token } => f
                .debug_struct("Credential::SasToken")
                .field("token", &Redact::from(token))
                .finish(),
        }
    }
}

impl Credential {
    /// Create a new credential with shared key authentication.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Self::SharedKey {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Create a new credential backed by the managed identity endpoint.
    ///
    /// See [`MsiTokenProvider::new`] for how blank arguments are treated.
    pub fn with_msi(
        account_name: &str,
        auth_endpoint: &str,
        tenant_id: &str,
        client_id: &str,
        authority: &str,
    ) -> Self {
        Self::TokenMsi {
            account_name: account_name.to_string(),
            token: TokenCache::new(MsiTokenProvider::new(
                auth_endpoint,
                tenant_id,
                client_id,
                authority,
            )),
        }
    }

    /// Create a new credential backed by the OAuth client credentials grant.
    pub fn with_oauth(
        account_name: &str,
        client_endpoint: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self::TokenOAuth {
            account_name: account_name.to_string(),
            token: TokenCache::new(ClientCredentialsTokenProvider::new(
                client_endpoint,
                client_id,
                client_secret,
            )),
        }
    }

    /// Create a new credential with SAS token authentication.
    pub fn with_sas_token(sas_token: &str) -> Self {
        Self::SasToken {
            token: sas_token.to_string(),
        }
    }

    /// The storage account this credential signs for.
    ///
    /// SAS tokens are not bound to an account name here and return `None`.
    pub fn account_name(&self) -> Option<&str> {
        match self {
            Credential::SharedKey { account_name, .. }
            | Credential::TokenMsi { account_name, .. }
            | Credential::TokenOAuth { account_name, .. } => Some(account_name),
            Credential::SasToken { .. } => None,
        }
    }
}
