use std::fmt::{Debug, Formatter};
use std::str::FromStr;

use azsign_core::utils::Redact;
use azsign_core::{Context, Error, Result};
use log::debug;

use crate::constants::*;
use crate::Credential;

/// The authentication scheme a [`Config`] builds a credential for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// Account name plus Base64 account key.
    SharedKey,
    /// Managed identity through the instance metadata endpoint.
    Msi,
    /// OAuth client credentials grant.
    OAuth,
    /// Pre-issued shared access signature.
    Sas,
}

impl FromStr for AuthType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharedkey" | "shared_key" | "key" => Ok(AuthType::SharedKey),
            "msi" => Ok(AuthType::Msi),
            "oauth" => Ok(AuthType::OAuth),
            "sas" => Ok(AuthType::Sas),
            _ => Err(Error::config_invalid(format!(
                "unknown auth type {s:?}, expected one of SharedKey, MSI, OAuth, SAS"
            ))),
        }
    }
}

/// Config carries all the configuration for Azure Storage credentials.
#[derive(Clone, Default)]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZBLOB_ACCOUNT_NAME`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZBLOB_ACCOUNT_KEY`
    pub account_key: Option<String>,
    /// `sas_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_STORAGE_SAS_TOKEN`
    pub sas_token: Option<String>,
    /// Which credential to build. Inferred from the other fields when unset.
    ///
    /// - env value: `AZURE_STORAGE_AUTH_TYPE`
    pub auth_type: Option<AuthType>,
    /// Managed identity endpoint, defaults to the instance metadata service.
    ///
    /// - env value: `AZURE_MSI_ENDPOINT`
    pub msi_endpoint: Option<String>,
    /// `tenant_id` value will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_TENANT_ID`
    pub tenant_id: Option<String>,
    /// Client id of a user assigned identity or of an app registration.
    ///
    /// - env value: `AZURE_CLIENT_ID`
    pub client_id: Option<String>,
    /// Authority used by managed identity, defaults to the public cloud.
    ///
    /// - env value: `AZURE_AUTHORITY_HOST`
    pub authority: Option<String>,
    /// OAuth token endpoint, must be https.
    ///
    /// - env value: `AZURE_OAUTH_CLIENT_ENDPOINT`
    pub client_endpoint: Option<String>,
    /// `client_secret` value will be loaded from:
    ///
    /// - this field if it's `is_some`
    /// - env value: `AZURE_CLIENT_SECRET`
    pub client_secret: Option<String>,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("sas_token", &Redact::from(&self.sas_token))
            .field("auth_type", &self.auth_type)
            .field("msi_endpoint", &self.msi_endpoint)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .field("client_endpoint", &self.client_endpoint)
            .field("client_secret", &Redact::from(&self.client_secret))
            .finish()
    }
}

impl Config {
    /// Load config from env.
    ///
    /// Fields that are already set keep their value.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        let envs = ctx.env_vars();
        let load = |field: &mut Option<String>, key: &str| {
            if field.is_none() {
                *field = envs.get(key).filter(|v| !v.is_empty()).cloned();
            }
        };

        load(&mut self.account_name, AZBLOB_ACCOUNT_NAME);
        load(&mut self.account_key, AZBLOB_ACCOUNT_KEY);
        load(&mut self.sas_token, AZURE_STORAGE_SAS_TOKEN);
        load(&mut self.msi_endpoint, AZURE_MSI_ENDPOINT);
        load(&mut self.tenant_id, AZURE_TENANT_ID);
        load(&mut self.client_id, AZURE_CLIENT_ID);
        load(&mut self.authority, AZURE_AUTHORITY_HOST);
        load(&mut self.client_endpoint, AZURE_OAUTH_CLIENT_ENDPOINT);
        load(&mut self.client_secret, AZURE_CLIENT_SECRET);

        if self.auth_type.is_none() {
            if let Some(v) = envs.get(AZURE_STORAGE_AUTH_TYPE).filter(|v| !v.is_empty()) {
                self.auth_type = Some(v.parse()?);
            }
        }

        Ok(self)
    }

    /// Build the credential this config describes.
    ///
    /// Without an explicit [`AuthType`] the scheme is inferred, first match
    /// wins: a SAS token, an account key, a client secret with a client
    /// endpoint, then a managed identity when a client id, tenant id or MSI
    /// endpoint is set.
    pub fn into_credential(self) -> Result<Credential> {
        let auth_type = match self.auth_type {
            Some(v) => v,
            None => self.infer_auth_type()?,
        };
        debug!("building azure storage credential for {auth_type:?}");

        match auth_type {
            AuthType::SharedKey => {
                let account_name = required(&self.account_name, "account_name")?;
                let account_key = required(&self.account_key, "account_key")?;
                Ok(Credential::with_shared_key(account_name, account_key))
            }
            AuthType::Sas => {
                let token = required(&self.sas_token, "sas_token")?;
                Ok(Credential::with_sas_token(token.trim_start_matches('?')))
            }
            AuthType::OAuth => {
                let account_name = required(&self.account_name, "account_name")?;
                let client_endpoint = required(&self.client_endpoint, "client_endpoint")?;
                let client_id = required(&self.client_id, "client_id")?;
                let client_secret = required(&self.client_secret, "client_secret")?;
                let is_https = client_endpoint
                    .get(..8)
                    .is_some_and(|v| v.eq_ignore_ascii_case("https://"));
                if !is_https {
                    return Err(Error::config_invalid(format!(
                        "OAuth client endpoint must use https: {client_endpoint}"
                    )));
                }
                Ok(Credential::with_oauth(
                    account_name,
                    client_endpoint,
                    client_id,
                    client_secret,
                ))
            }
            AuthType::Msi => {
                let account_name = required(&self.account_name, "account_name")?;
                Ok(Credential::with_msi(
                    account_name,
                    self.msi_endpoint.as_deref().unwrap_or_default(),
                    self.tenant_id.as_deref().unwrap_or_default(),
                    self.client_id.as_deref().unwrap_or_default(),
                    self.authority.as_deref().unwrap_or_default(),
                ))
            }
        }
    }

    fn infer_auth_type(&self) -> Result<AuthType> {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|v| !v.trim().is_empty());

        if set(&self.sas_token) {
            Ok(AuthType::Sas)
        } else if set(&self.account_key) {
            Ok(AuthType::SharedKey)
        } else if set(&self.client_secret) && set(&self.client_endpoint) {
            Ok(AuthType::OAuth)
        } else if set(&self.client_id) || set(&self.tenant_id) || set(&self.msi_endpoint) {
            Ok(AuthType::Msi)
        } else {
            Err(Error::config_invalid(
                "no azure storage credential configured",
            ))
        }
    }
}

fn required<'a>(v: &'a Option<String>, name: &str) -> Result<&'a str> {
    v.as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config_invalid(format!("{name} is required")))
}
