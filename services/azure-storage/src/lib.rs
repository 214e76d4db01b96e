//! Azure Storage request signer
//!
//! This crate authorizes requests to Azure Storage services with:
//! - Shared Key authentication for the Blob, Queue, File and Table services
//! - Bearer tokens from a managed identity endpoint (MSI)
//! - Bearer tokens from the OAuth client credentials grant
//! - SAS (Shared Access Signature) tokens, passed through untouched
//!
//! Bearer tokens are cached per credential and refreshed five minutes before
//! they expire.
//!
//! # Example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use azsign_azure_storage::{Config, Protocol, RequestSigner};
//! use azsign_core::{Context, OsEnv};
//! use azsign_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let ctx = Context::new()
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     // Pick up AZBLOB_ACCOUNT_NAME, AZBLOB_ACCOUNT_KEY and friends.
//!     let credential = Config::default().from_env(&ctx)?.into_credential()?;
//!
//!     let req = http::Request::get("https://account.blob.core.windows.net/container/blob")
//!         .header("x-ms-version", "2021-12-02")
//!         .body(reqwest::Body::default())?;
//!     let (mut parts, body) = req.into_parts();
//!
//!     RequestSigner::new()
//!         .sign(&ctx, &mut parts, &credential, Protocol::BlobQueueFile, -1)
//!         .await?;
//!
//!     let req = http::Request::from_parts(parts, body);
//!     let resp = reqwest::Client::new().execute(req.try_into()?).await?;
//!     println!("Response: {}", resp.status());
//!
//!     Ok(())
//! }
//! ```

mod constants;

mod canonicalize;
pub use canonicalize::Protocol;

mod config;
pub use config::{AuthType, Config};

mod credential;
pub use credential::Credential;

mod provide_token;
pub use provide_token::{ClientCredentialsTokenProvider, MsiTokenProvider};

mod sign_request;
pub use sign_request::RequestSigner;

pub mod signer;

mod token;
pub use token::{AccessToken, ProvideToken, TokenCache, REFRESH_WINDOW_SECS};
