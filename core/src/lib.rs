//! Core components for signing Azure Storage requests.
//!
//! This crate provides the foundational types shared by the azsign service
//! crates. It does not know about any particular authentication scheme; it
//! only supplies the seams those schemes are built on.
//!
//! ## Overview
//!
//! - **Context**: A container that holds implementations for HTTP sending and environment access
//! - **SigningRequest**: A detached view of an outgoing request used for canonicalization
//! - **Error**: The error type shared by every azsign crate
//!
//! ## Example
//!
//! ```
//! use azsign_core::{Context, SigningRequest, StaticEnv};
//!
//! # fn main() -> azsign_core::Result<()> {
//! let ctx = Context::new().with_env(StaticEnv::default());
//! assert_eq!(ctx.env_var("AZBLOB_ACCOUNT_NAME"), None);
//!
//! let (parts, _) = http::Request::get("https://account.blob.core.windows.net/container/blob")
//!     .header("x-ms-version", "2021-12-02")
//!     .body(())
//!     .expect("request must be valid")
//!     .into_parts();
//!
//! let req = SigningRequest::build(&parts)?;
//! assert_eq!(req.path, "/container/blob");
//! # Ok(())
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`HttpSend`]: For sending HTTP requests to token endpoints
//! - [`Env`]: For environment variable access
//!
//! ## Utilities
//!
//! - [`hash`]: HMAC and Base64 helpers
//! - [`time`]: Time helpers based on chrono
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, HttpSend, NoopEnv, NoopHttpSend, OsEnv, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod request;
pub use request::SigningRequest;
