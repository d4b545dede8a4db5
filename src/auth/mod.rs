//! auth - SSH deploy key handling
//!
//! Every application authenticates to its remote with its own deploy key
//! pair, supplied per call by an external key service. This module only
//! wraps that material; turning it into libgit2 credentials happens in
//! [`crate::git::transport`].
//!
//! # Security
//!
//! Key material MUST never appear in logs, JSON outputs, error messages,
//! or debug output. Types here zero their buffers on drop and redact
//! `Debug`.
//!
//! # Example
//!
//! ```no_run
//! use appgit::auth::DeployKeyPair;
//! use std::path::Path;
//!
//! let keys = DeployKeyPair::from_files(
//!     Path::new("/run/keys/app.pub"),
//!     Path::new("/run/keys/app"),
//! )?;
//! println!("using deploy key {}", keys.fingerprint());
//! # Ok::<(), appgit::auth::AuthError>(())
//! ```

mod deploy_key;
mod errors;

pub use deploy_key::DeployKeyPair;
pub use errors::AuthError;
