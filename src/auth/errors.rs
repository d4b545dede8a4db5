//! auth::errors
//!
//! Errors from validating deploy key material.
//!
//! Messages describe what is wrong with a key without quoting any of it.
//!
//! # Example
//!
//! ```
//! use appgit::auth::AuthError;
//!
//! let err = AuthError::MalformedPrivateKey;
//! assert!(err.to_string().contains("private key"));
//! ```

use thiserror::Error;

/// Errors from deploy key validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No private key supplied.
    #[error("deploy private key is empty")]
    EmptyPrivateKey,

    /// The private key is not PEM or OpenSSH armored.
    #[error("deploy private key is not a PEM or OpenSSH private key")]
    MalformedPrivateKey,

    /// The public key is not in `authorized_keys` form.
    #[error("deploy public key is not an OpenSSH public key")]
    MalformedPublicKey,

    /// Key file could not be read.
    #[error("cannot read key file '{path}': {message}")]
    KeyFile { path: String, message: String },
}
