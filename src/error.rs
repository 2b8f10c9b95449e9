//! Error types returned by the signer and verifier.
//!
//! The three kinds a caller can match on — bad input, unusable key material,
//! and signature integrity failure — are kept deliberately separate: a
//! verifier policy violation (a missing required header) is reported as
//! [`VerifyError::InvalidKey`], not [`VerifyError::Jws`], even though both
//! ultimately cause `verify()` to fail. See [`VerifyError`] for why.

use thiserror::Error;

/// Errors returned by [`crate::sign::Signer::sign`].
#[derive(Debug, Error)]
pub enum SignError {
    /// A caller-supplied argument (method, path) was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The private key could not be parsed or is not a P-521 EC key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The underlying ECDSA operation failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors returned by [`crate::verify::Verifier::verify`] and
/// [`crate::extract_header`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A caller-supplied argument (method, path) was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The public key (or the `kid` used to look one up in a JWKS) could not
    /// be resolved, or the caller's required-header policy rejected the
    /// signature. These are bundled together deliberately: from the
    /// caller's perspective both mean "this signature is not acceptable
    /// for this purpose", as distinct from "this signature is corrupt or
    /// tampered with" ([`VerifyError::Jws`]).
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The JWS is malformed, uses an unsupported version/algorithm, omits a
    /// header the verifier needed, or failed cryptographic verification
    /// against every path variant that was attempted.
    #[error("jws error: {0}")]
    Jws(String),
}

impl From<PathError> for SignError {
    fn from(err: PathError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<PathError> for VerifyError {
    fn from(err: PathError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// A malformed `path` argument, shared between the signer and verifier so
/// the same validation logic produces the same message on both sides.
#[derive(Debug, Error)]
pub enum PathError {
    /// The path does not start with `/`.
    #[error("path must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    /// The path contains a scheme/authority marker (`://`), i.e. it looks
    /// like a full URL rather than a path.
    #[error("path must not contain a scheme or authority: {0:?}")]
    ContainsAuthority(String),
}
