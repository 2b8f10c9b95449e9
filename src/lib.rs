//! # `tl-request-signing`
//!
//! Detached JSON Web Signatures (JWS) binding an HTTP-style request's
//! method, path, selected headers, and body, using ECDSA over curve P-521
//! with SHA-512 (ES512).
//!
//! This crate signs and verifies; it performs no transport I/O, never
//! fetches a `jku` URL, and holds no state beyond the key material it was
//! constructed with. See [`Signer`] to produce a signature and [`Verifier`]
//! to check one — either against a single known public key or against a
//! JWKS document, resolving by the `kid` carried in the signature.
//!
//! ```rust,ignore
//! use tl_request_signing::{Signer, Verifier};
//!
//! let jws = Signer::new("my-kid", private_key_pem)?
//!     .method("POST")
//!     .path("/merchant_accounts/abc/sweeping")
//!     .header("Idempotency-Key", "idemp-123")
//!     .body(r#"{"currency":"GBP"}"#)
//!     .sign()?;
//!
//! Verifier::with_pem(public_key_pem)?
//!     .method("POST")
//!     .path("/merchant_accounts/abc/sweeping")
//!     .header("Idempotency-Key", "idemp-123")
//!     .body(r#"{"currency":"GBP"}"#)
//!     .verify(&jws)?;
//! ```

mod canonical;
mod error;
mod jws;
mod key;
mod sign;
mod verify;

pub use error::{PathError, SignError, VerifyError};
pub use jws::ProtectedHeader;
pub use key::{
    encode_jwk_coordinates, load_private_ec_pem, load_public_ec_pem, select_jwk, PrivateKey,
    PublicKeyHandle,
};
pub use sign::Signer;
pub use verify::Verifier;

/// Parse the protected header of a detached compact JWS without verifying
/// it. This is the only way to learn a candidate signature's `kid` (and
/// optional `jku`) before a key has been resolved.
///
/// # Errors
/// Returns [`VerifyError::Jws`] if `jws` is not a well-formed detached
/// compact JWS (wrong segment count, non-empty payload segment, invalid
/// base64url, or malformed header JSON). Never checks `alg`, `tl_version`,
/// or the signature itself — that is [`Verifier::verify`]'s job.
pub fn extract_header(jws: &str) -> Result<ProtectedHeader, VerifyError> {
    tracing::debug!("extract_header");
    Ok(jws::decode(jws)?.header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_header_succeeds_without_a_key() {
        let priv_pem = test_support::private_key_pem();
        let jws = Signer::new("kid-1", &priv_pem)
            .unwrap()
            .method("POST")
            .path("/tl-webhook")
            .header("X-Tl-Webhook-Timestamp", "2021-11-29T11:42:55Z")
            .header("Content-Type", "application/json")
            .jku("https://webhooks.truelayer.com/.well-known/jwks")
            .body(r#"{"event_type":"example"}"#)
            .sign()
            .unwrap();

        let header = extract_header(&jws).unwrap();
        assert_eq!(header.alg, "ES512");
        assert_eq!(header.kid, "kid-1");
        assert_eq!(header.tl_version, "2");
        assert_eq!(header.tl_headers, "X-Tl-Webhook-Timestamp,Content-Type");
        assert_eq!(header.jku.as_deref(), Some("https://webhooks.truelayer.com/.well-known/jwks"));
    }

    #[test]
    fn extract_header_reports_empty_tl_headers_when_none_signed() {
        let priv_pem = test_support::private_key_pem();
        let jws = Signer::new("kid-1", &priv_pem).unwrap().method("GET").path("/x").sign().unwrap();

        let header = extract_header(&jws).unwrap();
        assert_eq!(header.tl_headers, "");
    }

    #[test]
    fn extract_header_rejects_malformed_jws() {
        assert!(extract_header("not-a-jws").is_err());
    }
}

/// Shared fixture helpers for unit tests across modules. Not part of the
/// public API.
#[cfg(test)]
pub(crate) mod test_support {
    use p521::pkcs8::EncodePrivateKey;

    /// A fixed, deterministic (not randomly generated) P-521 private key,
    /// used only in tests so signing/verification tests don't depend on
    /// system randomness. The scalar is an arbitrary nonzero sequence, not a
    /// real key.
    pub(crate) fn private_key_pem() -> Vec<u8> {
        let mut scalar = [0u8; 66];
        for (i, b) in scalar.iter_mut().enumerate().skip(1) {
            *b = (i as u8).wrapping_mul(7).wrapping_add(1);
        }
        let secret_key = p521::SecretKey::from_slice(&scalar).expect("valid test scalar");
        secret_key
            .to_pkcs8_pem(p521::pkcs8::LineEnding::LF)
            .expect("encode test key")
            .as_bytes()
            .to_vec()
    }

    /// The public counterpart of [`private_key_pem`].
    pub(crate) fn public_key_pem(private_pem: &[u8]) -> Vec<u8> {
        use p521::pkcs8::EncodePublicKey;

        let private_key = crate::key::load_private_ec_pem(private_pem).expect("valid test key");
        let public_key = p521::PublicKey::from(private_key.signing_key.verifying_key().to_owned());
        public_key
            .to_public_key_pem(p521::pkcs8::LineEnding::LF)
            .expect("encode test public key")
            .into_bytes()
    }
}
