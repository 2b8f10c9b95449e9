//! Detached-JWS signer.

use ecdsa::signature::Signer as _;
use p521::ecdsa::Signature;

use crate::canonical::{canonicalize, validate_path};
use crate::error::SignError;
use crate::jws::{self, ProtectedHeader, ALG_ES512, TL_VERSION};
use crate::key::{load_private_ec_pem, PrivateKey};

/// Builds a detached compact JWS over an HTTP-style request.
///
/// Construct with [`Signer::new`], add the request facts with the setter
/// methods, then call [`Signer::sign`]. Each call to `sign` is an
/// independent pure computation; a `Signer` holds no state beyond what was
/// set on it and can be reused to sign multiple times if desired (though in
/// practice callers build one per request).
pub struct Signer {
    kid: String,
    private_key: PrivateKey,
    method: Option<String>,
    path: Option<String>,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
    jku: Option<String>,
}

impl Signer {
    /// Create a signer for the given key identifier, loading the private key
    /// from a PEM-encoded P-521 EC key (PKCS#8 or SEC1).
    ///
    /// # Errors
    /// Returns [`SignError::InvalidKey`] if `private_key_pem` cannot be
    /// parsed as a P-521 EC private key.
    pub fn new(kid: impl Into<String>, private_key_pem: &[u8]) -> Result<Self, SignError> {
        let private_key = load_private_ec_pem(private_key_pem)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Ok(Self {
            kid: kid.into(),
            private_key,
            method: None,
            path: None,
            headers: Vec::new(),
            body: Vec::new(),
            jku: None,
        })
    }

    /// Set the HTTP method. Required before calling [`Signer::sign`].
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request path. Required before calling [`Signer::sign`]; must
    /// start with `/`.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a single header to the signed set, preserving call order.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append every entry of `headers` to the signed set, in the iteration
    /// order of `headers`. Iteration order becomes signing order — pass an
    /// ordered container (e.g. a `Vec`) if order matters to you, since a
    /// `HashMap` would make it unspecified.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        for (name, value) in headers {
            self.headers.push((name.into(), value.into()));
        }
        self
    }

    /// Set the request body. Defaults to empty.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the informational `jku` header field. Never fetched by this
    /// crate; purely advisory for the verifier's key resolution.
    #[must_use]
    pub fn jku(mut self, jku: impl Into<String>) -> Self {
        self.jku = Some(jku.into());
        self
    }

    /// Produce the detached compact JWS.
    ///
    /// # Errors
    /// Returns [`SignError::InvalidArgument`] if `method` was never set (or
    /// is empty) or `path` is missing/invalid, and
    /// [`SignError::Signing`] if the underlying ECDSA operation fails.
    pub fn sign(self) -> Result<String, SignError> {
        tracing::debug!("sign");

        let method = self.method.ok_or_else(|| {
            SignError::InvalidArgument("method must be set before signing".to_string())
        })?;
        if method.is_empty() {
            return Err(SignError::InvalidArgument("method must not be empty".to_string()));
        }
        let method_upper = method.to_ascii_uppercase();

        let path = self
            .path
            .ok_or_else(|| SignError::InvalidArgument("path must be set before signing".to_string()))?;
        validate_path(&path)?;

        let tl_headers = self.headers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(",");

        let header = ProtectedHeader {
            alg: ALG_ES512.to_string(),
            kid: self.kid,
            tl_version: TL_VERSION.to_string(),
            tl_headers,
            jku: self.jku,
        };

        let header_b64 = jws::encode_header(&header).map_err(SignError::Signing)?;
        let canonical = canonicalize(&method_upper, &path, &self.headers, &self.body)?;

        let mut signing_input = Vec::with_capacity(header_b64.len() + 1 + canonical.len());
        signing_input.extend_from_slice(header_b64.as_bytes());
        signing_input.push(b'.');
        signing_input.extend_from_slice(&canonical);

        let signature: Signature = self
            .private_key
            .signing_key
            .try_sign(&signing_input)
            .map_err(|e| SignError::Signing(e.to_string()))?;

        jws::encode(&header, &signature.to_bytes()).map_err(SignError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{private_key_pem, public_key_pem};
    use crate::verify::Verifier;

    #[test]
    fn round_trip_with_matching_inputs_succeeds() {
        let priv_pem = private_key_pem();
        let pub_pem = public_key_pem(&priv_pem);

        let jws = Signer::new("kid-1", &priv_pem)
            .unwrap()
            .method("POST")
            .path("/merchant_accounts/a61acaef/sweeping")
            .header("Idempotency-Key", "idemp-2076717c")
            .body(r#"{"currency":"GBP","max_amount_in_minor":5000000}"#)
            .sign()
            .unwrap();

        Verifier::with_pem(&pub_pem)
            .unwrap()
            .method("POST")
            .path("/merchant_accounts/a61acaef/sweeping")
            .header("Idempotency-Key", "idemp-2076717c")
            .header("X-Whatever-2", "t2345d")
            .body(r#"{"currency":"GBP","max_amount_in_minor":5000000}"#)
            .verify(&jws)
            .unwrap();
    }

    #[test]
    fn method_must_be_set() {
        let priv_pem = private_key_pem();
        let err = Signer::new("kid-1", &priv_pem).unwrap().path("/x").sign().unwrap_err();
        assert!(matches!(err, SignError::InvalidArgument(_)));
    }

    #[test]
    fn path_must_be_valid() {
        let priv_pem = private_key_pem();
        let err = Signer::new("kid-1", &priv_pem)
            .unwrap()
            .method("GET")
            .path("no-leading-slash")
            .sign()
            .unwrap_err();
        assert!(matches!(err, SignError::InvalidArgument(_)));
    }
}
