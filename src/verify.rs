//! Detached-JWS verifier.
//!
//! This is the tolerant half of the pair: it accepts signatures over
//! requests that have been reshaped in transit (header case, extra headers,
//! one trailing-slash flip, method case) while rejecting any change to a
//! value that was actually signed. See the module-level state machine in
//! [`Verifier::verify`].

use std::collections::HashMap;

use ecdsa::signature::Verifier as _;
use p521::ecdsa::{Signature, VerifyingKey};

use crate::canonical::{canonicalize, validate_path};
use crate::error::VerifyError;
use crate::jws::{self, ProtectedHeader, ALG_ES512, TL_VERSION};
use crate::key::{load_public_ec_pem, select_jwk, PublicKeyHandle};

const P1363_SIGNATURE_LEN: usize = 132;

enum KeySource {
    Pem(PublicKeyHandle),
    Jwks(Vec<u8>),
}

/// Verifies a detached compact JWS against a caller-presented HTTP-style
/// request.
///
/// Construct with [`Verifier::with_pem`] or [`Verifier::with_jwks`], supply
/// the request facts as the verifier observed them (headers may be in any
/// order or case, and may include extras), then call [`Verifier::verify`].
pub struct Verifier {
    key_source: KeySource,
    method: Option<String>,
    path: Option<String>,
    headers: HashMap<String, Vec<u8>>,
    required_headers: Vec<String>,
    body: Vec<u8>,
}

impl Verifier {
    /// Construct a verifier that checks against a single known public key,
    /// loaded from a PEM-encoded P-521 SPKI public key. Any `jku` present on
    /// the JWS is ignored.
    ///
    /// # Errors
    /// Returns [`VerifyError::InvalidKey`] if `public_key_pem` cannot be
    /// parsed as a P-521 EC public key.
    pub fn with_pem(public_key_pem: &[u8]) -> Result<Self, VerifyError> {
        let key = load_public_ec_pem(public_key_pem)
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        Ok(Self::new(KeySource::Pem(key)))
    }

    /// Construct a verifier that resolves the signing key from a JWKS
    /// document by the `kid` carried in the JWS to be verified. The JWKS
    /// bytes are parsed lazily, once per [`Verifier::verify`] call.
    #[must_use]
    pub fn with_jwks(jwks_json: impl Into<Vec<u8>>) -> Self {
        Self::new(KeySource::Jwks(jwks_json.into()))
    }

    fn new(key_source: KeySource) -> Self {
        Self {
            key_source,
            method: None,
            path: None,
            headers: HashMap::new(),
            required_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set the HTTP method as observed by the verifier. Required.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request path as observed by the verifier. Required.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a header as observed by the verifier. Case-insensitive for
    /// matching purposes; last write for a given name (case-insensitively)
    /// wins.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Add every entry of `headers`, same semantics as repeated calls to
    /// [`Verifier::header`].
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        for (name, value) in headers {
            self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        }
        self
    }

    /// Require that `name` be among the signature's signed headers
    /// (case-insensitively). If it is not, [`Verifier::verify`] fails with
    /// [`VerifyError::InvalidKey`] — a deliberate policy choice, see the
    /// crate-level error documentation.
    #[must_use]
    pub fn require_header(mut self, name: impl Into<String>) -> Self {
        self.required_headers.push(name.into().to_ascii_lowercase());
        self
    }

    /// Set the request body as observed by the verifier. Defaults to empty.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Verify `jws` against the request facts set on this builder.
    ///
    /// State machine: validate the caller's method/path, parse the JWS,
    /// resolve the key, check the caller's required-header policy,
    /// reconstruct the signed header list in the signer's order/case, then
    /// attempt the signature check against up to two path variants (see
    /// module docs), accepting on the first match.
    ///
    /// # Errors
    /// - [`VerifyError::InvalidArgument`] if `path` is missing or invalid.
    /// - [`VerifyError::InvalidKey`] if the JWKS lookup fails, or a required
    ///   header is not among the signed headers.
    /// - [`VerifyError::Jws`] for any parse failure, an unsupported
    ///   `tl_version`/`alg`, a signed header missing from the caller's
    ///   headers, or signature mismatch on every path variant tried.
    pub fn verify(self, jws: &str) -> Result<(), VerifyError> {
        tracing::debug!("verify");

        let method = self
            .method
            .ok_or_else(|| VerifyError::InvalidArgument("method must be set before verifying".to_string()))?;
        let method_upper = method.to_ascii_uppercase();

        let path = self
            .path
            .ok_or_else(|| VerifyError::InvalidArgument("path must be set before verifying".to_string()))?;
        validate_path(&path)?;

        let decoded = jws::decode(jws)?;
        let header = &decoded.header;

        if header.alg != ALG_ES512 {
            return Err(VerifyError::Jws(format!(
                "unsupported alg {:?}, expected {ALG_ES512}",
                header.alg
            )));
        }
        if header.tl_version != TL_VERSION {
            return Err(VerifyError::Jws(format!(
                "unsupported tl_version {:?}, expected {TL_VERSION:?} (legacy v1 signatures are not accepted)",
                header.tl_version
            )));
        }

        let verifying_key = self.resolve_key(header)?;

        let signed_names = header.signed_header_names();
        for required in &self.required_headers {
            let present = signed_names.iter().any(|n| n.eq_ignore_ascii_case(required));
            if !present {
                return Err(VerifyError::InvalidKey(format!(
                    "required header {required:?} is not in the signed header set"
                )));
            }
        }

        let mut reconstructed: Vec<(String, Vec<u8>)> = Vec::with_capacity(signed_names.len());
        for signed_name in &signed_names {
            let value = self
                .headers
                .get(&signed_name.to_ascii_lowercase())
                .ok_or_else(|| {
                    VerifyError::Jws(format!("signed header {signed_name:?} was not supplied for verification"))
                })?;
            reconstructed.push(((*signed_name).to_string(), value.clone()));
        }

        if decoded.signature.len() != P1363_SIGNATURE_LEN {
            return Err(VerifyError::Jws(format!(
                "signature must be {P1363_SIGNATURE_LEN} bytes, found {}",
                decoded.signature.len()
            )));
        }
        let signature = Signature::from_slice(&decoded.signature)
            .map_err(|e| VerifyError::Jws(format!("invalid signature encoding: {e}")))?;

        for candidate_path in path_variants(&path) {
            let canonical =
                canonicalize(&method_upper, &candidate_path, &reconstructed, &self.body)?;

            let mut signing_input =
                Vec::with_capacity(decoded.header_b64.len() + 1 + canonical.len());
            signing_input.extend_from_slice(decoded.header_b64.as_bytes());
            signing_input.push(b'.');
            signing_input.extend_from_slice(&canonical);

            if verifying_key.verify(&signing_input, &signature).is_ok() {
                return Ok(());
            }
        }

        Err(VerifyError::Jws("signature verification failed".to_string()))
    }

    fn resolve_key(&self, header: &ProtectedHeader) -> Result<VerifyingKey, VerifyError> {
        match &self.key_source {
            KeySource::Pem(key) => Ok(key.verifying_key.clone()),
            KeySource::Jwks(jwks_json) => {
                let key = select_jwk(jwks_json, &header.kid)?;
                Ok(key.verifying_key)
            }
        }
    }
}

/// The path as given, plus the single trailing-slash flip: `/p` <-> `/p/`.
fn path_variants(path: &str) -> Vec<String> {
    let mut variants = vec![path.to_string()];
    if let Some(stripped) = path.strip_suffix('/') {
        if !stripped.is_empty() {
            variants.push(stripped.to_string());
        }
    } else {
        variants.push(format!("{path}/"));
    }
    variants
}
