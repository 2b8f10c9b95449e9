//! EC key material: PEM loading and JWKS `kid` selection.
//!
//! Only curve P-521 is supported — this crate exists to implement ES512 and
//! nothing else. Parsing is provided by the `p521`/`pkcs8` crates; this
//! module is a thin, curve-pinned wrapper plus the JWKS lookup logic.

use anyhow::{anyhow, Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use p521::ecdsa::{SigningKey, VerifyingKey};
use p521::elliptic_curve::sec1::{DecodeEcPrivateKey, ToEncodedPoint};
use p521::pkcs8::{DecodePrivateKey, DecodePublicKey};
use p521::{PublicKey, SecretKey};
use serde::Deserialize;

use crate::error::VerifyError;

const ALG_ES512: &str = "ES512";
const CRV_P521: &str = "P-521";
const FIELD_BYTES: usize = 66;

/// A P-521 private signing key, loaded from PEM.
#[derive(Clone)]
pub struct PrivateKey {
    pub(crate) signing_key: SigningKey,
}

impl PrivateKey {
    /// Public key paired with this private key, for callers who need to
    /// publish or log it.
    #[must_use]
    pub fn public_key(&self) -> PublicKeyHandle {
        PublicKeyHandle { verifying_key: self.signing_key.verifying_key().to_owned() }
    }
}

/// A P-521 public verifying key, loaded from PEM or a JWKS entry.
#[derive(Clone)]
pub struct PublicKeyHandle {
    pub(crate) verifying_key: VerifyingKey,
}

/// Parse a PEM-encoded EC private key (PKCS#8 or SEC1) constrained to
/// curve P-521.
///
/// # Errors
/// Returns an error (mapped by the caller to [`crate::error::SignError::InvalidKey`]
/// or [`crate::error::VerifyError::InvalidKey`]) if the PEM cannot be parsed
/// as a P-521 private key in either container format.
pub fn load_private_ec_pem(pem: &[u8]) -> Result<PrivateKey> {
    let pem_str = std::str::from_utf8(pem).context("PEM is not valid UTF-8")?;

    let secret_key = SecretKey::from_pkcs8_pem(pem_str)
        .or_else(|_| SecretKey::from_sec1_pem(pem_str))
        .map_err(|e| anyhow!("failed to parse EC private key: {e}"))?;

    Ok(PrivateKey { signing_key: SigningKey::from(secret_key) })
}

/// Parse a PEM-encoded EC public key (SPKI) constrained to curve P-521.
///
/// # Errors
/// Returns an error (mapped by the caller to [`crate::error::SignError::InvalidKey`]
/// or [`crate::error::VerifyError::InvalidKey`]) if the PEM cannot be parsed
/// as a P-521 SPKI public key.
pub fn load_public_ec_pem(pem: &[u8]) -> Result<PublicKeyHandle> {
    let pem_str = std::str::from_utf8(pem).context("PEM is not valid UTF-8")?;

    let public_key = PublicKey::from_public_key_pem(pem_str)
        .map_err(|e| anyhow!("failed to parse EC public key: {e}"))?;

    Ok(PublicKeyHandle { verifying_key: VerifyingKey::from(public_key) })
}

/// A single entry of a JSON Web Key Set document.
#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Parse a JWKS document and return the public key whose `kid` matches.
///
/// Only entries with `kty == "EC"` and `crv == "P-521"` are looked up by
/// `kid`; the matching entry must also declare `alg == "ES512"` (required,
/// not merely checked when present) or selection fails.
///
/// # Errors
/// Returns [`VerifyError::InvalidKey`] if the document is malformed, no
/// entry matches `kid`, or the matching entry's key material is invalid.
pub fn select_jwk(jwks_json: &[u8], kid: &str) -> Result<PublicKeyHandle, VerifyError> {
    let jwks: JwkSet = serde_json::from_slice(jwks_json)
        .map_err(|e| VerifyError::InvalidKey(format!("invalid JWKS document: {e}")))?;

    let entry = jwks
        .keys
        .iter()
        .find(|k| k.kid == kid && k.kty == "EC" && k.crv.as_deref() == Some(CRV_P521))
        .ok_or_else(|| VerifyError::InvalidKey(format!("no P-521 ES512 key found for kid {kid:?}")))?;

    match entry.alg.as_deref() {
        Some(ALG_ES512) => {}
        Some(alg) => {
            return Err(VerifyError::InvalidKey(format!(
                "key {kid:?} declares alg {alg:?}, expected {ALG_ES512}"
            )))
        }
        None => {
            return Err(VerifyError::InvalidKey(format!(
                "key {kid:?} is missing required field 'alg'"
            )))
        }
    }

    let x = entry
        .x
        .as_deref()
        .ok_or_else(|| VerifyError::InvalidKey(format!("key {kid:?} is missing 'x'")))?;
    let y = entry
        .y
        .as_deref()
        .ok_or_else(|| VerifyError::InvalidKey(format!("key {kid:?} is missing 'y'")))?;

    let x_bytes = Base64UrlUnpadded::decode_vec(x)
        .map_err(|e| VerifyError::InvalidKey(format!("key {kid:?} has invalid 'x': {e}")))?;
    let y_bytes = Base64UrlUnpadded::decode_vec(y)
        .map_err(|e| VerifyError::InvalidKey(format!("key {kid:?} has invalid 'y': {e}")))?;

    // Build the SEC1 uncompressed point: 0x04 || x || y, each left-padded
    // to the P-521 field size.
    let mut point = Vec::with_capacity(1 + 2 * FIELD_BYTES);
    point.push(0x04);
    push_padded(&mut point, &x_bytes);
    push_padded(&mut point, &y_bytes);

    let verifying_key = VerifyingKey::from_sec1_bytes(&point)
        .map_err(|e| VerifyError::InvalidKey(format!("key {kid:?} is not a valid P-521 point: {e}")))?;

    Ok(PublicKeyHandle { verifying_key })
}

fn push_padded(out: &mut Vec<u8>, coord: &[u8]) {
    if coord.len() < FIELD_BYTES {
        out.extend(std::iter::repeat(0u8).take(FIELD_BYTES - coord.len()));
    }
    out.extend_from_slice(coord);
}

/// Serialize a public key's coordinates as a bare `(x, y)` JWK-shaped pair,
/// for callers building their own JWKS document. Not used internally; kept
/// because `select_jwk`'s counterpart is otherwise one-directional.
#[must_use]
pub fn encode_jwk_coordinates(key: &PublicKeyHandle) -> (String, String) {
    let point = key.verifying_key.to_encoded_point(false);
    let x = Base64UrlUnpadded::encode_string(point.x().expect("uncompressed point has x"));
    let y = Base64UrlUnpadded::encode_string(point.y().expect("uncompressed point has y"));
    (x, y)
}
