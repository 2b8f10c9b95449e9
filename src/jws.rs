//! Detached compact JWS encode/decode.
//!
//! The wire form is three base64url segments joined by `.`, with the middle
//! (payload) segment always empty: `HEADER..SIGNATURE`. This module only
//! concerns itself with that shape and the protected header fields; it knows
//! nothing about canonicalization, keys, or the ES512 algorithm itself.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

pub(crate) const ALG_ES512: &str = "ES512";
pub(crate) const TL_VERSION: &str = "2";

/// The JWS protected header used by this crate.
///
/// Serializes with fields in the order declared here — `alg`, `kid`,
/// `tl_version`, `tl_headers`, then `jku` if present — which is the byte
/// order the signer emits and the only order this crate ever produces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectedHeader {
    /// Always `"ES512"` on signatures produced by this crate; decoded
    /// verbatim from the wire on parse, so a verifier can reject any other
    /// value explicitly rather than have `serde` reject it silently.
    pub alg: String,

    /// Opaque key identifier.
    pub kid: String,

    /// Format version discriminator. Only `"2"` is accepted by this crate's
    /// verifier; anything else (including absence, which deserializes as an
    /// empty string via `#[serde(default)]`) is the legacy v1 form.
    #[serde(default)]
    pub tl_version: String,

    /// Comma-separated header names, in signing order, case as written by
    /// the signer. Empty string if no headers were signed.
    #[serde(default)]
    pub tl_headers: String,

    /// Informational JWKS URL. Never fetched by this crate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub jku: Option<String>,
}

impl ProtectedHeader {
    /// The header names from `tl_headers`, in signing order, with the exact
    /// case the signer used. Empty if no headers were signed.
    pub(crate) fn signed_header_names(&self) -> Vec<&str> {
        if self.tl_headers.is_empty() {
            Vec::new()
        } else {
            self.tl_headers.split(',').collect()
        }
    }
}

/// A parsed detached JWS: the protected header, its base64url-encoded form
/// (reused verbatim as the first segment of the signing input), and the
/// decoded signature bytes.
pub(crate) struct DecodedJws {
    pub(crate) header: ProtectedHeader,
    pub(crate) header_b64: String,
    pub(crate) signature: Vec<u8>,
}

/// Encode a protected header and signature as a detached compact JWS.
pub(crate) fn encode(header: &ProtectedHeader, signature: &[u8]) -> Result<String, String> {
    let header_b64 = encode_header(header)?;
    let signature_b64 = Base64UrlUnpadded::encode_string(signature);
    Ok(format!("{header_b64}..{signature_b64}"))
}

/// Base64url-encode the protected header alone — the first segment of both
/// the wire form and the signing input.
pub(crate) fn encode_header(header: &ProtectedHeader) -> Result<String, String> {
    let header_json =
        serde_json::to_vec(header).map_err(|e| format!("failed to serialize header: {e}"))?;
    Ok(Base64UrlUnpadded::encode_string(&header_json))
}

/// Parse a detached compact JWS into its structural parts.
///
/// Enforces exactly three `.`-separated segments with an empty middle
/// segment, and that the header segment decodes to valid base64url JSON.
/// Does not check `alg`/`tl_version` — that is verification policy, applied
/// by the caller.
pub(crate) fn decode(jws: &str) -> Result<DecodedJws, VerifyError> {
    let parts: Vec<&str> = jws.split('.').collect();
    if parts.len() != 3 {
        return Err(VerifyError::Jws(format!(
            "malformed compact JWS: expected 3 segments, found {}",
            parts.len()
        )));
    }
    if !parts[1].is_empty() {
        return Err(VerifyError::Jws(
            "expected a detached JWS with an empty payload segment".to_string(),
        ));
    }

    let header_bytes = Base64UrlUnpadded::decode_vec(parts[0])
        .map_err(|e| VerifyError::Jws(format!("invalid header encoding: {e}")))?;
    let header: ProtectedHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| VerifyError::Jws(format!("invalid header JSON: {e}")))?;
    let signature = Base64UrlUnpadded::decode_vec(parts[2])
        .map_err(|e| VerifyError::Jws(format!("invalid signature encoding: {e}")))?;

    Ok(DecodedJws { header, header_b64: parts[0].to_string(), signature })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> ProtectedHeader {
        ProtectedHeader {
            alg: ALG_ES512.to_string(),
            kid: "key-1".to_string(),
            tl_version: TL_VERSION.to_string(),
            tl_headers: "X-Foo,X-Bar".to_string(),
            jku: Some("https://example.com/.well-known/jwks".to_string()),
        }
    }

    #[test]
    fn encode_then_decode_preserves_header_fields() {
        let header = sample_header();
        let jws = encode(&header, &[1, 2, 3, 4]).unwrap();
        let decoded = decode(&jws).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.signature, vec![1, 2, 3, 4]);
    }

    #[test]
    fn middle_segment_is_always_empty() {
        let jws = encode(&sample_header(), &[0]).unwrap();
        let parts: Vec<&str> = jws.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].is_empty());
    }

    #[test]
    fn header_field_order_is_stable() {
        let header_b64 = encode_header(&sample_header()).unwrap();
        let header_json = Base64UrlUnpadded::decode_vec(&header_b64).unwrap();
        let header_str = String::from_utf8(header_json).unwrap();
        let alg_pos = header_str.find("\"alg\"").unwrap();
        let kid_pos = header_str.find("\"kid\"").unwrap();
        let version_pos = header_str.find("\"tl_version\"").unwrap();
        let headers_pos = header_str.find("\"tl_headers\"").unwrap();
        let jku_pos = header_str.find("\"jku\"").unwrap();
        assert!(alg_pos < kid_pos);
        assert!(kid_pos < version_pos);
        assert!(version_pos < headers_pos);
        assert!(headers_pos < jku_pos);
    }

    #[test]
    fn non_three_segment_strings_are_rejected() {
        let jws = encode(&sample_header(), &[1]).unwrap();
        let with_trailing_dot = format!("{jws}.");
        assert!(decode(&with_trailing_dot).is_err());

        let two_segments = "onlyone.two";
        assert!(decode(two_segments).is_err());
    }

    #[test]
    fn non_empty_middle_segment_is_rejected() {
        let header_b64 = encode_header(&sample_header()).unwrap();
        let sig_b64 = Base64UrlUnpadded::encode_string(&[1, 2, 3]);
        let attached = format!("{header_b64}.{}.{sig_b64}", Base64UrlUnpadded::encode_string(b"payload"));
        assert!(decode(&attached).is_err());
    }

    #[test]
    fn missing_tl_version_decodes_as_empty_not_an_error() {
        let json = r#"{"alg":"ES512","kid":"k"}"#;
        let header_b64 = Base64UrlUnpadded::encode_string(json.as_bytes());
        let sig_b64 = Base64UrlUnpadded::encode_string(&[1]);
        let jws = format!("{header_b64}..{sig_b64}");
        let decoded = decode(&jws).unwrap();
        assert_eq!(decoded.header.tl_version, "");
        assert_eq!(decoded.header.tl_headers, "");
    }
}
