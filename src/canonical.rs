//! Deterministic assembly of the bytes fed to the signer/verifier.
//!
//! The layout is fixed (see the crate-level docs): a request line, one line
//! per signed header in signer-supplied order, then the raw body. No part of
//! it is configurable beyond the inputs, and nothing here is aware of JWS.

use crate::error::PathError;

/// Validate a request path: must start with `/` and must not look like a
/// full URL (no `://`).
pub(crate) fn validate_path(path: &str) -> Result<(), PathError> {
    if !path.starts_with('/') {
        return Err(PathError::MissingLeadingSlash(path.to_string()));
    }
    if path.contains("://") {
        return Err(PathError::ContainsAuthority(path.to_string()));
    }
    Ok(())
}

/// Assemble the canonical request bytes.
///
/// `method` is used verbatim — callers are expected to have uppercased it
/// already (the signer and verifier both do this before calling in). `path`
/// is validated here. `headers` is emitted in the order given, one `name:
/// SP value` line per entry, with no normalization of names or values.
pub(crate) fn canonicalize<N, V>(
    method: &str, path: &str, headers: &[(N, V)], body: &[u8],
) -> Result<Vec<u8>, PathError>
where
    N: AsRef<str>,
    V: AsRef<[u8]>,
{
    validate_path(path)?;

    let mut buf = Vec::with_capacity(method.len() + path.len() + 2 + body.len());
    buf.extend_from_slice(method.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(path.as_bytes());
    buf.push(b'\n');

    for (name, value) in headers {
        buf.extend_from_slice(name.as_ref().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_ref());
        buf.push(b'\n');
    }

    buf.extend_from_slice(body);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_and_body_with_no_headers() {
        let headers: &[(&str, &[u8])] = &[];
        let bytes = canonicalize("POST", "/things", headers, b"body").unwrap();
        assert_eq!(bytes, b"POST /things\nbody");
    }

    #[test]
    fn header_lines_precede_body_in_order() {
        let headers: &[(&str, &[u8])] =
            &[("Idempotency-Key", b"idemp-1" as &[u8]), ("X-Foo", b"bar")];
        let bytes = canonicalize("GET", "/x", headers, b"{}").unwrap();
        assert_eq!(bytes, b"GET /x\nIdempotency-Key: idemp-1\nX-Foo: bar\n{}");
    }

    #[test]
    fn empty_body_is_allowed() {
        let headers: &[(&str, &[u8])] = &[];
        let bytes = canonicalize("DELETE", "/x", headers, b"").unwrap();
        assert_eq!(bytes, b"DELETE /x\n");
    }

    #[test]
    fn path_must_start_with_slash() {
        let headers: &[(&str, &[u8])] = &[];
        let err = canonicalize("GET", "things", headers, b"").unwrap_err();
        assert!(matches!(err, PathError::MissingLeadingSlash(_)));
    }

    #[test]
    fn path_must_not_contain_authority() {
        let headers: &[(&str, &[u8])] = &[];
        let err = canonicalize("GET", "https://host/things", headers, b"").unwrap_err();
        assert!(matches!(err, PathError::ContainsAuthority(_)));
    }

    #[test]
    fn header_values_are_not_normalized() {
        let headers: &[(&str, &[u8])] = &[("X-Raw", b"  spaced\tvalue" as &[u8])];
        let bytes = canonicalize("GET", "/x", headers, b"").unwrap();
        assert_eq!(bytes, b"GET /x\nX-Raw:   spaced\tvalue\n");
    }
}
