//! Fingerprints: SHA-256 over a request's canonical form.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::canonical;
use crate::error::ReplayError;
use crate::filter::FilterChain;
use crate::message::Request;

/// Hex-encoded SHA-256 of a canonical request. Collisions are a correctness bug,
/// not a security one; the hash is only used as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes canonical request bytes.
    #[must_use]
    pub fn of_bytes(canonical: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(canonical)))
    }

    /// The 64-character hex key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fingerprints a request after running `filters` over a clone of it.
///
/// # Errors
///
/// Returns [`ReplayError::Body`] when the request body cannot be read.
pub fn fingerprint(request: &mut Request, filters: &FilterChain) -> Result<Fingerprint, ReplayError> {
    let canonical = canonical::render(request, filters)?;
    Ok(Fingerprint::of_bytes(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DeleteHeader;
    use crate::message::Body;
    use http::header::{HeaderName, HeaderValue};
    use http::Method;
    use proptest::prelude::*;
    use std::io::Cursor;

    const BASELINE: &str = "e6694112daee57b08deb7a624a8ea1e5463c8049e44231cc732f5089d332f223";
    const WITH_TEST_HEADER: &str =
        "3a3b077608696f530f804db39c5b545f175f7cc9706184b6e3d64a4cbc943cd0";

    fn new_test_request() -> Request {
        Request::new(Method::POST, "https://www.example.com/example/path".parse().unwrap())
            .with_body(Body::from_reader(Cursor::new(Vec::new())))
    }

    #[test]
    fn hashes_request() {
        let mut request = new_test_request();
        let key = fingerprint(&mut request, &FilterChain::new()).unwrap();
        assert_eq!(key.as_str(), BASELINE);
        assert_eq!(key.short(), &BASELINE[..12]);
    }

    #[test]
    fn additional_header_changes_hash_and_redaction_restores_it() {
        let mut request = new_test_request();
        request.headers.append(
            HeaderName::from_static("x-test-header"),
            HeaderValue::from_static("test header value"),
        );

        let key = fingerprint(&mut request, &FilterChain::new()).unwrap();
        assert_eq!(key.as_str(), WITH_TEST_HEADER);

        let redact = FilterChain::new().with(|r: &mut Request| {
            r.headers.remove("X-Test-Header");
        });
        let key = fingerprint(&mut request, &redact).unwrap();
        assert_eq!(key.as_str(), BASELINE);
    }

    #[test]
    fn fingerprinting_leaves_body_readable() {
        let mut request = new_test_request().with_body(Body::from_reader(Cursor::new(
            br#"{"name":"test"}"#.to_vec(),
        )));

        let first = fingerprint(&mut request, &FilterChain::new()).unwrap();
        let second = fingerprint(&mut request, &FilterChain::new()).unwrap();
        assert_eq!(first, second);

        let body = std::mem::take(&mut request.body).into_bytes().unwrap();
        assert_eq!(body.as_ref(), br#"{"name":"test"}"#);
    }

    proptest! {
        #[test]
        fn fingerprint_is_deterministic(
            path in "/[a-z0-9/]{0,24}",
            value in "[a-zA-Z0-9 ]{0,32}",
            body in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let build = || {
                Request::new(Method::PUT, format!("https://example.com{path}").parse().unwrap())
                    .with_header(HeaderName::from_static("x-value"), HeaderValue::from_str(&value).unwrap())
                    .with_body(body.clone())
            };
            let a = fingerprint(&mut build(), &FilterChain::new()).unwrap();
            let b = fingerprint(&mut build(), &FilterChain::new()).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn deleting_a_header_matches_never_having_it(
            before in proptest::collection::vec("[a-z]{1,8}", 0..4),
            after in proptest::collection::vec("[a-z]{1,8}", 0..4),
            secret in "[a-zA-Z0-9]{1,16}",
        ) {
            let base = |with_secret: bool| {
                let mut request = Request::new(Method::GET, "https://example.com/items".parse().unwrap());
                for (i, v) in before.iter().enumerate() {
                    let name = HeaderName::try_from(format!("x-before-{i}")).unwrap();
                    request.headers.append(name, HeaderValue::from_str(v).unwrap());
                }
                if with_secret {
                    request.headers.append(
                        HeaderName::from_static("authorization"),
                        HeaderValue::from_str(&secret).unwrap(),
                    );
                }
                for (i, v) in after.iter().enumerate() {
                    let name = HeaderName::try_from(format!("x-after-{i}")).unwrap();
                    request.headers.append(name, HeaderValue::from_str(v).unwrap());
                }
                request
            };

            let redact = FilterChain::new().with(DeleteHeader(HeaderName::from_static("authorization")));
            let redacted = fingerprint(&mut base(true), &redact).unwrap();
            let never_had = fingerprint(&mut base(false), &FilterChain::new()).unwrap();
            prop_assert_eq!(redacted, never_had);
        }
    }
}
