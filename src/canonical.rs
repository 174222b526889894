//! Canonical wire form of a request, the input to fingerprinting.
//!
//! ```text
//! POST /v1/resource/new HTTP/1.1\r\n
//! host: example.com\r\n
//! content-type: application/json\r\n
//! content-length: 15\r\n
//! \r\n
//! {"name":"test"}
//! ```
//!
//! The request line uses the path and query, `host` comes from the URI
//! authority, and `content-length` is derived from the body. Every other header
//! is written in its current order with no sorting.

use http::header::{HeaderValue, CONTENT_LENGTH, HOST};
use http::uri::PathAndQuery;

use crate::error::ReplayError;
use crate::filter::FilterChain;
use crate::message::{version_label, Request};

/// Clones a request along with an independent copy of its body.
///
/// A streaming body is read into memory and the original is left holding the
/// buffered bytes, so both requests can be read afterwards. If reading fails
/// the original keeps everything it had.
///
/// # Errors
///
/// Returns [`ReplayError::Body`] when the body cannot be read.
pub fn clone_with_body(request: &mut Request) -> Result<Request, ReplayError> {
    let body = request.body.buffer().map_err(ReplayError::Body)?;
    Ok(Request {
        method: request.method.clone(),
        uri: request.uri.clone(),
        version: request.version,
        headers: request.headers.clone(),
        body: body.into(),
    })
}

/// Renders the canonical form of `request` after running `filters` over a clone.
///
/// The original request is not filtered; only its body may change from a
/// stream into buffered bytes.
///
/// # Errors
///
/// Returns [`ReplayError::Body`] when the body (original, or one installed by a
/// filter) cannot be read.
pub fn render(request: &mut Request, filters: &FilterChain) -> Result<Vec<u8>, ReplayError> {
    let mut clone = clone_with_body(request)?;
    filters.apply(&mut clone);
    let body = clone.body.buffer().map_err(ReplayError::Body)?;
    Ok(write_wire(&clone, &body))
}

/// Human-readable form of canonical bytes, with `\r\n` shown as plain newlines.
#[must_use]
pub fn to_display(canonical: &[u8]) -> String {
    String::from_utf8_lossy(canonical).replace("\r\n", "\n")
}

fn write_wire(request: &Request, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + body.len());

    let target = request.uri.path_and_query().map_or("/", PathAndQuery::as_str);
    let target = if target.is_empty() { "/" } else { target };
    push_line(
        &mut out,
        &[
            request.method.as_str().as_bytes(),
            b" ",
            target.as_bytes(),
            b" ",
            version_label(request.version).as_bytes(),
        ],
    );

    let host = request
        .uri
        .authority()
        .map(|authority| authority.as_str().as_bytes())
        .or_else(|| request.headers.get(HOST.as_str()).map(HeaderValue::as_bytes));
    if let Some(host) = host {
        push_line(&mut out, &[b"host: ", host]);
    }

    for (name, value) in request.headers.iter() {
        if *name == HOST || *name == CONTENT_LENGTH {
            continue;
        }
        push_line(&mut out, &[name.as_str().as_bytes(), b": ", value.as_bytes()]);
    }

    if !body.is_empty() {
        push_line(&mut out, &[b"content-length: ", body.len().to_string().as_bytes()]);
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

fn push_line(out: &mut Vec<u8>, pieces: &[&[u8]]) {
    for piece in pieces {
        out.extend_from_slice(piece);
    }
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DeleteHeader;
    use crate::message::Body;
    use http::header::HeaderName;
    use http::{Method, Version};
    use std::io::{Cursor, Read};

    fn post(body: impl Into<Body>) -> Request {
        Request::new(Method::POST, "https://example.com/v1/resource/new?dry=1".parse().unwrap())
            .with_header(HeaderName::from_static("content-type"), HeaderValue::from_static("application/json"))
            .with_header(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"))
            .with_body(body)
    }

    #[test]
    fn renders_request_line_headers_and_body() {
        let mut request = post(r#"{"name":"test"}"#);
        let canonical = render(&mut request, &FilterChain::new()).unwrap();
        assert_eq!(
            to_display(&canonical),
            "POST /v1/resource/new?dry=1 HTTP/1.1\n\
             host: example.com\n\
             content-type: application/json\n\
             accept: */*\n\
             content-length: 15\n\
             \n\
             {\"name\":\"test\"}"
        );
    }

    #[test]
    fn explicit_host_and_content_length_headers_do_not_change_the_form() {
        let mut plain = post("abc");
        let mut explicit = post("abc")
            .with_header(HOST, HeaderValue::from_static("example.com"))
            .with_header(CONTENT_LENGTH, HeaderValue::from_static("3"));

        let filters = FilterChain::new();
        assert_eq!(render(&mut plain, &filters).unwrap(), render(&mut explicit, &filters).unwrap());
    }

    #[test]
    fn header_order_is_significant() {
        let mut reordered = Request::new(Method::POST, "https://example.com/v1/resource/new?dry=1".parse().unwrap())
            .with_header(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"))
            .with_header(HeaderName::from_static("content-type"), HeaderValue::from_static("application/json"))
            .with_body("abc");

        let filters = FilterChain::new();
        assert_ne!(render(&mut post("abc"), &filters).unwrap(), render(&mut reordered, &filters).unwrap());
    }

    #[test]
    fn version_is_part_of_the_form() {
        let filters = FilterChain::new();
        let h1 = render(&mut post("abc"), &filters).unwrap();
        let h2 = render(&mut post("abc").with_version(Version::HTTP_2), &filters).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn filters_touch_only_the_clone() {
        let mut request = post("abc");
        let filters = FilterChain::new().with(DeleteHeader(HeaderName::from_static("accept")));

        let canonical = to_display(&render(&mut request, &filters).unwrap());
        assert!(!canonical.contains("accept"));
        assert!(request.headers.contains("accept"));
    }

    #[test]
    fn streaming_body_is_still_readable_after_rendering() {
        let mut request = post(Body::from_reader(Cursor::new(b"streamed payload".to_vec())));
        let canonical = render(&mut request, &FilterChain::new()).unwrap();
        assert!(canonical.ends_with(b"streamed payload"));

        let mut rest = Vec::new();
        let body = std::mem::take(&mut request.body);
        let bytes = body.into_bytes().unwrap();
        Cursor::new(bytes).read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"streamed payload");
    }

    #[test]
    fn clone_is_independent_of_original() {
        let mut request = post(Body::from_reader(Cursor::new(b"payload".to_vec())));
        let mut clone = clone_with_body(&mut request).unwrap();
        clone.body = Body::Empty;
        clone.headers.remove("accept");

        assert_eq!(request.body.as_bytes(), Some(&b"payload"[..]));
        assert!(request.headers.contains("accept"));
    }

    #[test]
    fn unreadable_body_fails_rendering() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("socket closed"))
            }
        }

        let mut request = post(Body::from_reader(Broken));
        let err = render(&mut request, &FilterChain::new()).unwrap_err();
        assert!(matches!(err, ReplayError::Body(_)));
    }

    #[test]
    fn uri_without_path_renders_root_target() {
        let mut request = Request::new(Method::GET, "https://example.com".parse().unwrap());
        let canonical = to_display(&render(&mut request, &FilterChain::new()).unwrap());
        assert!(canonical.starts_with("GET / HTTP/1.1\nhost: example.com\n"));
    }
}
