//! HAR 1.2 data structures for recorded HTTP traffic.
//!
//! Only the fields the replay engine reads or the recorder writes are modeled;
//! anything else in a HAR file (vendor `_` fields, cookies, cache info) is ignored.

use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Top-level HAR document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarFile {
    /// The log holding every entry.
    pub log: Log,
}

/// The HAR log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Log {
    /// HAR format version, usually `"1.2"`.
    #[serde(default)]
    pub version: String,
    /// Tool that produced the file.
    #[serde(default)]
    pub creator: Creator,
    /// Recorded exchanges in capture order.
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// Producer of a HAR file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: String,
}

/// One request/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// When the request started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_date_time: Option<DateTime<FixedOffset>>,
    /// Total elapsed time in milliseconds.
    #[serde(default)]
    pub time: f64,
    /// The request.
    pub request: Request,
    /// The response.
    pub response: Response,
    /// Phase timings, when the producer recorded them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
    /// Server IP address.
    #[serde(default, rename = "serverIPAddress", skip_serializing_if = "Option::is_none")]
    pub server_ip_address: Option<String>,
    /// Free-form comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Phase timings in milliseconds; `-1` means not applicable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Timings {
    /// Waiting for a network connection.
    #[serde(default)]
    pub blocked: f64,
    /// DNS resolution.
    #[serde(default)]
    pub dns: f64,
    /// TCP connect.
    #[serde(default)]
    pub connect: f64,
    /// TLS handshake.
    #[serde(default)]
    pub ssl: f64,
    /// Sending the request.
    #[serde(default)]
    pub send: f64,
    /// Waiting for the first byte.
    #[serde(default)]
    pub wait: f64,
    /// Reading the response.
    #[serde(default)]
    pub receive: f64,
}

/// A name/value pair, used for headers and query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameValue {
    /// Name as recorded.
    pub name: String,
    /// Value as recorded.
    pub value: String,
}

/// Recorded request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request method.
    pub method: String,
    /// Absolute URL including the query string.
    pub url: String,
    /// Protocol version, e.g. `"HTTP/1.1"`.
    #[serde(default)]
    pub http_version: String,
    /// Headers in recorded order.
    #[serde(default)]
    pub headers: Vec<NameValue>,
    /// Query parameters (redundant with `url`).
    #[serde(default)]
    pub query_string: Vec<NameValue>,
    /// Request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostData>,
    /// Header block size in bytes, `-1` if unknown.
    #[serde(default = "unknown_size")]
    pub headers_size: i64,
    /// Body size in bytes, `-1` if unknown.
    #[serde(default = "unknown_size")]
    pub body_size: i64,
}

/// Recorded request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    /// Content type of the body.
    #[serde(default)]
    pub mime_type: String,
    /// Body text, encoded as `encoding` says.
    #[serde(default)]
    pub text: String,
    /// `"base64"` for a body that is not valid UTF-8, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Recorded response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    #[serde(default)]
    pub status_text: String,
    /// Protocol version.
    #[serde(default)]
    pub http_version: String,
    /// Headers in recorded order.
    #[serde(default)]
    pub headers: Vec<NameValue>,
    /// Response body.
    #[serde(default)]
    pub content: Content,
    /// Redirect target from the `Location` header, if any.
    #[serde(default, rename = "redirectURL")]
    pub redirect_url: String,
    /// Header block size in bytes, `-1` if unknown.
    #[serde(default = "unknown_size")]
    pub headers_size: i64,
    /// Body size in bytes, `-1` if unknown.
    #[serde(default = "unknown_size")]
    pub body_size: i64,
}

/// Recorded response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Decoded body length in bytes.
    #[serde(default)]
    pub size: i64,
    /// Content type of the body.
    #[serde(default)]
    pub mime_type: String,
    /// Body text, encoded per `encoding`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `"base64"` for binary-safe bodies; absent for plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

fn unknown_size() -> i64 {
    -1
}

/// Reads and decodes a HAR file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a HAR document.
pub fn load_har(path: &Path) -> Result<HarFile, ReplayError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ReplayError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content)
        .map_err(|source| ReplayError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_ENTRY: &str = r#"{
      "log": {
        "version": "1.2",
        "creator": {"name": "Proxyman", "version": "3.1.0"},
        "entries": [{
          "startedDateTime": "2022-01-16T13:15:41.123-07:00",
          "time": 212.5,
          "_isHTTPS": true,
          "request": {
            "method": "GET",
            "url": "https://postman-echo.com/get?foo1=bar1&foo2=bar2",
            "httpVersion": "HTTP/1.1",
            "headers": [
              {"name": "Host", "value": "postman-echo.com"},
              {"name": "Accept", "value": "*/*"},
              {"name": "User-Agent", "value": "curl/7.77.0"}
            ],
            "queryString": [
              {"name": "foo1", "value": "bar1"},
              {"name": "foo2", "value": "bar2"}
            ],
            "cookies": [],
            "headersSize": 120,
            "bodySize": 0
          },
          "response": {
            "status": 200,
            "statusText": "OK",
            "httpVersion": "HTTP/1.1",
            "headers": [
              {"name": "Date", "value": "Sun, 16 Jan 2022 20:14:59 GMT"},
              {"name": "Content-Type", "value": "application/json; charset=utf-8"}
            ],
            "content": {
              "size": 2,
              "mimeType": "application/json; charset=utf-8",
              "text": "e30=",
              "encoding": "base64"
            },
            "redirectURL": ""
          },
          "timings": {"connect": 10, "send": 1, "dns": 2, "ssl": 8, "wait": 180, "blocked": 0, "receive": 3}
        }]
      }
    }"#;

    #[test]
    fn decodes_har_entry() {
        let har: HarFile = serde_json::from_str(GET_ENTRY).unwrap();
        assert_eq!(har.log.version, "1.2");
        assert_eq!(har.log.creator.name, "Proxyman");

        let entry = &har.log.entries[0];
        assert_eq!(entry.request.method, "GET");
        assert_eq!(entry.request.headers.len(), 3);
        assert_eq!(entry.request.headers[0].name, "Host");
        assert_eq!(entry.request.query_string[0].value, "bar1");
        assert!(entry.request.post_data.is_none());

        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.content.encoding.as_deref(), Some("base64"));
        assert_eq!(entry.response.content.size, 2);
        assert_eq!(entry.timings.unwrap().wait, 180.0);
        assert!(entry.started_date_time.is_some());
    }

    #[test]
    fn load_reports_path_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.har");
        std::fs::write(&path, "{\"log\": 42}").unwrap();

        let err = load_har(&path).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { .. }));
        assert!(err.to_string().contains("broken.har"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_har(Path::new("/nonexistent/recording.har")).unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }
}
