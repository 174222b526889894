//! Records live exchanges into a HAR file.

use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use http::header::CONTENT_TYPE;

use super::format::{
    Content, Creator, Entry, HarFile, Log, NameValue, PostData, Request as HarRequest,
    Response as HarResponse,
};
use crate::error::ReplayError;
use crate::message::{version_label, Headers, Request, Response};

/// Collects exchanges and writes them as a HAR 1.2 file.
#[derive(Debug)]
pub struct HarRecorder {
    path: PathBuf,
    creator: Creator,
    entries: Vec<Entry>,
}

impl HarRecorder {
    /// Create a new recorder that will write to the given path.
    pub fn new(path: impl Into<PathBuf>, creator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            creator: Creator { name: creator.into(), version: env!("CARGO_PKG_VERSION").to_string() },
            entries: Vec::new(),
        }
    }

    /// Record one exchange. The request body must already be buffered; a
    /// streaming body is recorded as empty.
    pub fn record(
        &mut self,
        request: &Request,
        response: &Response,
        started: DateTime<Utc>,
        elapsed: Duration,
    ) {
        let request_body = request.body.as_bytes().unwrap_or_default();
        let post_data = (!request_body.is_empty()).then(|| {
            let (text, encoding) = match std::str::from_utf8(request_body) {
                Ok(text) => (text.to_string(), None),
                Err(_) => (STANDARD.encode(request_body), Some("base64".to_string())),
            };
            PostData { mime_type: header_text(&request.headers, CONTENT_TYPE.as_str()), text, encoding }
        });

        let entry = Entry {
            started_date_time: Some(started.fixed_offset()),
            time: elapsed.as_secs_f64() * 1000.0,
            request: HarRequest {
                method: request.method.to_string(),
                url: request.uri.to_string(),
                http_version: version_label(request.version).to_string(),
                headers: name_values(&request.headers),
                query_string: query_pairs(request.uri.query()),
                post_data,
                headers_size: -1,
                body_size: len_i64(request_body.len()),
            },
            response: HarResponse {
                status: response.status.as_u16(),
                status_text: response.status_text.clone(),
                http_version: version_label(response.version).to_string(),
                headers: name_values(&response.headers),
                content: Content {
                    size: len_i64(response.body.len()),
                    mime_type: header_text(&response.headers, CONTENT_TYPE.as_str()),
                    text: Some(STANDARD.encode(&response.body)),
                    encoding: Some("base64".to_string()),
                },
                redirect_url: header_text(&response.headers, "location"),
                headers_size: -1,
                body_size: len_i64(response.body.len()),
            },
            timings: None,
            server_ip_address: None,
            comment: None,
        };
        self.entries.push(entry);
    }

    /// Count the exchanges recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Report whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finish recording and write the HAR file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn finish(self) -> Result<PathBuf, ReplayError> {
        let har = HarFile {
            log: Log { version: "1.2".to_string(), creator: self.creator, entries: self.entries },
        };
        let json = serde_json::to_string_pretty(&har)
            .map_err(|source| ReplayError::Parse { path: self.path.clone(), source })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| ReplayError::Io { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(&self.path, json)
            .map_err(|source| ReplayError::Io { path: self.path.clone(), source })?;
        tracing::info!(path = %self.path.display(), entries = har.log.entries.len(), "wrote HAR recording");
        Ok(self.path)
    }
}

/// HAR holds header values as strings, so a value that is not UTF-8 is
/// stored lossily and will not match on replay.
fn name_values(headers: &Headers) -> Vec<NameValue> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = match std::str::from_utf8(value.as_bytes()) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    tracing::warn!(header = %name, "header value is not UTF-8, recording it lossily");
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                }
            };
            NameValue { name: name.to_string(), value }
        })
        .collect()
}

fn header_text(headers: &Headers, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}

fn query_pairs(query: Option<&str>) -> Vec<NameValue> {
    query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            NameValue { name: name.to_string(), value: value.to_string() }
        })
        .collect()
}

fn len_i64(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}
