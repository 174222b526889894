//! YAML configuration for a replay transport.
//!
//! ```yaml
//! sources: [fixtures/api.har, fixtures/more]
//! filters:
//!   - kind: delete_header
//!     name: authorization
//! diagnostics: true
//! on_collision: reject
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::cache::CollisionPolicy;
use super::capture::RequestDumper;
use super::source::Source;
use crate::adapters::replaying::{ReplayBuilder, ReplayTransport};
use crate::error::ReplayError;
use crate::filter::{DeleteHeader, FilterChain, RemoveQueryParam, SetHeader, SetVersion};
use crate::message::parse_version;

/// Everything needed to build a [`ReplayTransport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    /// HAR files or directories, loaded in order.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Filters applied before hashing, in order.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// Whether misses carry a diff against every recording.
    #[serde(default)]
    pub diagnostics: bool,
    /// What to do when recordings share a fingerprint.
    #[serde(default)]
    pub on_collision: CollisionPolicy,
    /// One recorded response served for every request instead of matching.
    #[serde(default)]
    pub single_response: Option<SingleResponseSpec>,
    /// Directory that receives every request seen as `<fingerprint>.req`.
    #[serde(default)]
    pub dump_requests: Option<PathBuf>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One filter in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Removes a header.
    DeleteHeader {
        /// Header name, any case.
        name: String,
    },
    /// Replaces a header with a fixed value.
    SetHeader {
        /// Header name, any case.
        name: String,
        /// Value to set.
        value: String,
    },
    /// Removes a query parameter.
    RemoveQueryParam {
        /// Parameter name.
        name: String,
    },
    /// Forces the protocol version.
    SetVersion {
        /// Version label such as `HTTP/1.1`.
        version: String,
    },
}

/// Which recorded response a fixed-response transport serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleResponseSpec {
    /// HAR file or directory holding the response.
    pub source: PathBuf,
    /// Index of the entry, counting across the whole source.
    #[serde(default)]
    pub entry: usize,
}

impl ReplayConfig {
    /// Reads a config file. Relative paths in it resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ReplayError::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_yaml(&text)
            .map_err(|err| ReplayError::config(format!("{}: {err}", path.display())))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parses a config from YAML. Relative paths resolve against the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not describe a valid config.
    pub fn from_yaml(text: &str) -> Result<Self, ReplayError> {
        serde_yaml::from_str(text).map_err(|err| ReplayError::config(err.to_string()))
    }

    /// Resolves a path from the config against its directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// The configured sources, resolved.
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        self.sources.iter().map(|path| Source::path(self.resolve(path))).collect()
    }

    /// Builds the configured filter chain.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid header name or value or an unknown version.
    pub fn filter_chain(&self) -> Result<FilterChain, ReplayError> {
        let mut chain = FilterChain::new();
        for spec in &self.filters {
            match spec {
                FilterSpec::DeleteHeader { name } => chain.push(DeleteHeader(header_name(name)?)),
                FilterSpec::SetHeader { name, value } => chain.push(SetHeader {
                    name: header_name(name)?,
                    value: HeaderValue::from_str(value)
                        .map_err(|e| ReplayError::config(format!("header {name:?} value: {e}")))?,
                }),
                FilterSpec::RemoveQueryParam { name } => chain.push(RemoveQueryParam(name.clone())),
                FilterSpec::SetVersion { version } => chain.push(SetVersion(
                    parse_version(version)
                        .ok_or_else(|| ReplayError::config(format!("unknown HTTP version {version:?}")))?,
                )),
            }
        }
        Ok(chain)
    }

    /// A builder for the matching transport this config describes.
    ///
    /// # Errors
    ///
    /// Returns an error if no sources are configured, a filter is invalid, or
    /// the dump directory cannot be created.
    pub fn builder(&self) -> Result<ReplayBuilder, ReplayError> {
        if self.sources.is_empty() {
            return Err(ReplayError::config("no sources configured"));
        }
        let mut builder = ReplayTransport::builder()
            .filters(&self.filter_chain()?)
            .diagnostics(self.diagnostics)
            .collision_policy(self.on_collision);
        for source in self.sources() {
            builder = builder.source(source);
        }
        if let Some(dir) = &self.dump_requests {
            builder = builder.observer(Arc::new(RequestDumper::new(self.resolve(dir))?));
        }
        Ok(builder)
    }

    /// Builds the configured transport. A `single_response` takes precedence
    /// over `sources`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or a source fails to load.
    pub fn build(&self) -> Result<ReplayTransport, ReplayError> {
        let Some(single) = &self.single_response else {
            return self.builder()?.build();
        };
        if !self.sources.is_empty() {
            tracing::warn!("single_response is set, ignoring configured sources");
        }
        let path = self.resolve(&single.source);
        let interactions = Source::path(&path).load()?;
        let count = interactions.len();
        let interaction = interactions.into_iter().nth(single.entry).ok_or_else(|| {
            ReplayError::config(format!(
                "single_response entry {} out of range, {} has {count} entries",
                single.entry,
                path.display()
            ))
        })?;
        Ok(ReplayTransport::single(interaction.response))
    }
}

fn header_name(name: &str) -> Result<HeaderName, ReplayError> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| ReplayError::config(format!("header name {name:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Request;
    use crate::ports::Transport;
    use http::{Method, StatusCode, Version};

    const HAR: &str = r#"{"log": {"version": "1.2", "entries": [
        {"request": {"method": "GET", "url": "https://example.com/v1/resource?token=abc",
                     "httpVersion": "HTTP/1.1", "headers": []},
         "response": {"status": 200, "statusText": "OK", "httpVersion": "HTTP/1.1", "headers": [],
                      "content": {"size": 2, "mimeType": "application/json", "text": "e30=", "encoding": "base64"}}},
        {"request": {"method": "GET", "url": "https://example.com/v1/other",
                     "httpVersion": "HTTP/1.1", "headers": []},
         "response": {"status": 404, "statusText": "Not Found", "httpVersion": "HTTP/1.1", "headers": [],
                      "content": {"size": 0, "mimeType": ""}}}
    ]}}"#;

    fn write_fixture(dir: &Path) {
        std::fs::create_dir_all(dir.join("fixtures")).unwrap();
        std::fs::write(dir.join("fixtures/api.har"), HAR).unwrap();
    }

    #[test]
    fn parses_every_field() {
        let config = ReplayConfig::from_yaml(
            r"
sources: [fixtures/api.har]
filters:
  - kind: delete_header
    name: Authorization
  - kind: set_header
    name: user-agent
    value: harplay
  - kind: remove_query_param
    name: token
  - kind: set_version
    version: HTTP/1.1
diagnostics: true
on_collision: reject
single_response:
  source: fixtures/api.har
  entry: 1
dump_requests: requests
",
        )
        .unwrap();

        assert_eq!(config.sources, [PathBuf::from("fixtures/api.har")]);
        assert_eq!(config.filters.len(), 4);
        assert_eq!(config.filters[2], FilterSpec::RemoveQueryParam { name: "token".into() });
        assert!(config.diagnostics);
        assert_eq!(config.on_collision, CollisionPolicy::Reject);
        assert_eq!(config.single_response.as_ref().unwrap().entry, 1);
        assert_eq!(config.filter_chain().unwrap().len(), 4);
    }

    #[test]
    fn defaults_and_unknown_fields() {
        let config = ReplayConfig::from_yaml("sources: [a.har]").unwrap();
        assert!(!config.diagnostics);
        assert_eq!(config.on_collision, CollisionPolicy::Warn);

        let err = ReplayConfig::from_yaml("sources: [a.har]\ndiagnostic: true").unwrap_err();
        assert!(err.to_string().contains("diagnostic"), "{err}");
    }

    #[test]
    fn invalid_filters_are_config_errors() {
        let bad_version = ReplayConfig::from_yaml("filters: [{kind: set_version, version: HTTP/9}]").unwrap();
        assert!(matches!(bad_version.filter_chain(), Err(ReplayError::Config { .. })));

        let bad_header = ReplayConfig::from_yaml("filters: [{kind: delete_header, name: 'bad header'}]").unwrap();
        assert!(bad_header.filter_chain().is_err());
    }

    #[test]
    fn load_resolves_paths_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let path = dir.path().join("replay.yaml");
        std::fs::write(
            &path,
            "sources: [fixtures/api.har]\nfilters: [{kind: remove_query_param, name: token}]\ndump_requests: requests\n",
        )
        .unwrap();

        let transport = ReplayConfig::load(&path).unwrap().build().unwrap();
        assert_eq!(transport.cache().unwrap().len(), 2);

        let mut request = Request::new(Method::GET, "https://example.com/v1/resource?token=live".parse().unwrap());
        let response = transport.round_trip(&mut request).unwrap();
        assert_eq!(response.body.as_ref(), b"{}");
        assert_eq!(std::fs::read_dir(dir.path().join("requests")).unwrap().count(), 1);
    }

    #[test]
    fn single_response_serves_the_chosen_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let path = dir.path().join("replay.yaml");
        std::fs::write(&path, "single_response: {source: fixtures/api.har, entry: 1}\n").unwrap();

        let transport = ReplayConfig::load(&path).unwrap().build().unwrap();
        let mut request = Request::new(Method::DELETE, "https://elsewhere.test/".parse().unwrap())
            .with_version(Version::HTTP_2);
        assert_eq!(transport.round_trip(&mut request).unwrap().status, StatusCode::NOT_FOUND);

        std::fs::write(&path, "single_response: {source: fixtures/api.har, entry: 5}\n").unwrap();
        let err = ReplayConfig::load(&path).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn missing_sources_is_an_error() {
        let err = ReplayConfig::from_yaml("diagnostics: true").unwrap().build().unwrap_err();
        assert!(err.to_string().contains("no sources"), "{err}");
    }
}
