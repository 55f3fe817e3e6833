//! Construction of WebHDFS request targets.
//!
//! A target has the shape
//! `http://<authority>/webhdfs/v1/<path>?op=<OP>[&key=value]*[&user.name=<user>]`.
//! Everything here is pure; host selection happens in the resolver.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::warn;

use crate::operations::Operation;

/// Root of the REST API under each NameNode authority.
pub const API_ROOT: &str = "webhdfs/v1";

/// Query parameter carrying the caller identity.
pub const USER_NAME_PARAM: &str = "user.name";

const OP_PARAM: &str = "op";

/// Everything except the RFC 3986 unreserved characters and `/` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Ordered set of extra query parameters.
///
/// Keeps caller insertion order so built URIs are reproducible. Inserting a
/// key that is already present replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder-style variant of [`QueryParams::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Strips leading separators so `/a/b` and `a/b` name the same target.
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

/// Percent-encodes a path, emitting non-ASCII characters as UTF-8 octets.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(normalize_path(path), COMPONENT).to_string()
}

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Builds the full request target for one call.
///
/// `op` and `user.name` are owned by the builder: caller parameters with
/// those keys are dropped, and the identity, when configured, always comes
/// last.
pub fn build_uri(
    authority: &str,
    path: &str,
    op: Operation,
    params: &QueryParams,
    user: Option<&str>,
) -> String {
    let mut uri = format!("http://{}/{}/{}?{}={}", authority, API_ROOT, encode_path(path), OP_PARAM, op);

    for (key, value) in params.iter() {
        if key == OP_PARAM || key == USER_NAME_PARAM {
            warn!(key, "dropping reserved query parameter supplied by caller");
            continue;
        }
        uri.push('&');
        uri.push_str(&encode_component(key));
        uri.push('=');
        uri.push_str(&encode_component(value));
    }

    if let Some(user) = user {
        uri.push('&');
        uri.push_str(USER_NAME_PARAM);
        uri.push('=');
        uri.push_str(&encode_component(user));
    }

    uri
}
