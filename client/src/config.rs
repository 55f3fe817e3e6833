//! Client configuration.
//!
//! A [`ClientConfig`] is built in code or read from a TOML file, then handed to
//! the client, which never mutates it.

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::uri::normalize_path;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 50070;
pub const DEFAULT_MAX_TRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("path pattern '{0}' has an empty host list")]
    EmptyHostList(String),
}

/// Routes paths matching `pattern` to an explicit list of NameNode
/// authorities (`host:port`), tried in order.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HostRoute {
    pub pattern: String,
    pub hosts: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub user_name: Option<String>,
    /// Per-attempt timeout in whole seconds. Unset means attempts may block
    /// indefinitely.
    pub timeout_seconds: Option<u64>,
    /// Per-attempt timeout in milliseconds; takes precedence over
    /// `timeout_seconds`.
    pub timeout_ms: Option<u64>,
    /// Attempts per request leg. Values below 1 behave as 1.
    pub max_tries: u32,
    pub path_to_hosts: Vec<HostRoute>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user_name: None,
            timeout_seconds: None,
            timeout_ms: None,
            max_tries: DEFAULT_MAX_TRIES,
            path_to_hosts: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Sets the per-attempt timeout, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self.timeout_seconds = None;
        self
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn with_route(mut self, pattern: impl Into<String>, hosts: Vec<String>) -> Self {
        self.path_to_hosts.push(HostRoute {
            pattern: pattern.into(),
            hosts,
        });
        self
    }

    /// The default `host:port` authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The effective per-attempt timeout. A zero value counts as unset.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .map(Duration::from_millis)
            .or(self.timeout_seconds.map(Duration::from_secs))
            .filter(|timeout| !timeout.is_zero())
    }

    pub fn effective_max_tries(&self) -> u32 {
        self.max_tries.max(1)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Reads the configuration at `path`.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(ClientConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ClientConfig::from_toml_str(&content)
}

/// Compiled form of `path_to_hosts`, plus the default authority.
#[derive(Debug, Clone)]
pub(crate) struct HostRoutes {
    routes: Vec<(Regex, Vec<String>)>,
    default: Vec<String>,
}

impl HostRoutes {
    pub(crate) fn compile(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut routes = Vec::with_capacity(config.path_to_hosts.len());
        for route in &config.path_to_hosts {
            if route.hosts.is_empty() {
                return Err(ConfigError::EmptyHostList(route.pattern.clone()));
            }
            let regex = Regex::new(&route.pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: route.pattern.clone(),
                source,
            })?;
            routes.push((regex, route.hosts.clone()));
        }
        Ok(Self {
            routes,
            default: vec![config.authority()],
        })
    }

    /// Authorities to try for `path`, in order.
    ///
    /// Patterns see the path in absolute form (`/user/x`) whatever form the
    /// caller used.
    pub(crate) fn candidates(&self, path: &str) -> &[String] {
        let absolute = format!("/{}", normalize_path(path));
        self.routes
            .iter()
            .find(|(regex, _)| regex.is_match(&absolute))
            .map(|(_, hosts)| hosts.as_slice())
            .unwrap_or(self.default.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_stock_namenode() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 50070);
        assert_eq!(config.user_name, None);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_tries, 3);
        assert_eq!(config.authority(), "localhost:50070");
    }

    #[test]
    fn builder_sets_fields() {
        let config = ClientConfig::new("127.0.0.1", 50075)
            .with_user("myUser")
            .with_max_tries(5)
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 50075);
        assert_eq!(config.user_name.as_deref(), Some("myUser"));
        assert_eq!(config.max_tries, 5);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn sub_second_timeout_is_kept() {
        let config = ClientConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(500)));

        let config = ClientConfig::default().with_timeout(Duration::from_micros(10));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn zero_timeout_counts_as_unset() {
        assert_eq!(ClientConfig::default().with_timeout(Duration::ZERO).timeout(), None);
        let config = ClientConfig::from_toml_str("timeout_seconds = 0").unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn timeout_ms_wins_over_seconds_in_toml() {
        let config = ClientConfig::from_toml_str("timeout_seconds = 30").unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));

        let config = ClientConfig::from_toml_str("timeout_seconds = 30\ntimeout_ms = 250").unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn zero_max_tries_still_makes_one_attempt() {
        assert_eq!(ClientConfig::default().with_max_tries(0).effective_max_tries(), 1);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            host = "namenode"
            user_name = "hdfs"

            [[path_to_hosts]]
            pattern = "^/warehouse/"
            hosts = ["nn1:50070", "nn2:50070"]
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "namenode");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.user_name.as_deref(), Some("hdfs"));
        assert_eq!(config.path_to_hosts.len(), 1);
        assert_eq!(config.path_to_hosts[0].hosts, vec!["nn1:50070", "nn2:50070"]);
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ClientConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/webhdfs.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn routes_pick_first_matching_pattern() {
        let config = ClientConfig::new("default", 1)
            .with_route("^/warehouse/", vec!["wh1:1".into(), "wh2:1".into()])
            .with_route(".*", vec!["catchall:1".into()]);
        let routes = HostRoutes::compile(&config).unwrap();
        assert_eq!(routes.candidates("warehouse/t1"), ["wh1:1", "wh2:1"]);
        assert_eq!(routes.candidates("/warehouse/t1"), ["wh1:1", "wh2:1"]);
        assert_eq!(routes.candidates("/tmp/x"), ["catchall:1"]);
    }

    #[test]
    fn routes_fall_back_to_default_authority() {
        let routes = HostRoutes::compile(&ClientConfig::new("nn", 9870)).unwrap();
        assert_eq!(routes.candidates("/any"), ["nn:9870"]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = ClientConfig::default().with_route("(unclosed", vec!["h:1".into()]);
        let err = HostRoutes::compile(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_host_list_is_reported() {
        let config = ClientConfig::default().with_route(".*", Vec::new());
        let err = HostRoutes::compile(&config).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyHostList(_)));
    }
}
