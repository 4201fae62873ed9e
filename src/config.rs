use serde::Deserialize;
use std::{collections::BTreeSet, fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file '{path}' : {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consul: ConsulConfig,
    pub discovery: DiscoveryProperties,
    #[serde(default)]
    pub server: ServerProperties,
}

/// Where and how to reach the Consul agent.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsulConfig {
    #[serde(default = "default_consul_url")]
    pub url: String,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout; unset leaves the HTTP client's default (none).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_consul_url() -> String {
    "http://127.0.0.1:8500".to_string()
}

impl Default for ConsulConfig {
    fn default() -> Self {
        ConsulConfig {
            url: default_consul_url(),
            datacenter: None,
            token: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryProperties {
    pub service_name: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub prefer_ip_address: bool,
    /// Port the service registers with; 0 means not configured.
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub filter: TagFilter,
}

/// Allow-list of tags. Empty means every entry passes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl TagFilter {
    /// True when the filter is empty or shares at least one tag with `tags`.
    pub fn matches(&self, tags: &[String]) -> bool {
        self.tags.is_empty() || tags.iter().any(|t| self.tags.contains(t))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerProperties {
    #[serde(default)]
    pub port: Option<u16>,
}

/// Registration identity of the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    pub service_id: String,
    pub configured_port: u16,
}

impl Lifecycle {
    pub fn new(service_id: impl Into<String>, configured_port: u16) -> Self {
        Lifecycle { service_id: service_id.into(), configured_port }
    }
}

impl From<&DiscoveryProperties> for Lifecycle {
    fn from(props: &DiscoveryProperties) -> Self {
        let service_id = props
            .instance_id
            .clone()
            .unwrap_or_else(|| props.service_name.clone());
        Lifecycle::new(service_id, props.port)
    }
}

impl Config {
    /// Load and parse configuration from the given YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let file = File::open(p)
            .map_err(|e| ConfigError::Io { path: p.display().to_string(), source: e })?;
        let reader = BufReader::new(file);
        let cfg = serde_yaml::from_reader(reader)?;
        Ok(cfg)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from(&self.discovery)
    }
}
