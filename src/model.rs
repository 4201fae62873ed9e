// src/model.rs
use serde::{Deserialize, Deserializer};

/// One addressable instance of a named service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    service_id: String,
    host: String,
    port: u16,
    secure: bool,
}

impl ServiceInstance {
    pub fn new(service_id: impl Into<String>, host: impl Into<String>, port: u16, secure: bool) -> Self {
        ServiceInstance {
            service_id: service_id.into(),
            host: host.into(),
            port,
            secure,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `http://host:port`, or `https://` for secure instances.
    pub fn uri(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Consul sends `null` for empty tag lists on some versions.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Value of the `/v1/agent/services` map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub port: u16,
}

/// Body of `/v1/agent/self`. Only the member record is read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentSelf {
    pub member: Option<Member>,
}

/// Gossip member describing the local agent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Member {
    pub name: String,
    pub addr: String,
}

/// Item of `/v1/catalog/service/:name`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CatalogService {
    pub node: String,
    pub address: String,
    pub service_address: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub service_tags: Vec<String>,
    pub service_port: u16,
}

/// Host to dial for a catalog entry.
///
/// An explicit service address wins over the node address; the node name is
/// the last resort when neither is set.
pub fn catalog_service_host(entry: &CatalogService) -> &str {
    if !entry.service_address.is_empty() {
        &entry.service_address
    } else if !entry.address.is_empty() {
        &entry.address
    } else {
        &entry.node
    }
}
