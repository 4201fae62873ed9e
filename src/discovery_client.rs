// src/discovery_client.rs
use crate::config::{DiscoveryProperties, Lifecycle, ServerProperties};
use crate::consul_integration::{ConsulApi, ConsulError};
use crate::model::{catalog_service_host, ServiceInstance};
use async_trait::async_trait;
use std::sync::Arc;

const DEFAULT_HOST: &str = "localhost";

/// Generic discovery surface exposed to the rest of an application.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn description(&self) -> &'static str;

    /// Identity of the running process as a discoverable instance.
    async fn local_service_instance(&self) -> Result<ServiceInstance, Self::Error>;

    /// Every instance registered under `service_name`. Unknown names yield
    /// an empty list.
    async fn instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, Self::Error>;

    /// Names of every service known to the registry.
    async fn services(&self) -> Result<Vec<String>, Self::Error>;
}

/// Discovery backed by a Consul agent.
pub struct ConsulDiscoveryClient<C> {
    client: C,
    lifecycle: Arc<Lifecycle>,
    properties: Arc<DiscoveryProperties>,
    server: ServerProperties,
}

impl<C: ConsulApi> ConsulDiscoveryClient<C> {
    pub fn new(
        client: C,
        lifecycle: Arc<Lifecycle>,
        properties: Arc<DiscoveryProperties>,
        server: ServerProperties,
    ) -> Self {
        ConsulDiscoveryClient { client, lifecycle, properties, server }
    }

    /// Fallback when the agent does not know our service yet, usually
    /// because registration has not completed.
    fn configured_identity(&self) -> (String, u16) {
        let mut port = self.lifecycle.configured_port;
        if port == 0 {
            if let Some(server_port) = self.server.port {
                port = server_port;
            }
        }
        (self.lifecycle.service_id.clone(), port)
    }

    async fn local_host(&self) -> Result<String, ConsulError> {
        let me = self.client.agent_self().await?;
        let host = me.member.and_then(|member| {
            let candidate = if self.properties.prefer_ip_address {
                member.addr
            } else {
                member.name
            };
            (!candidate.is_empty()).then_some(candidate)
        });
        Ok(host.unwrap_or_else(|| DEFAULT_HOST.to_string()))
    }
}

#[async_trait]
impl<C: ConsulApi> DiscoveryClient for ConsulDiscoveryClient<C> {
    type Error = ConsulError;

    fn description(&self) -> &'static str {
        "Consul Discovery Client"
    }

    async fn local_service_instance(&self) -> Result<ServiceInstance, ConsulError> {
        let services = self.client.agent_services().await?;
        let (service_id, port) = match services.get(&self.lifecycle.service_id) {
            Some(service) => (service.id.clone(), service.port),
            None => {
                log::warn!(
                    "Unable to locate service in consul agent: {}",
                    self.lifecycle.service_id
                );
                self.configured_identity()
            }
        };
        let host = self.local_host().await?;
        Ok(ServiceInstance::new(service_id, host, port, false))
    }

    async fn instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, ConsulError> {
        if service_name.is_empty() {
            return Ok(Vec::new());
        }
        let entries = self.client.catalog_service(service_name).await?;
        let filter = &self.properties.filter;
        let instances = entries
            .iter()
            .filter(|entry| filter.matches(&entry.service_tags))
            .map(|entry| {
                ServiceInstance::new(service_name, catalog_service_host(entry), entry.service_port, false)
            })
            .collect();
        Ok(instances)
    }

    async fn services(&self) -> Result<Vec<String>, ConsulError> {
        let services = self.client.catalog_services().await?;
        Ok(services.into_keys().collect())
    }
}
