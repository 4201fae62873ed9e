// src/consul_integration.rs
//
// Read-only access to a Consul agent over its HTTP API.

use crate::config::ConsulConfig;
use crate::model::{AgentSelf, AgentService, CatalogService};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsulError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid consul url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to consul failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("consul returned {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },
}

/// The agent and catalog queries discovery is built on.
///
/// All calls use default query parameters: no stale reads and no blocking
/// index/wait.
#[async_trait]
pub trait ConsulApi: Send + Sync {
    /// Services registered with the local agent, keyed by service id.
    async fn agent_services(&self) -> Result<HashMap<String, AgentService>, ConsulError>;

    async fn agent_self(&self) -> Result<AgentSelf, ConsulError>;

    /// Catalog entries for one service name, in catalog order.
    async fn catalog_service(&self, name: &str) -> Result<Vec<CatalogService>, ConsulError>;

    /// Every service name in the catalog mapped to its tags.
    async fn catalog_services(&self) -> Result<HashMap<String, Vec<String>>, ConsulError>;
}

/// `ConsulApi` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpConsulClient {
    http: Client,
    base_url: Url,
    datacenter: Option<String>,
    token: Option<String>,
}

impl HttpConsulClient {
    pub fn new(config: &ConsulConfig) -> Result<Self, ConsulError> {
        let base_url = Url::parse(&config.url).map_err(|e| ConsulError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConsulError::InvalidUrl {
                url: config.url.clone(),
                reason: "not a base url".to_string(),
            });
        }
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(ConsulError::Client)?;
        Ok(HttpConsulClient {
            http,
            base_url,
            datacenter: config.datacenter.clone(),
            token: config.token.clone(),
        })
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let req = self.http.get(url);
        match &self.token {
            Some(token) => req.header("X-Consul-Token", token),
            None => req,
        }
    }

    fn with_datacenter(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.datacenter {
            Some(dc) => req.query(&[("dc", dc)]),
            None => req,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url, datacenter: bool) -> Result<T, ConsulError> {
        let path = url.path().to_string();
        log::debug!("consul GET {}", path);
        let mut req = self.get(url);
        if datacenter {
            req = self.with_datacenter(req);
        }
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ConsulError::Status {
                path,
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl ConsulApi for HttpConsulClient {
    async fn agent_services(&self) -> Result<HashMap<String, AgentService>, ConsulError> {
        self.fetch(self.url(&["v1", "agent", "services"]), false).await
    }

    async fn agent_self(&self) -> Result<AgentSelf, ConsulError> {
        self.fetch(self.url(&["v1", "agent", "self"]), false).await
    }

    async fn catalog_service(&self, name: &str) -> Result<Vec<CatalogService>, ConsulError> {
        self.fetch(self.url(&["v1", "catalog", "service", name]), true).await
    }

    async fn catalog_services(&self) -> Result<HashMap<String, Vec<String>>, ConsulError> {
        self.fetch(self.url(&["v1", "catalog", "services"]), true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpConsulClient {
        let cfg = ConsulConfig { url: url.into(), ..Default::default() };
        HttpConsulClient::new(&cfg).unwrap()
    }

    #[test]
    fn paths_join_onto_base_url() {
        assert_eq!(
            client("http://consul:8500").url(&["v1", "agent", "self"]).as_str(),
            "http://consul:8500/v1/agent/self"
        );
        assert_eq!(
            client("http://consul:8500/").url(&["v1", "agent", "self"]).as_str(),
            "http://consul:8500/v1/agent/self"
        );
        assert_eq!(
            client("http://gw:80/consul/").url(&["v1", "catalog", "services"]).as_str(),
            "http://gw:80/consul/v1/catalog/services"
        );
    }

    #[test]
    fn service_names_are_escaped_into_one_segment() {
        let url = client("http://consul:8500").url(&["v1", "catalog", "service", "orders?dc=dc9#x/y"]);
        assert_eq!(url.path(), "/v1/catalog/service/orders%3Fdc=dc9%23x%2Fy");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let cfg = ConsulConfig { url: "consul:8500".into(), ..Default::default() };
        assert!(matches!(HttpConsulClient::new(&cfg), Err(ConsulError::InvalidUrl { .. })));
        let cfg = ConsulConfig { url: "not a url".into(), ..Default::default() };
        assert!(matches!(HttpConsulClient::new(&cfg), Err(ConsulError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn unreachable_agent_is_a_transport_error() {
        // Port 9 (discard) is closed on loopback in test environments.
        let cfg = ConsulConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: Some(2),
            ..Default::default()
        };
        let client = HttpConsulClient::new(&cfg).unwrap();
        let err = client.catalog_services().await.unwrap_err();
        assert!(matches!(err, ConsulError::Transport(_)));
    }
}
