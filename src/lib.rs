// src/lib.rs
//
// Service discovery backed by a Consul agent: resolve a service name to
// host/port instances, describe the local instance, list service names.

pub mod config;
pub mod consul_integration;
pub mod discovery_client;
pub mod model;

pub use config::{Config, ConfigError, ConsulConfig, DiscoveryProperties, Lifecycle, ServerProperties, TagFilter};
pub use consul_integration::{ConsulApi, ConsulError, HttpConsulClient};
pub use discovery_client::{ConsulDiscoveryClient, DiscoveryClient};
pub use model::ServiceInstance;
