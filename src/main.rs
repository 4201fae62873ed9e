use anyhow::Context;
use clap::{Parser, Subcommand};
use consul_discovery::{Config, ConsulDiscoveryClient, DiscoveryClient, HttpConsulClient, ServiceInstance};
use std::{path::PathBuf, sync::Arc};

#[derive(Debug, Parser)]
#[command(name = "consul-discovery", version, about = "Query Consul for service instances")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "consul-discovery.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the instance this process registers as.
    Local,
    /// List instances of a service.
    Instances { service: String },
    /// List every service name in the catalog.
    Services,
}

fn print_instance(instance: &ServiceInstance) {
    println!("{} {}:{}", instance.service_id(), instance.host(), instance.port());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let consul = HttpConsulClient::new(&config.consul)?;
    let lifecycle = Arc::new(config.lifecycle());
    log::info!("using consul at {} as {}", config.consul.url, lifecycle.service_id);

    let discovery = ConsulDiscoveryClient::new(
        consul,
        lifecycle,
        Arc::new(config.discovery),
        config.server,
    );

    match cli.command {
        Command::Local => {
            let me = discovery.local_service_instance().await?;
            print_instance(&me);
        }
        Command::Instances { service } => {
            for instance in discovery
                .instances(&service)
                .await
                .with_context(|| format!("resolving {}", service))?
            {
                print_instance(&instance);
            }
        }
        Command::Services => {
            for name in discovery.services().await? {
                println!("{}", name);
            }
        }
    }
    Ok(())
}
