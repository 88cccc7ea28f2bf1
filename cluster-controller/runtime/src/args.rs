use crate::{
    cds::{metrics::GeneratorMetrics, ClusterOrder, Environment, Generator},
    core::{
        duration,
        service::{NodeType, Proxy},
        MeshConfig,
    },
    index::{self, Index},
    run::{load_snapshot, Controller},
    IndexDiscover,
};
use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use prometheus_client::registry::Registry;
use std::{io::Write, net::IpAddr, path::PathBuf, time::Duration};

#[derive(Debug, Parser)]
#[clap(
    name = "cluster-controller",
    about = "Generates upstream cluster configuration for mesh proxies"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "mesh_cluster_controller=info,warn",
        env = "MESH_CLUSTER_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    /// A JSON snapshot of the service registry and destination rules.
    #[clap(long)]
    snapshot: PathBuf,

    /// Writes clusters to this file instead of stdout, which is shared with
    /// logs.
    #[clap(long)]
    output: Option<PathBuf>,

    #[clap(long, value_enum, default_value = "sidecar")]
    proxy_type: ProxyType,

    #[clap(long)]
    proxy_ip: IpAddr,

    #[clap(long, default_value = "")]
    proxy_id: String,

    #[clap(long, default_value = "cluster.local")]
    proxy_domain: String,

    /// The connect timeout of clusters that no policy configures.
    #[clap(long, default_value = "5s", value_parser = duration::parse)]
    connect_timeout: Duration,

    /// How often proxies poll for endpoint updates.
    #[clap(long, default_value = "5s", value_parser = duration::parse)]
    refresh_delay: Duration,

    /// Sorts clusters by name.
    #[clap(long)]
    sort_clusters: bool,

    /// Reloads the snapshot and regenerates clusters on this interval, writing
    /// them whenever they change. Clusters are generated once when unset.
    #[clap(long, value_parser = duration::parse)]
    interval: Option<Duration>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ProxyType {
    Sidecar,
    Ingress,
    Router,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            snapshot,
            output,
            proxy_type,
            proxy_ip,
            proxy_id,
            proxy_domain,
            connect_timeout,
            refresh_delay,
            sort_clusters,
            interval,
        } = self;

        log_format.try_init(log_level)?;

        let index = Index::shared(load_snapshot(&snapshot)?)?;

        let mut prom = <Registry>::default();
        let metrics = GeneratorMetrics::register(prom.sub_registry_with_prefix("cds"));
        index::metrics::register(prom.sub_registry_with_prefix("index"), index.clone());

        let order = if sort_clusters {
            ClusterOrder::ByName
        } else {
            ClusterOrder::Generated
        };

        let discover = IndexDiscover::new(index.clone());
        let controller = Controller {
            snapshot,
            index,
            env: Environment {
                mesh: MeshConfig {
                    connect_timeout,
                    rds_refresh_delay: refresh_delay,
                },
                registry: discover.clone(),
                rules: discover.clone(),
                auxiliary: discover,
            },
            generator: Generator::new(order, metrics),
            proxy: Proxy {
                node_type: proxy_type.into(),
                ip_address: proxy_ip,
                id: proxy_id,
                domain: proxy_domain,
            },
            prom,
        };

        match output {
            Some(path) => {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                serve(controller, interval, &mut std::io::BufWriter::new(file)).await
            }
            None => serve(controller, interval, &mut std::io::stdout().lock()).await,
        }
    }
}

/// Generates once, or on every tick of `interval` until the process is
/// interrupted.
async fn serve<W: Write>(
    controller: Controller,
    interval: Option<Duration>,
    out: &mut W,
) -> Result<()> {
    let Some(interval) = interval else {
        return controller.generate_once(out);
    };

    tracing::info!(interval = %duration::format(&interval), "Regenerating clusters");
    controller
        .regenerate(interval, out, async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(%error, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
}

impl From<ProxyType> for NodeType {
    fn from(proxy_type: ProxyType) -> Self {
        match proxy_type {
            ProxyType::Sidecar => Self::Sidecar,
            ProxyType::Ingress => Self::Ingress,
            ProxyType::Router => Self::Router,
        }
    }
}
