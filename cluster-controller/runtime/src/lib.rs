#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use mesh_cluster_controller_cds as cds;
pub use mesh_cluster_controller_core as core;
pub use mesh_cluster_controller_index as index;

mod args;
mod run;

pub use self::args::Args;

use std::{net::IpAddr, sync::Arc};

/// Serves generation passes from the shared index, taking a read lock for each
/// lookup.
#[derive(Clone, Debug)]
struct IndexDiscover(index::SharedIndex);

impl IndexDiscover {
    pub fn new(index: index::SharedIndex) -> Self {
        Self(index)
    }
}

impl core::ServiceRegistry for IndexDiscover {
    fn services(&self) -> anyhow::Result<Vec<Arc<core::service::Service>>> {
        self.0.read().services()
    }

    fn instances(
        &self,
        hostname: &str,
        port_names: &[&str],
        labels: &[core::service::Labels],
    ) -> anyhow::Result<Vec<core::service::ServiceInstance>> {
        self.0.read().instances(hostname, port_names, labels)
    }

    fn proxy_instances(
        &self,
        proxy: &core::service::Proxy,
    ) -> anyhow::Result<Vec<core::service::ServiceInstance>> {
        self.0.read().proxy_instances(proxy)
    }

    fn management_ports(&self, addr: IpAddr) -> Vec<core::service::Port> {
        self.0.read().management_ports(addr)
    }
}

impl core::DestinationRules for IndexDiscover {
    fn destination_rule(
        &self,
        hostname: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<core::policy::DestinationRule>> {
        self.0.read().destination_rule(hostname, namespace)
    }
}

impl core::AuxiliaryClusters for IndexDiscover {
    fn clusters_for_instances(
        &self,
        mesh: &core::MeshConfig,
        instances: &[core::service::ServiceInstance],
    ) -> Vec<core::cluster::Cluster> {
        self.0.read().clusters_for_instances(mesh, instances)
    }
}
