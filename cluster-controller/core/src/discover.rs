use crate::{
    cluster::Cluster,
    policy::DestinationRule,
    service::{Labels, Port, Proxy, Service, ServiceInstance},
    MeshConfig,
};
use anyhow::Result;
use std::{net::IpAddr, sync::Arc};

/// Models the service registry.
///
/// Implementations are read concurrently by generation passes for different
/// proxies.
pub trait ServiceRegistry {
    /// Lists every service in the registry.
    fn services(&self) -> Result<Vec<Arc<Service>>>;

    /// Lists the instances of `hostname` serving any of the named ports and
    /// matching any of the label selectors. An empty list of selectors matches
    /// all instances.
    fn instances(
        &self,
        hostname: &str,
        port_names: &[&str],
        labels: &[Labels],
    ) -> Result<Vec<ServiceInstance>>;

    /// Lists the service instances co-located with `proxy`.
    fn proxy_instances(&self, proxy: &Proxy) -> Result<Vec<ServiceInstance>>;

    /// Lists the management (health-check) ports exposed at `addr`.
    fn management_ports(&self, addr: IpAddr) -> Vec<Port>;
}

/// Models the store of user-authored destination rules.
pub trait DestinationRules {
    /// Returns the rule for `hostname`. When `namespace` is `None`, a rule in
    /// any namespace matches.
    fn destination_rule(
        &self,
        hostname: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<DestinationRule>>;
}

/// Supplies clusters generated by other subsystems (e.g. clusters that fetch
/// JWT signing keys), appended to a sidecar's clusters.
pub trait AuxiliaryClusters {
    fn clusters_for_instances(
        &self,
        mesh: &MeshConfig,
        instances: &[ServiceInstance],
    ) -> Vec<Cluster>;
}

/// Supplies no auxiliary clusters.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoAuxiliaryClusters;

impl AuxiliaryClusters for NoAuxiliaryClusters {
    fn clusters_for_instances(&self, _: &MeshConfig, _: &[ServiceInstance]) -> Vec<Cluster> {
        Vec::new()
    }
}

impl<T: ServiceRegistry + ?Sized> ServiceRegistry for Arc<T> {
    fn services(&self) -> Result<Vec<Arc<Service>>> {
        (**self).services()
    }

    fn instances(
        &self,
        hostname: &str,
        port_names: &[&str],
        labels: &[Labels],
    ) -> Result<Vec<ServiceInstance>> {
        (**self).instances(hostname, port_names, labels)
    }

    fn proxy_instances(&self, proxy: &Proxy) -> Result<Vec<ServiceInstance>> {
        (**self).proxy_instances(proxy)
    }

    fn management_ports(&self, addr: IpAddr) -> Vec<Port> {
        (**self).management_ports(addr)
    }
}

impl<T: DestinationRules + ?Sized> DestinationRules for Arc<T> {
    fn destination_rule(
        &self,
        hostname: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<DestinationRule>> {
        (**self).destination_rule(hostname, namespace)
    }
}

impl<T: AuxiliaryClusters + ?Sized> AuxiliaryClusters for Arc<T> {
    fn clusters_for_instances(
        &self,
        mesh: &MeshConfig,
        instances: &[ServiceInstance],
    ) -> Vec<Cluster> {
        (**self).clusters_for_instances(mesh, instances)
    }
}
