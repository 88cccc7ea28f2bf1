//! An in-memory service registry and destination rule store.
//!
//! The index is built from a [`Snapshot`] and replaced wholesale when a new
//! snapshot is loaded. Generation passes only read from it.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod metrics;
mod snapshot;


pub use self::snapshot::{InstanceSpec, Snapshot, SnapshotError};
use ahash::AHashMap as HashMap;
use anyhow::Result;
use mesh_cluster_controller_core::{
    cluster::Cluster,
    policy::DestinationRule,
    service::{labels_match, Labels, NetworkEndpoint, Port, Proxy, Service, ServiceInstance},
    AuxiliaryClusters, DestinationRules, MeshConfig, ServiceRegistry,
};
use parking_lot::RwLock;
use std::{net::IpAddr, sync::Arc};

pub type SharedIndex = Arc<RwLock<Index>>;

#[derive(Debug, Default)]
pub struct Index {
    /// Services in the order they were listed.
    services: Vec<Arc<Service>>,
    instances: Vec<ServiceInstance>,
    rules: HashMap<String, Vec<Arc<DestinationRule>>>,
    management_ports: HashMap<IpAddr, Vec<Port>>,
    auxiliary: HashMap<String, Vec<Cluster>>,
}

// === impl Index ===

impl Index {
    pub fn shared(snapshot: Snapshot) -> Result<SharedIndex, SnapshotError> {
        Ok(Arc::new(RwLock::new(Self::from_snapshot(snapshot)?)))
    }

    /// Builds an index from `snapshot`, ensuring that every instance refers to
    /// a known service port.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, SnapshotError> {
        let Snapshot {
            services,
            instances,
            destination_rules,
            management_ports,
            auxiliary_clusters,
        } = snapshot;

        let mut by_hostname = HashMap::with_capacity(services.len());
        let mut ordered = Vec::with_capacity(services.len());
        for service in services {
            let service = Arc::new(service);
            if by_hostname
                .insert(service.hostname.clone(), service.clone())
                .is_some()
            {
                return Err(SnapshotError::DuplicateService(service.hostname.clone()));
            }
            ordered.push(service);
        }

        let instances = instances
            .into_iter()
            .map(|spec| {
                let InstanceSpec {
                    hostname,
                    address,
                    port,
                    service_port,
                    labels,
                } = spec;
                let Some(service) = by_hostname.get(&hostname) else {
                    return Err(SnapshotError::UnknownService { hostname, address });
                };
                let Some(service_port) = service.port_by_name(&service_port).cloned() else {
                    return Err(SnapshotError::UnknownPort {
                        hostname,
                        address,
                        port: service_port,
                    });
                };
                Ok(ServiceInstance {
                    endpoint: NetworkEndpoint {
                        address,
                        port,
                        service_port,
                    },
                    service: service.clone(),
                    labels,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = HashMap::<String, Vec<Arc<DestinationRule>>>::default();
        for rule in destination_rules {
            rules
                .entry(rule.host.clone())
                .or_default()
                .push(Arc::new(rule));
        }

        tracing::debug!(
            services = ordered.len(),
            instances = instances.len(),
            rules = rules.len(),
            "Indexed snapshot"
        );

        Ok(Self {
            services: ordered,
            instances,
            rules,
            management_ports: management_ports.into_iter().collect(),
            auxiliary: auxiliary_clusters.into_iter().collect(),
        })
    }

    /// Replaces the index's contents with `snapshot`. On error, the index is
    /// left unchanged.
    pub fn reset(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }
}

impl ServiceRegistry for Index {
    fn services(&self) -> Result<Vec<Arc<Service>>> {
        Ok(self.services.clone())
    }

    fn instances(
        &self,
        hostname: &str,
        port_names: &[&str],
        labels: &[Labels],
    ) -> Result<Vec<ServiceInstance>> {
        Ok(self
            .instances
            .iter()
            .filter(|i| i.service.hostname == hostname)
            .filter(|i| port_names.contains(&i.endpoint.service_port.name.as_str()))
            .filter(|i| labels.is_empty() || labels.iter().any(|l| labels_match(l, &i.labels)))
            .cloned()
            .collect())
    }

    fn proxy_instances(&self, proxy: &Proxy) -> Result<Vec<ServiceInstance>> {
        Ok(self
            .instances
            .iter()
            .filter(|i| {
                i.endpoint
                    .address
                    .parse::<IpAddr>()
                    .is_ok_and(|ip| ip == proxy.ip_address)
            })
            .cloned()
            .collect())
    }

    fn management_ports(&self, addr: IpAddr) -> Vec<Port> {
        self.management_ports
            .get(&addr)
            .cloned()
            .unwrap_or_default()
    }
}

impl DestinationRules for Index {
    fn destination_rule(
        &self,
        hostname: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<DestinationRule>> {
        let rules = self.rules.get(hostname)?;
        let Some(namespace) = namespace else {
            return rules.first().cloned();
        };

        // Prefer a rule in the requested namespace over a rule with no namespace.
        rules
            .iter()
            .find(|r| r.namespace.as_deref() == Some(namespace))
            .or_else(|| rules.iter().find(|r| r.namespace.is_none()))
            .cloned()
    }
}

impl AuxiliaryClusters for Index {
    /// Returns the auxiliary clusters of each distinct service among
    /// `instances`, in the order the services first appear.
    fn clusters_for_instances(
        &self,
        _: &MeshConfig,
        instances: &[ServiceInstance],
    ) -> Vec<Cluster> {
        let mut seen = Vec::<&str>::new();
        let mut clusters = Vec::new();
        for instance in instances {
            let hostname = instance.service.hostname.as_str();
            if seen.contains(&hostname) {
                continue;
            }
            seen.push(hostname);
            if let Some(aux) = self.auxiliary.get(hostname) {
                clusters.extend(aux.iter().cloned());
            }
        }
        clusters
    }
}
