//! Cluster discovery
//!
//! Translates the service registry and user-authored destination rules into the
//! upstream clusters a proxy routes to. Every cluster is assembled the same way:
//!
//! ```text
//! [ resolution ] -> [ default policy ] -> [ rule policy ] -> [ subset policy ]
//! ```
//!
//! The default policy is derived from mesh-wide settings. Each later policy
//! replaces any category (connection pool, outlier detection, load balancer,
//! TLS) that it specifies and leaves the others untouched.
//!
//! Clusters are rebuilt from scratch on each pass. A pass holds no state
//! between invocations and takes no locks; the registry and rule store must
//! tolerate concurrent readers.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cluster;
mod defaults;
mod generate;
mod hosts;
mod inbound;
pub mod metrics;
mod order;
mod outbound;
pub mod policy;
mod resolution;


pub use self::{
    cluster::build_default_cluster,
    defaults::default_traffic_policy,
    generate::{build_clusters, Environment, Generator},
    order::ClusterOrder,
    policy::apply_traffic_policy,
    resolution::discovery_type,
};
