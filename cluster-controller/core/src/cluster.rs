//! Upstream cluster definitions consumed by data-plane proxies.

use crate::duration;
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroU16, time::Duration};

/// A named group of upstream endpoints and the policy used to reach them.
///
/// A cluster carries EDS configuration if and only if its discovery type is
/// [`DiscoveryType::Eds`]; the two are only updated together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub name: String,

    #[serde(rename = "type")]
    discovery_type: DiscoveryType,

    #[serde(with = "duration::string")]
    pub connect_timeout: Duration,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    eds_cluster_config: Option<EdsClusterConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breakers: Option<CircuitBreakers>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_connection: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlier_detection: Option<OutlierDetection>,

    #[serde(default)]
    pub lb_policy: LbPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_context: Option<UpstreamTlsContext>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_protocol_options: Option<Http2ProtocolOptions>,
}

/// How a proxy discovers the members of a cluster.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveryType {
    Static,
    StrictDns,
    LogicalDns,
    Eds,
    OriginalDst,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    LeastRequest,
    Random,
    #[serde(rename = "ORIGINAL_DST_LB")]
    OriginalDstLb,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// An IP address or a DNS name.
    pub address: String,
    pub port: NonZeroU16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdsClusterConfig {
    pub service_name: String,
    pub eds_config: ConfigSource,
}

/// Points a proxy at the discovery service that streams a cluster's endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSource {
    pub api_type: ApiType,
    pub cluster_names: Vec<String>,
    #[serde(with = "duration::string")]
    pub refresh_delay: Duration,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiType {
    #[default]
    Grpc,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakers {
    pub thresholds: Vec<Thresholds>,
}

/// Circuit-breaking limits. Unset fields fall back to the proxy's defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending_requests: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_5xx: Option<u32>,

    #[serde(
        default,
        with = "duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,

    #[serde(
        default,
        with = "duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_ejection_time: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ejection_percent: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamTlsContext {
    pub common_tls_context: CommonTlsContext,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sni: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonTlsContext {
    /// Client certificates presented to the upstream, for mutual TLS.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tls_certificates: Vec<TlsCertificate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_context: Option<CertificateValidationContext>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsCertificate {
    pub certificate_chain: DataSource,
    pub private_key: DataSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValidationContext {
    pub trusted_ca: DataSource,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_subject_alt_name: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    Filename(String),
}

/// Marks a cluster as speaking HTTP/2 to its upstreams.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Http2ProtocolOptions {}

// === impl Cluster ===

impl Cluster {
    /// Creates a cluster with no policy. Its connect timeout is zero until a
    /// policy sets one.
    pub fn new(
        name: impl Into<String>,
        discovery_type: DiscoveryType,
        hosts: Vec<Address>,
    ) -> Self {
        Self {
            name: name.into(),
            discovery_type,
            connect_timeout: Duration::ZERO,
            hosts,
            eds_cluster_config: None,
            circuit_breakers: None,
            max_requests_per_connection: None,
            outlier_detection: None,
            lb_policy: LbPolicy::default(),
            tls_context: None,
            http2_protocol_options: None,
        }
    }

    pub fn discovery_type(&self) -> DiscoveryType {
        self.discovery_type
    }

    /// Changes the cluster's discovery type, dropping its EDS configuration if
    /// the new type is not EDS.
    pub fn set_discovery_type(&mut self, discovery_type: DiscoveryType) {
        self.discovery_type = discovery_type;
        if discovery_type != DiscoveryType::Eds {
            self.eds_cluster_config = None;
        }
    }

    pub fn eds_cluster_config(&self) -> Option<&EdsClusterConfig> {
        self.eds_cluster_config.as_ref()
    }

    /// Attaches EDS configuration to the cluster.
    ///
    /// Returns false, leaving the cluster unchanged, if the cluster is not an
    /// EDS cluster.
    pub fn set_eds_cluster_config(&mut self, config: EdsClusterConfig) -> bool {
        if self.discovery_type != DiscoveryType::Eds {
            return false;
        }
        self.eds_cluster_config = Some(config);
        true
    }

    /// Returns the cluster's circuit-breaker thresholds, if any.
    pub fn thresholds(&self) -> Option<&Thresholds> {
        self.circuit_breakers.as_ref()?.thresholds.first()
    }
}

// === impl Address ===

impl Address {
    pub fn new(address: impl Into<String>, port: NonZeroU16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}
