//! User-authored traffic policy, keyed by destination hostname.
//!
//! Numeric settings are optional at this boundary, but the policy schema these
//! documents are written against cannot distinguish an omitted value from an
//! explicit zero. Consumers must treat both as unset; see [`positive`].

use crate::{duration, service::Labels};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The value the policy schema uses for an unset numeric field.
pub const UNSET: i32 = 0;

/// Returns the value of a numeric policy field if it is set, i.e. strictly
/// greater than [`UNSET`].
///
/// An explicit zero is indistinguishable from an omitted value in the policy
/// schema, so a zero never overrides anything.
#[inline]
pub fn positive(value: Option<i32>) -> Option<u32> {
    value
        .filter(|v| *v > UNSET)
        .and_then(|v| u32::try_from(v).ok())
}

/// Returns the duration if it is set, i.e. non-zero.
#[inline]
pub fn positive_duration(value: Option<Duration>) -> Option<Duration> {
    value.filter(|d| !d.is_zero())
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRule {
    pub host: String,

    /// When unset, the rule applies to the host in any namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_policy: Option<TrafficPolicy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsets: Vec<Subset>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subset {
    pub name: String,

    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_policy: Option<TrafficPolicy>,
}

/// A bundle of independently optional policy categories.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_pool: Option<ConnectionPoolSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlier_detection: Option<OutlierDetection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancerSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPoolSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i32>,

    #[serde(
        default,
        with = "duration::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub connect_timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSettings {
    /// Only enforced by proxies for HTTP/1.1 connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http1_max_pending_requests: Option<i32>,

    /// Only enforced by proxies for HTTP/2 connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_max_requests: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_connection: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i32>,
}

/// Outlier detection settings. Only the `http` block has any effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpOutlierDetection>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOutlierDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consecutive_errors: Option<i32>,

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
    pub max_ejection_percent: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSettings {
    pub simple: SimpleLb,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimpleLb {
    #[default]
    RoundRobin,
    LeastConn,
    Random,

    /// Forward to the connection's original destination.
    Passthrough,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsSettings {
    pub mode: TlsMode,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_certificate: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_certificates: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sni: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TlsMode {
    #[default]
    Disable,
    Simple,
    Mutual,
}

// === impl LoadBalancerSettings ===

impl From<SimpleLb> for LoadBalancerSettings {
    fn from(simple: SimpleLb) -> Self {
        Self { simple }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_unset() {
        assert_eq!(positive(None), None);
        assert_eq!(positive(Some(UNSET)), None);
        assert_eq!(positive(Some(-3)), None);
        assert_eq!(positive(Some(7)), Some(7));

        assert_eq!(positive_duration(Some(Duration::ZERO)), None);
        assert_eq!(
            positive_duration(Some(Duration::from_secs(1))),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn deserializes_destination_rules() {
        let rule: DestinationRule = serde_json::from_str(
            r#"{
                "host": "reviews.default.svc",
                "trafficPolicy": {
                    "connectionPool": {
                        "tcp": {"maxConnections": 10, "connectTimeout": "250ms"},
                        "http": {"http2MaxRequests": 100}
                    },
                    "loadBalancer": {"simple": "LEAST_CONN"},
                    "tls": {"mode": "MUTUAL", "caCertificates": "/etc/certs/root.pem"}
                },
                "subsets": [{
                    "name": "v2",
                    "labels": {"version": "v2"},
                    "trafficPolicy": {"loadBalancer": {"simple": "RANDOM"}}
                }]
            }"#,
        )
        .unwrap();

        let policy = rule.traffic_policy.unwrap();
        let pool = policy.connection_pool.unwrap();
        let tcp = pool.tcp.unwrap();
        assert_eq!(tcp.max_connections, Some(10));
        assert_eq!(tcp.connect_timeout, Some(Duration::from_millis(250)));
        assert_eq!(pool.http.unwrap().http2_max_requests, Some(100));
        assert_eq!(policy.load_balancer.unwrap().simple, SimpleLb::LeastConn);
        assert_eq!(policy.tls.unwrap().mode, TlsMode::Mutual);

        assert_eq!(rule.subsets.len(), 1);
        assert_eq!(
            rule.subsets[0].traffic_policy,
            Some(TrafficPolicy {
                load_balancer: Some(SimpleLb::Random.into()),
                ..Default::default()
            })
        );
    }
}
