//! Applies traffic policy to clusters.
//!
//! Each policy category is applied independently. A category that is present
//! replaces the cluster's prior configuration for that category entirely; it is
//! never merged field by field. Layering is achieved by applying increasingly
//! specific policies to the same cluster.

use mesh_cluster_controller_core::{
    cluster::{
        CertificateValidationContext, CircuitBreakers, Cluster, CommonTlsContext, DataSource,
        DiscoveryType, LbPolicy, OutlierDetection, Thresholds, TlsCertificate, UpstreamTlsContext,
    },
    policy::{
        self, positive, positive_duration, ConnectionPoolSettings, LoadBalancerSettings, SimpleLb,
        TlsMode, TlsSettings, TrafficPolicy,
    },
};

/// The load-balancing configuration a [`SimpleLb`] setting resolves to.
///
/// Forwarding to the original destination is both a balancing algorithm and a
/// discovery strategy, so a load balancer may dictate a cluster's discovery
/// type regardless of how its service is resolved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EffectiveLoadBalancer {
    pub lb_policy: LbPolicy,

    /// Overrides the cluster's discovery type, when set.
    pub discovery_type: Option<DiscoveryType>,
}

/// Applies `policy` to `cluster`. Categories absent from `policy` are left as
/// they are.
pub fn apply_traffic_policy(cluster: &mut Cluster, policy: Option<&TrafficPolicy>) {
    let Some(policy) = policy else {
        return;
    };

    apply_connection_pool(cluster, policy.connection_pool.as_ref());
    apply_outlier_detection(cluster, policy.outlier_detection.as_ref());
    apply_load_balancer(cluster, policy.load_balancer.as_ref());
    apply_upstream_tls_settings(cluster, policy.tls.as_ref());
}

fn apply_connection_pool(cluster: &mut Cluster, settings: Option<&ConnectionPoolSettings>) {
    let Some(settings) = settings else {
        return;
    };

    let mut threshold = Thresholds::default();

    if let Some(http) = &settings.http {
        // Proxies only enforce max requests on HTTP/2 connections and max
        // pending requests on HTTP/1.1 connections.
        threshold.max_requests = positive(http.http2_max_requests);
        threshold.max_pending_requests = positive(http.http1_max_pending_requests);
        threshold.max_retries = positive(http.max_retries);

        if let Some(max) = positive(http.max_requests_per_connection) {
            cluster.max_requests_per_connection = Some(max);
        }
    }

    if let Some(tcp) = &settings.tcp {
        if let Some(timeout) = positive_duration(tcp.connect_timeout) {
            cluster.connect_timeout = timeout;
        }
        threshold.max_connections = positive(tcp.max_connections);
    }

    cluster.circuit_breakers = Some(CircuitBreakers {
        thresholds: vec![threshold],
    });
}

fn apply_outlier_detection(cluster: &mut Cluster, outlier: Option<&policy::OutlierDetection>) {
    let Some(http) = outlier.and_then(|o| o.http.as_ref()) else {
        return;
    };

    cluster.outlier_detection = Some(OutlierDetection {
        base_ejection_time: http.base_ejection_time,
        consecutive_5xx: positive(http.consecutive_errors),
        interval: http.interval,
        max_ejection_percent: positive(http.max_ejection_percent),
    });
}

fn apply_load_balancer(cluster: &mut Cluster, lb: Option<&LoadBalancerSettings>) {
    let Some(lb) = lb else {
        return;
    };

    let EffectiveLoadBalancer {
        lb_policy,
        discovery_type,
    } = lb.simple.into();
    cluster.lb_policy = lb_policy;
    if let Some(discovery_type) = discovery_type {
        cluster.set_discovery_type(discovery_type);
    }
}

fn apply_upstream_tls_settings(cluster: &mut Cluster, tls: Option<&TlsSettings>) {
    let Some(tls) = tls else {
        return;
    };

    let tls_certificates = match tls.mode {
        // Leaves the cluster's TLS context to the authentication layer, which
        // may still configure one.
        TlsMode::Disable => return,
        TlsMode::Simple => Vec::new(),
        TlsMode::Mutual => vec![TlsCertificate {
            certificate_chain: DataSource::Filename(tls.client_certificate.clone()),
            private_key: DataSource::Filename(tls.private_key.clone()),
        }],
    };

    cluster.tls_context = Some(UpstreamTlsContext {
        common_tls_context: CommonTlsContext {
            tls_certificates,
            validation_context: Some(CertificateValidationContext {
                trusted_ca: DataSource::Filename(tls.ca_certificates.clone()),
                verify_subject_alt_name: tls.subject_alt_names.clone(),
            }),
        },
        sni: tls.sni.clone(),
    });
}

// === impl EffectiveLoadBalancer ===

impl From<SimpleLb> for EffectiveLoadBalancer {
    fn from(simple: SimpleLb) -> Self {
        let (lb_policy, discovery_type) = match simple {
            SimpleLb::RoundRobin => (LbPolicy::RoundRobin, None),
            SimpleLb::LeastConn => (LbPolicy::LeastRequest, None),
            SimpleLb::Random => (LbPolicy::Random, None),
            SimpleLb::Passthrough => (LbPolicy::OriginalDstLb, Some(DiscoveryType::OriginalDst)),
        };
        Self {
            lb_policy,
            discovery_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_cluster_controller_core::policy::{HttpOutlierDetection, HttpSettings, TcpSettings};
    use std::time::Duration;

    fn cluster(discovery_type: DiscoveryType) -> Cluster {
        Cluster::new("outbound|80||a.default.svc", discovery_type, vec![])
    }

    fn tcp_pool(max_connections: i32) -> TrafficPolicy {
        TrafficPolicy {
            connection_pool: Some(ConnectionPoolSettings {
                tcp: Some(TcpSettings {
                    max_connections: Some(max_connections),
                    connect_timeout: None,
                }),
                http: None,
            }),
            ..Default::default()
        }
    }

    fn full_policy() -> TrafficPolicy {
        TrafficPolicy {
            connection_pool: Some(ConnectionPoolSettings {
                tcp: Some(TcpSettings {
                    max_connections: Some(100),
                    connect_timeout: Some(Duration::from_millis(250)),
                }),
                http: Some(HttpSettings {
                    http1_max_pending_requests: Some(10),
                    http2_max_requests: Some(1000),
                    max_requests_per_connection: Some(4),
                    max_retries: Some(3),
                }),
            }),
            outlier_detection: Some(policy::OutlierDetection {
                http: Some(HttpOutlierDetection {
                    consecutive_errors: Some(5),
                    interval: Some(Duration::from_secs(10)),
                    base_ejection_time: Some(Duration::from_secs(30)),
                    max_ejection_percent: Some(50),
                }),
            }),
            load_balancer: Some(SimpleLb::LeastConn.into()),
            tls: Some(TlsSettings {
                mode: TlsMode::Simple,
                ca_certificates: "/etc/certs/root.pem".to_string(),
                subject_alt_names: vec!["spiffe://cluster.local/ns/default/sa/a".to_string()],
                sni: "a.default.svc".to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn absent_policy_is_a_noop() {
        let mut c = cluster(DiscoveryType::Eds);
        apply_traffic_policy(&mut c, Some(&full_policy()));
        let applied = c.clone();

        apply_traffic_policy(&mut c, None);
        assert_eq!(c, applied);

        apply_traffic_policy(&mut c, Some(&TrafficPolicy::default()));
        assert_eq!(c, applied);
    }

    #[test]
    fn applies_every_category() {
        let mut c = cluster(DiscoveryType::Eds);
        apply_traffic_policy(&mut c, Some(&full_policy()));

        assert_eq!(c.connect_timeout, Duration::from_millis(250));
        assert_eq!(c.max_requests_per_connection, Some(4));
        assert_eq!(
            c.thresholds(),
            Some(&Thresholds {
                max_connections: Some(100),
                max_pending_requests: Some(10),
                max_requests: Some(1000),
                max_retries: Some(3),
            })
        );
        assert_eq!(
            c.outlier_detection,
            Some(OutlierDetection {
                consecutive_5xx: Some(5),
                interval: Some(Duration::from_secs(10)),
                base_ejection_time: Some(Duration::from_secs(30)),
                max_ejection_percent: Some(50),
            })
        );
        assert_eq!(c.lb_policy, LbPolicy::LeastRequest);
        assert_eq!(c.discovery_type(), DiscoveryType::Eds);

        let tls = c.tls_context.expect("tls context must be set");
        assert_eq!(tls.sni, "a.default.svc");
        assert!(tls.common_tls_context.tls_certificates.is_empty());
        assert_eq!(
            tls.common_tls_context.validation_context,
            Some(CertificateValidationContext {
                trusted_ca: DataSource::Filename("/etc/certs/root.pem".to_string()),
                verify_subject_alt_name: vec!["spiffe://cluster.local/ns/default/sa/a".to_string()],
            })
        );
    }

    #[test]
    fn connection_pool_is_idempotent() {
        let policy = full_policy();
        let mut once = cluster(DiscoveryType::Eds);
        apply_traffic_policy(&mut once, Some(&policy));

        let mut twice = once.clone();
        apply_traffic_policy(&mut twice, Some(&policy));
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_values_do_not_override() {
        let mut c = cluster(DiscoveryType::Eds);
        c.connect_timeout = Duration::from_secs(1);
        let policy = TrafficPolicy {
            connection_pool: Some(ConnectionPoolSettings {
                tcp: Some(TcpSettings {
                    max_connections: Some(0),
                    connect_timeout: Some(Duration::ZERO),
                }),
                http: Some(HttpSettings {
                    http1_max_pending_requests: Some(0),
                    http2_max_requests: Some(0),
                    max_requests_per_connection: Some(0),
                    max_retries: Some(0),
                }),
            }),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));

        assert_eq!(c.connect_timeout, Duration::from_secs(1));
        assert_eq!(c.max_requests_per_connection, None);
        assert_eq!(c.thresholds(), Some(&Thresholds::default()));
    }

    #[test]
    fn connection_pool_replaces_prior_thresholds() {
        let mut c = cluster(DiscoveryType::Eds);
        apply_traffic_policy(&mut c, Some(&full_policy()));
        apply_traffic_policy(&mut c, Some(&tcp_pool(20)));

        // The later policy carries no HTTP settings, so the HTTP thresholds are
        // erased rather than merged.
        assert_eq!(
            c.thresholds(),
            Some(&Thresholds {
                max_connections: Some(20),
                ..Default::default()
            })
        );
        // Set on the cluster rather than the thresholds, so it survives.
        assert_eq!(c.max_requests_per_connection, Some(4));
    }

    #[test]
    fn outlier_detection_requires_http_settings() {
        let mut c = cluster(DiscoveryType::Eds);
        let policy = TrafficPolicy {
            outlier_detection: Some(policy::OutlierDetection { http: None }),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));
        assert_eq!(c.outlier_detection, None);

        let policy = TrafficPolicy {
            outlier_detection: Some(policy::OutlierDetection {
                http: Some(HttpOutlierDetection {
                    consecutive_errors: Some(0),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));
        assert_eq!(c.outlier_detection, Some(OutlierDetection::default()));
    }

    #[test]
    fn load_balancers() {
        for (simple, lb_policy) in [
            (SimpleLb::RoundRobin, LbPolicy::RoundRobin),
            (SimpleLb::LeastConn, LbPolicy::LeastRequest),
            (SimpleLb::Random, LbPolicy::Random),
        ] {
            let mut c = cluster(DiscoveryType::StrictDns);
            apply_load_balancer(&mut c, Some(&simple.into()));
            assert_eq!(c.lb_policy, lb_policy, "{simple:?}");
            assert_eq!(c.discovery_type(), DiscoveryType::StrictDns, "{simple:?}");
        }
    }

    #[test]
    fn passthrough_forces_original_dst_discovery() {
        let mut c = cluster(DiscoveryType::StrictDns);
        let policy = TrafficPolicy {
            load_balancer: Some(SimpleLb::Passthrough.into()),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));

        assert_eq!(c.lb_policy, LbPolicy::OriginalDstLb);
        assert_eq!(c.discovery_type(), DiscoveryType::OriginalDst);
    }

    #[test]
    fn mutual_tls_presents_client_certificates() {
        let mut c = cluster(DiscoveryType::Eds);
        let policy = TrafficPolicy {
            tls: Some(TlsSettings {
                mode: TlsMode::Mutual,
                client_certificate: "/etc/certs/cert-chain.pem".to_string(),
                private_key: "/etc/certs/key.pem".to_string(),
                ca_certificates: "/etc/certs/root.pem".to_string(),
                subject_alt_names: vec![],
                sni: String::new(),
            }),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));

        let tls = c.tls_context.expect("tls context must be set");
        assert_eq!(
            tls.common_tls_context.tls_certificates,
            vec![TlsCertificate {
                certificate_chain: DataSource::Filename("/etc/certs/cert-chain.pem".to_string()),
                private_key: DataSource::Filename("/etc/certs/key.pem".to_string()),
            }]
        );
        assert!(tls.common_tls_context.validation_context.is_some());
    }

    #[test]
    fn disabled_tls_leaves_context_alone() {
        let mut c = cluster(DiscoveryType::Eds);
        apply_traffic_policy(&mut c, Some(&full_policy()));
        let tls = c.tls_context.clone();
        assert!(tls.is_some());

        let policy = TrafficPolicy {
            tls: Some(TlsSettings::default()),
            ..Default::default()
        };
        apply_traffic_policy(&mut c, Some(&policy));
        assert_eq!(c.tls_context, tls);
    }
}
