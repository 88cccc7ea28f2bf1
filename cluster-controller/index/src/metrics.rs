use super::SharedIndex;
use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{gauge::ConstGauge, MetricType},
    registry::Registry,
};

#[derive(Debug)]
struct Instrumented(SharedIndex);

pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let this = self.0.read();

        for (name, help, size) in [
            (
                "service_index_size",
                "The number of entries in the service index",
                this.services.len(),
            ),
            (
                "instance_index_size",
                "The number of entries in the service instance index",
                this.instances.len(),
            ),
            (
                "destination_rule_index_size",
                "The number of entries in the destination rule index",
                this.rules.values().map(Vec::len).sum(),
            ),
            (
                "management_port_index_size",
                "The number of workload addresses with management ports",
                this.management_ports.len(),
            ),
        ] {
            let gauge_encoder = encoder.encode_descriptor(name, help, None, MetricType::Gauge)?;
            ConstGauge::new(size as i64).encode(gauge_encoder)?;
        }

        Ok(())
    }
}
