use crate::{
    cds::{Environment, Generator},
    core::{cluster::Cluster, service::Proxy},
    index::{SharedIndex, Snapshot},
    IndexDiscover,
};
use anyhow::{Context as _, Result};
use prometheus_client::registry::Registry;
use std::{future::Future, io::Write, path::PathBuf, time::Duration};
use tokio::time::MissedTickBehavior;

/// Everything a generation pass needs for a single proxy.
pub(crate) struct Controller {
    pub snapshot: PathBuf,
    pub index: SharedIndex,
    pub env: Environment<IndexDiscover, IndexDiscover, IndexDiscover>,
    pub generator: Generator,
    pub proxy: Proxy,
    pub prom: Registry,
}

pub(crate) fn load_snapshot(path: &std::path::Path) -> Result<Snapshot> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = Snapshot::from_json(&bytes)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(snapshot)
}

/// Writes `clusters` as a JSON array followed by a newline.
pub(crate) fn write_clusters<W: Write>(out: &mut W, clusters: &[Cluster]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, clusters)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

// === impl Controller ===

impl Controller {
    /// Generates clusters from the current index.
    pub fn generate_once<W: Write>(&self, out: &mut W) -> Result<()> {
        let clusters = self
            .generator
            .generate(&self.env, &self.proxy)
            .context("failed to generate clusters")?;
        write_clusters(out, &clusters)?;
        self.log_metrics();
        Ok(())
    }

    /// Reloads the snapshot and regenerates clusters on each tick of
    /// `interval`, writing them only when they differ from the last output.
    ///
    /// A snapshot that fails to load leaves the index unchanged. A pass that
    /// fails is skipped and retried on the next tick.
    pub async fn regenerate<W: Write>(
        &self,
        interval: Duration,
        out: &mut W,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let mut ticks = tokio::time::interval(interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut last = None::<Vec<Cluster>>;
        loop {
            tokio::select! {
                _ = ticks.tick() => {}
                () = &mut shutdown => {
                    tracing::info!("Shutting down");
                    return Ok(());
                }
            }

            match load_snapshot(&self.snapshot) {
                Ok(snapshot) => {
                    if let Err(error) = self.index.write().reset(snapshot) {
                        tracing::warn!(%error, "Ignoring invalid snapshot");
                    }
                }
                Err(error) => tracing::warn!(error = ?error, "Ignoring snapshot"),
            }

            let Some(clusters) = self.generator.generate(&self.env, &self.proxy) else {
                continue;
            };
            if last.as_ref() == Some(&clusters) {
                tracing::debug!("Clusters unchanged");
                continue;
            }

            write_clusters(out, &clusters)?;
            tracing::info!(clusters = clusters.len(), "Clusters updated");
            last = Some(clusters);
            self.log_metrics();
        }
    }

    fn log_metrics(&self) {
        let mut text = String::new();
        match prometheus_client::encoding::text::encode(&mut text, &self.prom) {
            Ok(()) => tracing::debug!(metrics = %text, "Metrics"),
            Err(error) => tracing::warn!(%error, "Failed to encode metrics"),
        }
    }
}
