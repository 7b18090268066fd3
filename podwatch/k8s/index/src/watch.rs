use crate::{metrics::Metrics, pod, SharedIndex};
use anyhow::Result;
use futures::prelude::*;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, ListParams, WatchEvent, WatchParams},
    ResourceExt,
};
use tokio::time;
use tracing::{debug, info, trace, warn};

/// Delay before starting a new cycle after the snapshot or the watch stream
/// fails.
const RESYNC_DELAY: time::Duration = time::Duration::from_secs(5);

/// Limits the amount of time a watch can be idle before the API server closes
/// it. Must be less than 295 or Kubernetes throws an error.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Keeps the shared index converged with the cluster's pods.
///
/// Each cycle lists all pods into the index and then consumes a watch stream
/// resumed from the snapshot's resource version, applying each event as it
/// arrives. When the list fails or the stream ends or errors, the task backs
/// off and starts a fresh cycle. The index is never cleared between cycles; a
/// new snapshot re-applies current records over whatever is present.
pub struct Watcher {
    api: Api<Pod>,
    index: SharedIndex,
    metrics: Metrics,
}

// === impl Watcher ===

impl Watcher {
    pub fn new(client: kube::Client, index: SharedIndex, metrics: Metrics) -> Self {
        Self {
            api: Api::all(client),
            index,
            metrics,
        }
    }

    /// Drives synchronization cycles for the life of the process. Failures
    /// are logged and retried; this never returns.
    pub async fn run(self) {
        loop {
            if let Err(error) = self.synchronize().await {
                warn!(%error, "Synchronization interrupted");
            }
            debug!(delay = ?RESYNC_DELAY, "Waiting to resynchronize");
            time::sleep(RESYNC_DELAY).await;
        }
    }

    async fn synchronize(&self) -> Result<()> {
        let version = self.snapshot().await?;
        self.watch(&version).await
    }

    /// Lists all pods and folds them into the index, returning the
    /// collection's resource version so the watch resumes where the snapshot
    /// left off. If the list fails the index is left untouched.
    async fn snapshot(&self) -> Result<String> {
        let pods = self.api.list(&ListParams::default()).await?;
        let version = pods.metadata.resource_version.unwrap_or_default();
        Self::populate(&self.index, &self.metrics, pods.items);
        info!(pods = self.index.read().len(), "Snapshot applied");
        Ok(version)
    }

    /// Consumes watch events until the stream ends (e.g. the server-side
    /// timeout elapses) or fails.
    async fn watch(&self, version: &str) -> Result<()> {
        let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let mut events = self.api.watch(&params, version).await?.boxed();
        while let Some(event) = events.try_next().await? {
            Self::process(&self.index, &self.metrics, event)?;
        }
        info!("Watch stream ended");
        Ok(())
    }

    /// Applies a snapshot's pods under a single write-lock hold so readers
    /// never observe a partially-applied snapshot.
    pub(crate) fn populate(index: &SharedIndex, metrics: &Metrics, pods: Vec<Pod>) {
        {
            let mut index = index.write();
            for pod in pods {
                if let Some(meta) = pod::extract(pod) {
                    index.apply(meta);
                }
            }
        }
        metrics.resync();
        metrics.set_size(index.read().len());
    }

    /// Folds one watch event into the index. Events for pods without an
    /// address are skipped; a watch error ends the stream.
    pub(crate) fn process(
        index: &SharedIndex,
        metrics: &Metrics,
        event: WatchEvent<Pod>,
    ) -> Result<()> {
        match event {
            WatchEvent::Added(pod) | WatchEvent::Modified(pod) => {
                let namespace = pod.namespace().unwrap_or_default();
                let name = pod.name_any();
                match pod::extract(pod) {
                    Some(meta) => {
                        debug!(%namespace, %name, ip = %meta.pod_ip, "Applying pod");
                        index.write().apply(meta);
                        metrics.apply();
                    }
                    None => trace!(%namespace, %name, "Skipping pod without an address"),
                }
            }

            WatchEvent::Deleted(pod) => {
                let namespace = pod.namespace().unwrap_or_default();
                let name = pod.name_any();
                match pod::extract(pod) {
                    Some(meta) => {
                        if index.write().delete(&meta.pod_ip).is_some() {
                            debug!(%namespace, %name, ip = %meta.pod_ip, "Deleted pod");
                        }
                        metrics.delete();
                    }
                    None => trace!(%namespace, %name, "Skipping pod without an address"),
                }
            }

            WatchEvent::Bookmark(_) => {}

            WatchEvent::Error(error) => return Err(error.into()),
        }

        metrics.set_size(index.read().len());
        Ok(())
    }
}
