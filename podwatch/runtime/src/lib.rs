#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use podwatch_core as core;
pub use podwatch_k8s_index as index;

mod api;
mod args;

pub use self::args::Args;

use self::core::{DiscoverPods, PodMeta};
use std::net::IpAddr;

/// Answers query-API lookups from the shared index.
#[derive(Clone, Debug)]
struct PodDiscover(index::SharedIndex);

// === impl PodDiscover ===

impl PodDiscover {
    fn new(index: index::SharedIndex) -> Self {
        Self(index)
    }
}

#[async_trait::async_trait]
impl DiscoverPods for PodDiscover {
    async fn pod_by_ip(&self, ip: IpAddr) -> anyhow::Result<Option<PodMeta>> {
        Ok(self.0.read().lookup(&ip))
    }

    async fn pods(&self, namespace: Option<String>) -> anyhow::Result<Vec<PodMeta>> {
        Ok(self.0.read().pods(namespace.as_deref()))
    }

    async fn pod_count(&self) -> anyhow::Result<usize> {
        Ok(self.0.read().len())
    }
}
