use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use podwatch_core::PodMeta;
use std::{net::IpAddr, sync::Arc};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Maps pod IP addresses to extracted pod metadata.
///
/// Owned and updated by the single watch task; shared with an arbitrary
/// number of concurrent query callers. Every access goes through the one
/// `RwLock` so that reads always observe a whole record and a consistent
/// count. Mutations are pure in-memory operations; the lock is never held
/// across I/O.
#[derive(Debug, Default)]
pub struct Index {
    by_ip: HashMap<IpAddr, PodMeta>,
}

// === impl Index ===

impl Index {
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::default()))
    }

    /// Inserts or replaces the record at its address. The most recently
    /// applied record for an address wins.
    pub(crate) fn apply(&mut self, meta: PodMeta) {
        self.by_ip.insert(meta.pod_ip, meta);
    }

    /// Removes the record at the given address. Removing an absent address
    /// is a no-op.
    pub(crate) fn delete(&mut self, ip: &IpAddr) -> Option<PodMeta> {
        self.by_ip.remove(ip)
    }

    pub fn lookup(&self, ip: &IpAddr) -> Option<PodMeta> {
        self.by_ip.get(ip).cloned()
    }

    /// Returns a point-in-time copy of all records, optionally restricted to
    /// one namespace. Iteration order is not meaningful.
    pub fn pods(&self, namespace: Option<&str>) -> Vec<PodMeta> {
        self.by_ip
            .values()
            .filter(|meta| namespace.is_none_or(|ns| meta.namespace == ns))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ip.is_empty()
    }
}
