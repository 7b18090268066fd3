use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Instruments the watch task's mutations of the index.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    index_size: Gauge,
    applies: Counter,
    deletes: Counter,
    resyncs: Counter,
}

// === impl Metrics ===

impl Metrics {
    pub fn register(prom: &mut Registry) -> Self {
        let metrics = Self::default();

        prom.register(
            "index_size",
            "Gauge of the number of pods in the index",
            metrics.index_size.clone(),
        );
        prom.register(
            "applies",
            "Count of pod records applied to the index",
            metrics.applies.clone(),
        );
        prom.register(
            "deletes",
            "Count of pod records deleted from the index",
            metrics.deletes.clone(),
        );
        prom.register(
            "resyncs",
            "Count of pod snapshots applied to the index",
            metrics.resyncs.clone(),
        );

        metrics
    }

    pub(crate) fn resync(&self) {
        self.resyncs.inc();
    }

    pub(crate) fn apply(&self) {
        self.applies.inc();
    }

    pub(crate) fn delete(&self) {
        self.deletes.inc();
    }

    pub(crate) fn set_size(&self, size: usize) {
        self.index_size.set(size as i64);
    }
}
