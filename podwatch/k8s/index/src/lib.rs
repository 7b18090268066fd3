//! Maintains a reverse-lookup index from pod IP addresses to pod metadata.
//!
//! A single `Watcher` task keeps the index converged with the cluster: each
//! cycle lists all pods into the index and then applies incremental watch
//! events until the stream ends or fails, backing off before starting over.
//! Query callers share the index through `SharedIndex` and only ever read;
//! the watch task owns the only write path.
//!
//! ```text
//! [ API server ] -> list/watch -> [ Watcher ] -> [ Index ] <- concurrent readers
//! ```
//!
//! The index is keyed by the address a pod most recently reported. The
//! stable identity of a pod is its namespace/name (or uid); an address can in
//! principle be reassigned, in which case the last record applied for that
//! address wins.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
pub mod metrics;
mod pod;
mod watch;

#[cfg(test)]
mod tests;

pub use self::{
    index::{Index, SharedIndex},
    metrics::Metrics,
    watch::Watcher,
};
