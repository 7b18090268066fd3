#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod pods;

pub use self::pods::{ContainerMeta, ContainerPort, DiscoverPods, PodCondition, PodMeta};
