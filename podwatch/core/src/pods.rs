use anyhow::Result;
use chrono::{offset::Utc, DateTime};
use std::{collections::BTreeMap, net::IpAddr};

/// Metadata describing a single pod, extracted at the moment the pod was last
/// observed.
///
/// A record exists only for pods that have been assigned an IP address; the
/// address is the key under which the record is indexed and looked up.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PodMeta {
    pub name: String,
    pub namespace: String,

    /// The pod's cluster-unique identifier. Unlike the namespace/name pair,
    /// this does not survive recreation.
    pub uid: String,

    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,

    /// The name of the node the pod is scheduled on, once assigned.
    pub node_name: Option<String>,

    pub phase: Option<String>,

    /// The pod's address and, when known, the address of its host node.
    pub pod_ip: IpAddr,
    pub host_ip: Option<IpAddr>,

    pub start_time: Option<DateTime<Utc>>,

    pub conditions: Vec<PodCondition>,
    pub containers: Vec<ContainerMeta>,
}

/// A single entry from the pod's status conditions.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PodCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

/// A container declared by the pod spec.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ContainerMeta {
    pub name: String,
    pub image: Option<String>,
    pub ports: Vec<ContainerPort>,
}

/// A port declared by a container.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ContainerPort {
    #[serde(rename = "containerPort")]
    pub container_port: i32,
    pub protocol: String,
}

/// The lookup surface the query layer uses to answer requests.
///
/// Implementations answer from the live index; a lookup against a
/// momentarily-stale index simply reflects whatever is currently present.
#[async_trait::async_trait]
pub trait DiscoverPods {
    async fn pod_by_ip(&self, ip: IpAddr) -> Result<Option<PodMeta>>;

    async fn pods(&self, namespace: Option<String>) -> Result<Vec<PodMeta>>;

    async fn pod_count(&self) -> Result<usize>;
}
