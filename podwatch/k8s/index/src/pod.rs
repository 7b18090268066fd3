use k8s_openapi::api::core::v1 as corev1;
use podwatch_core::{ContainerMeta, ContainerPort, PodCondition, PodMeta};

/// Extracts the indexable metadata from a pod.
///
/// Returns `None` for pods that do not carry a usable address (e.g. pods
/// that have not been scheduled yet); such pods cannot be looked up and are
/// not indexed. Extraction never fails: missing optional fields degrade to
/// empty values.
pub(crate) fn extract(pod: corev1::Pod) -> Option<PodMeta> {
    let corev1::Pod {
        metadata,
        spec,
        status,
    } = pod;

    let status = status?;
    // An empty or malformed address is indistinguishable from a missing one.
    let pod_ip = status.pod_ip.as_deref()?.parse().ok()?;

    let conditions = status
        .conditions
        .unwrap_or_default()
        .into_iter()
        .map(|c| PodCondition {
            type_: c.type_,
            status: c.status,
            reason: c.reason,
            message: c.message,
        })
        .collect();

    let (node_name, containers) = match spec {
        Some(spec) => (
            spec.node_name,
            spec.containers.into_iter().map(extract_container).collect(),
        ),
        None => (None, Vec::new()),
    };

    Some(PodMeta {
        name: metadata.name.unwrap_or_default(),
        namespace: metadata.namespace.unwrap_or_default(),
        uid: metadata.uid.unwrap_or_default(),
        labels: metadata.labels.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
        node_name,
        phase: status.phase,
        pod_ip,
        host_ip: status.host_ip.as_deref().and_then(|ip| ip.parse().ok()),
        start_time: status.start_time.map(|t| t.0),
        conditions,
        containers,
    })
}

fn extract_container(container: corev1::Container) -> ContainerMeta {
    ContainerMeta {
        name: container.name,
        image: container.image,
        ports: container
            .ports
            .into_iter()
            .flatten()
            .map(|p| ContainerPort {
                container_port: p.container_port,
                protocol: p.protocol.unwrap_or_else(|| "TCP".to_string()),
            })
            .collect(),
    }
}
