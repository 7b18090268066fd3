use crate::{
    api,
    index::{Index, Metrics, Watcher},
    PodDiscover,
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "podwatch", about = "Watches pods and answers IP reverse lookups")]
pub struct Args {
    #[clap(long, default_value = "podwatch=info,warn", env = "PODWATCH_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Address of the pod query API server.
    #[clap(long, default_value = "0.0.0.0:8080", env = "PODWATCH_API_ADDR")]
    api_addr: SocketAddr,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            api_addr,
        } = self;

        let mut prom = <Registry>::default();
        let metrics = Metrics::register(prom.sub_registry_with_prefix("pod_index"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let index = Index::shared();

        // Keep the index converged with the cluster in the background; the
        // API answers from whatever is currently indexed.
        let watcher = Watcher::new(runtime.client(), index.clone(), metrics);
        tokio::spawn(watcher.run().instrument(info_span!("pods")));

        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!(addr = %api_addr, "Pod query API listening");
        tokio::spawn(
            api::serve(listener, PodDiscover::new(index), runtime.shutdown_handle())
                .instrument(info_span!("api")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait
        // for the background tasks to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
