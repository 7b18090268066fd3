use crate::core::DiscoverPods;
use bytes::Bytes;
use futures::future;
use hyper::{http, Request, Response};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    service::TowerToHyperService,
};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, trace, warn};

type Body = http_body_util::Full<Bytes>;

/// Serves the pod lookup endpoints.
///
/// All responses are JSON. Queries are answered from the live index; a query
/// against a momentarily-stale index simply reflects what is currently
/// present, never an error about staleness.
#[derive(Clone, Debug)]
pub(crate) struct Api<T> {
    discover: T,
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),
}

/// Accepts connections until shutdown is signaled, serving each on its own
/// task.
pub(crate) async fn serve<T>(listener: TcpListener, discover: T, drain: drain::Watch)
where
    T: DiscoverPods + Clone + Send + Sync + 'static,
{
    let shutdown = drain.signaled();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            release = &mut shutdown => {
                debug!("Shutdown signaled; closing the API listener");
                drop(release);
                return;
            }

            accepted = listener.accept() => {
                let (stream, client_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(error) => {
                        warn!(%error, "Failed to accept a connection");
                        continue;
                    }
                };

                let svc = TowerToHyperService::new(Api::new(discover.clone()));
                tokio::spawn(async move {
                    let server = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    if let Err(error) = server
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        debug!(client.addr = %client_addr, %error, "Connection closed");
                    }
                });
            }
        }
    }
}

// === impl Api ===

impl<T> Api<T> {
    pub(crate) fn new(discover: T) -> Self {
        Self { discover }
    }
}

impl<T, B> tower::Service<Request<B>> for Api<T>
where
    T: DiscoverPods + Clone + Send + Sync + 'static,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), uri = %req.uri());

        if req.method() != http::Method::GET {
            return Box::pin(future::ready(json_error(
                http::StatusCode::METHOD_NOT_ALLOWED,
                "method not allowed",
            )));
        }

        let discover = self.discover.clone();
        let uri = req.uri().clone();
        Box::pin(async move {
            match uri.path() {
                "/health" => health(&discover).await,
                "/ready" => ready(&discover).await,
                "/pod" => pod_by_ip(&discover, uri.query()).await,
                "/pods" => pods(&discover, uri.query()).await,
                _ => json_error(http::StatusCode::NOT_FOUND, "not found"),
            }
        })
    }
}

async fn health<T>(discover: &T) -> Result<Response<Body>, Error>
where
    T: DiscoverPods,
{
    match discover.pod_count().await {
        Ok(count) => json_response(
            http::StatusCode::OK,
            &json!({"status": "healthy", "pod_count": count}),
        ),
        Err(error) => {
            warn!(%error, "Lookup failed");
            json_error(http::StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

/// Reports ready once the index has been populated, so that traffic is not
/// routed here before the first snapshot lands.
async fn ready<T>(discover: &T) -> Result<Response<Body>, Error>
where
    T: DiscoverPods,
{
    match discover.pod_count().await {
        Ok(0) => json_response(
            http::StatusCode::SERVICE_UNAVAILABLE,
            &json!({"status": "not ready", "pod_count": 0}),
        ),
        Ok(count) => json_response(
            http::StatusCode::OK,
            &json!({"status": "ready", "pod_count": count}),
        ),
        Err(error) => {
            warn!(%error, "Lookup failed");
            json_error(http::StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

async fn pod_by_ip<T>(discover: &T, query: Option<&str>) -> Result<Response<Body>, Error>
where
    T: DiscoverPods,
{
    let Some(ip) = query_param(query, "ip") else {
        return json_error(http::StatusCode::BAD_REQUEST, "IP parameter is required");
    };

    let ip = match ip.parse() {
        Ok(ip) => ip,
        Err(_) => {
            return json_error(
                http::StatusCode::BAD_REQUEST,
                &format!("Invalid IP address {ip}"),
            )
        }
    };

    match discover.pod_by_ip(ip).await {
        Ok(Some(meta)) => json_response(http::StatusCode::OK, &meta),
        Ok(None) => json_error(
            http::StatusCode::NOT_FOUND,
            &format!("No pod found with IP {ip}"),
        ),
        Err(error) => {
            warn!(%error, "Lookup failed");
            json_error(http::StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

async fn pods<T>(discover: &T, query: Option<&str>) -> Result<Response<Body>, Error>
where
    T: DiscoverPods,
{
    let namespace = query_param(query, "namespace").map(String::from);
    match discover.pods(namespace).await {
        Ok(records) => {
            let count = records.len();
            let pods = records
                .into_iter()
                .map(|meta| Ok((meta.pod_ip.to_string(), serde_json::to_value(&meta)?)))
                .collect::<Result<serde_json::Map<_, _>, serde_json::Error>>()?;
            json_response(http::StatusCode::OK, &json!({"pods": pods, "count": count}))
        }
        Err(error) => {
            warn!(%error, "Lookup failed");
            json_error(http::StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        }
    }
}

/// Returns the raw value of `name` within the query string, if present.
fn query_param<'q>(query: Option<&'q str>, name: &str) -> Option<&'q str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == name).then_some(v))
}

fn json_response<T: serde::Serialize>(
    status: http::StatusCode,
    value: &T,
) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(value)?;
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::new(bytes.into()))
        .map_err(Into::into)
}

fn json_error(status: http::StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json_response(status, &json!({"error": message}))
}
