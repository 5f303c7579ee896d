use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use server_comparison_core::{
    ApplicationDeployer, adjust_timeout,
    deployment::{DeployError, Deployment, ServerHandle},
    net,
    params::{DeploymentParameters, ServerVariant},
    readiness::wait_for_http_ready,
    shutdown::ShutdownSignal,
    timeouts,
};
use tokio::{
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::SelfHostDeployer;

const MAX_PROXY_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A self-hosted site fronted by an in-process reverse proxy bound to the
/// requested base URL, standing in for a native-module-behind-a-gateway
/// topology. Callers only ever see the proxy address.
#[derive(Clone, Debug, Default)]
pub struct ReverseProxyDeployer {
    backend: SelfHostDeployer,
}

impl ReverseProxyDeployer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApplicationDeployer for ReverseProxyDeployer {
    async fn deploy(&self, params: &DeploymentParameters) -> Result<Deployment, DeployError> {
        let base_url = params.application_base_uri_hint().clone();
        let proxy_addr =
            net::socket_addr_for(&base_url).ok_or_else(|| DeployError::InvalidBaseUri {
                url: base_url.clone(),
            })?;

        let backend_port = net::get_available_tcp_port().ok_or(DeployError::NoFreePort)?;
        let mut backend_url = base_url.clone();
        backend_url
            .set_host(Some("127.0.0.1"))
            .map_err(|_| DeployError::InvalidBaseUri {
                url: base_url.clone(),
            })?;
        backend_url
            .set_port(Some(backend_port))
            .map_err(|()| DeployError::InvalidBaseUri {
                url: base_url.clone(),
            })?;

        let backend_params = DeploymentParameters::new(
            params.application_path().clone(),
            ServerVariant::SelfHost,
            params.runtime_flavor(),
            params.architecture(),
            backend_url.clone(),
            params.environment_name(),
        );

        debug!(backend = %backend_url, proxy = %base_url, "deploying proxied backend");
        let backend = self.backend.deploy(&backend_params).await?;

        // The proxy is only alive while its backend is: when the backend's
        // own host-shutdown fires (e.g. its site process died), the outer
        // handle's token must fire too.
        let signal = ShutdownSignal::new();
        let mut backend_token = backend.host_shutdown_token();
        let forwarded = signal.clone();
        tokio::spawn(async move {
            backend_token.cancelled().await;
            debug!("backend host shut down; firing proxy shutdown signal");
            forwarded.fire();
        });

        let listener = TcpListener::bind(proxy_addr)
            .await
            .map_err(|source| DeployError::Bind {
                addr: proxy_addr.to_string(),
                source,
            });
        let listener = match listener {
            Ok(listener) => listener,
            Err(err) => {
                let mut backend = backend;
                backend.stop().await;
                return Err(err);
            }
        };

        let state = ProxyState {
            client: reqwest::Client::new(),
            upstream: backend_url,
        };
        let router = Router::new().fallback(forward).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serve_signal = signal.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                warn!(error = %err, "reverse proxy terminated with error");
            }
            // The proxy listener is gone either way.
            serve_signal.fire();
        });

        let handle = ReverseProxyHandle {
            task,
            shutdown_tx: Some(shutdown_tx),
            backend: Some(backend),
        };
        let mut deployment = Deployment::starting(base_url.clone(), signal, Box::new(handle));

        if let Err(source) = wait_for_http_ready(
            &base_url,
            adjust_timeout(timeouts::startup_timeout()),
            timeouts::readiness_poll_interval(),
        )
        .await
        {
            deployment.stop().await;
            return Err(DeployError::Readiness { source });
        }

        deployment.mark_ready();
        info!(url = %base_url, "reverse-proxied site deployed");
        Ok(deployment)
    }
}

#[derive(Clone)]
struct ProxyState {
    client: reqwest::Client,
    upstream: Url,
}

#[derive(Debug, thiserror::Error)]
enum ProxyError {
    #[error("failed to buffer request body: {0}")]
    Body(#[from] axum::Error),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("failed to assemble response: {0}")]
    Response(#[from] axum::http::Error),
}

async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    match proxy_request(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "proxying request failed");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn proxy_request(state: &ProxyState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let mut upstream = state.upstream.clone();
    upstream.set_path(parts.uri.path());
    upstream.set_query(parts.uri.query());

    let body = axum::body::to_bytes(body, MAX_PROXY_BODY_BYTES).await?;

    let mut builder = state.client.request(parts.method, upstream);
    for (name, value) in &parts.headers {
        if name != header::HOST {
            builder = builder.header(name, value);
        }
    }

    let upstream_response = builder.body(body).send().await?;

    let mut response = Response::builder().status(upstream_response.status());
    if let Some(headers) = response.headers_mut() {
        headers.extend(
            upstream_response
                .headers()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
    }
    let bytes = upstream_response.bytes().await?;

    Ok(response.body(Body::from(bytes))?)
}

struct ReverseProxyHandle {
    task: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    backend: Option<Deployment>,
}

#[async_trait]
impl ServerHandle for ReverseProxyHandle {
    async fn stop(&mut self, grace: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if timeout(grace, &mut self.task).await.is_err() {
            warn!("proxy shutdown overran the grace period; aborting proxy task");
            self.task.abort();
        }

        if let Some(mut backend) = self.backend.take() {
            backend.stop().await;
        }
    }

    fn force_kill(&mut self) {
        self.task.abort();
        // Dropping the backend handle force-kills the site process.
        self.backend.take();
    }
}
