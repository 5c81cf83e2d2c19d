//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (admission, request ID,
//!   timeout, tracing)
//! - Dispatch requests to the route table
//! - Forward requests to upstream targets via a shared hyper client
//! - Serve plain HTTP or TLS depending on the listener config

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::{GatewayConfig, TlsConfig};
use crate::http::middleware::rate_limit;
use crate::http::request_id;
use crate::http::routes::RouteTable;
use crate::observability::metrics;
use crate::ratelimit::IpLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub client: Client<HttpConnector, Body>,
    pub limiter: Option<Arc<IpLimiter>>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server from configuration. The limiter, if any, is the one
    /// named by the listener config, already resolved by the caller.
    pub fn new(
        config: &GatewayConfig,
        limiter: Option<Arc<IpLimiter>>,
    ) -> Result<Self, url::ParseError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            routes,
            client,
            limiter,
        };
        let router = Self::build_router(config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(state, rate_limit::admit))
            .layer(middleware::from_fn(request_id::ensure_request_id))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server in tests without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server over plain HTTP on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(
                self.router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Main proxy handler: look up the route, rewrite the URI, forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(request_id::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let Some(route) = state.routes.match_request(&request) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, 404, "none", start);
        return (StatusCode::NOT_FOUND, "no matching route").into_response();
    };
    let route_name = route.name.clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route_name,
        "Proxying request"
    );

    let upstream = match route.upstream_uri(&path, request.uri().query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream URI rewrite failed");
            metrics::record_request(&method, 500, &route_name, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "bad upstream URI").into_response();
        }
    };

    let (parts, body) = request.into_parts();
    let mut upstream_req = Request::builder().method(parts.method).uri(upstream);
    if let Some(headers) = upstream_req.headers_mut() {
        *headers = parts.headers;
    }
    let upstream_req = match upstream_req.body(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream request build failed");
            metrics::record_request(&method, 500, &route_name, start);
            return (StatusCode::INTERNAL_SERVER_ERROR, "bad upstream request").into_response();
        }
    };

    match state.client.request(upstream_req).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(&method, status.as_u16(), &route_name, start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route_name, error = %e, "Upstream error");
            metrics::record_request(&method, 502, &route_name, start);
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
    }
}
