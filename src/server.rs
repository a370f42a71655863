//! Setup, listener and graceful shutdown.
//!
//! [`Server::setup`] turns the service declarations into a frozen route
//! table. Only after that succeeds is a socket bound, so a bad
//! configuration never accepts a single connection.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops `listener.accept()` immediately.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`].

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::method::MethodMatcher;
use crate::metrics::Metrics;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The fixed address [`Server::listen_and_serve`] binds.
pub const LISTEN_ADDR: &str = "127.0.0.1:8000";

/// A fully configured server, ready to accept connections.
pub struct Server {
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Registers every endpoint of every service.
    ///
    /// Each declared method becomes one route; `"*"` becomes an any-method
    /// route. Fails on the first invalid method token, empty method set, or
    /// colliding route. Logs one `registered endpoint` event per endpoint.
    pub fn setup(config: &ServerConfig, metrics: Arc<dyn Metrics>) -> Result<Self, Error> {
        let mut router = Router::new();

        for svc in &config.services {
            for ep in &svc.endpoints {
                info!(service = %svc.name, endpoint = %ep.name, path = %ep.path, "registered endpoint");

                if ep.methods.is_empty() {
                    return Err(Error::NoMethods {
                        service: svc.name.clone(),
                        endpoint: ep.name.clone(),
                    });
                }
                for token in &ep.methods {
                    let method: MethodMatcher = token.parse().map_err(|_| Error::InvalidMethod {
                        service: svc.name.clone(),
                        endpoint: ep.name.clone(),
                        method: token.clone(),
                    })?;
                    router.register(method, &ep.path, Arc::clone(&ep.handler))?;
                }
            }
        }

        debug!(routes = router.routes().len(), "route table ready");
        Ok(Self { dispatcher: Arc::new(Dispatcher::new(router, metrics)) })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binds [`LISTEN_ADDR`] and serves until a shutdown signal.
    pub async fn listen_and_serve(self) -> Result<(), Error> {
        let listener = TcpListener::bind(LISTEN_ADDR).await?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener until SIGTERM or Ctrl-C, then
    /// drains in-flight connections.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains in-flight connections.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr = listener.local_addr()?;
        info!(%addr, "gantry listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown is checked first so a signal stops accepting even
                // when more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { handle(&dispatcher, req).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set does not grow without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("gantry stopped");
        Ok(())
    }
}

/// Reads the body, dispatches, converts back for hyper.
///
/// Infallible: every failure becomes a response so hyper never sees an error.
async fn handle(
    dispatcher: &Dispatcher,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "could not read request body");
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .text("could not read request body")
                .into_http());
        }
    };

    let response = dispatcher.dispatch(Request::new(parts, body)).await;
    Ok(response.into_http())
}

/// Resolves on SIGTERM (Unix) or Ctrl-C, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, ServiceConfig};
    use crate::metrics::PrometheusMetrics;

    async fn noop(_: Request) -> Response {
        Response::text("ok")
    }

    fn metrics() -> Arc<dyn Metrics> {
        Arc::new(PrometheusMetrics::new())
    }

    #[test]
    fn setup_registers_every_method() {
        let config = ServerConfig::new([ServiceConfig::new("orders", [
            EndpointConfig::new("Create", "/orders.Create", ["POST"], noop),
            EndpointConfig::new("Get", "/orders/:id", ["GET", "HEAD"], noop),
            EndpointConfig::new("Raw", "/orders.Raw", ["*"], noop),
        ])]);
        let server = Server::setup(&config, metrics()).unwrap();
        let routes = server.dispatcher().router().routes();
        assert_eq!(routes.len(), 4);
        assert_eq!(routes[1].pattern, "/orders/{id}");
        assert!(routes[3].method.is_any());
    }

    #[test]
    fn setup_rejects_duplicate_routes_across_services() {
        let config = ServerConfig::new([
            ServiceConfig::new("a", [EndpointConfig::new("X", "/same", ["GET"], noop)]),
            ServiceConfig::new("b", [EndpointConfig::new("Y", "/same", ["GET"], noop)]),
        ]);
        let err = Server::setup(&config, metrics()).err().unwrap();
        assert!(matches!(err, Error::Route { ref path, .. } if path == "/same"));
    }

    #[test]
    fn setup_rejects_duplicate_wildcards() {
        let config = ServerConfig::new([ServiceConfig::new("a", [
            EndpointConfig::new("X", "/w", ["*"], noop),
            EndpointConfig::new("Y", "/w", ["*"], noop),
        ])]);
        assert!(matches!(Server::setup(&config, metrics()), Err(Error::Route { .. })));
    }

    #[test]
    fn setup_rejects_bad_method_sets() {
        let empty = ServerConfig::new([ServiceConfig::new("a", [
            EndpointConfig::new("X", "/x", Vec::<String>::new(), noop),
        ])]);
        assert!(matches!(Server::setup(&empty, metrics()), Err(Error::NoMethods { .. })));

        let invalid = ServerConfig::new([ServiceConfig::new("a", [
            EndpointConfig::new("X", "/x", ["G T"], noop),
        ])]);
        match Server::setup(&invalid, metrics()) {
            Err(Error::InvalidMethod { method, .. }) => assert_eq!(method, "G T"),
            _ => panic!("expected InvalidMethod"),
        }
    }
}
