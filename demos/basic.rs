//! Minimal gantry example: two services, a wildcard endpoint, metrics.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8000/orders/42
//!   curl -X POST http://localhost:8000/orders.Create -d '{"item":"tea"}'
//!   curl -X PATCH http://localhost:8000/hooks.Receive
//!   curl http://localhost:8000/orders.Missing         # 404, counted
//!   curl http://localhost:8000/__encore.ScrapeMetrics

use std::sync::Arc;

use gantry::logging::{self, LogTarget};
use gantry::retry::RetryPolicy;
use gantry::{
    EndpointConfig, PrometheusMetrics, Request, Response, Server, ServerConfig, ServiceConfig,
    StatusCode,
};

#[tokio::main]
async fn main() -> Result<(), gantry::Error> {
    logging::init(LogTarget::Stderr, &RetryPolicy::default())?;

    let config = ServerConfig::new([
        ServiceConfig::new("orders", [
            EndpointConfig::new("Get", "/orders/:id", ["GET"], get_order),
            EndpointConfig::new("Create", "/orders.Create", ["POST"], create_order),
        ]),
        ServiceConfig::new("hooks", [
            EndpointConfig::new("Receive", "/hooks.Receive", ["*"], receive_hook),
        ]),
    ]);

    Server::setup(&config, Arc::new(PrometheusMetrics::new()))?
        .listen_and_serve()
        .await
}

// GET /orders/:id
async fn get_order(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","item":"tea"}}"#))
}

// POST /orders.Create
async fn create_order(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/orders/99")
        .json(r#"{"id":"99"}"#)
}

// Any method on /hooks.Receive
async fn receive_hook(req: Request) -> String {
    format!("received {} with {} bytes", req.method(), req.body().len())
}
