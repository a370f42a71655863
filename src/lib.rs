//! # gantry
//!
//! The request-dispatch front door of a generated backend runtime.
//!
//! Generated code declares services and their endpoints; gantry turns those
//! declarations into a route table, serves HTTP on a fixed local port, and
//! dispatches every request to the endpoint that owns it.
//!
//! ## Dispatch order
//!
//! 1. `/__encore.<Name>`: reserved internal APIs. `ScrapeMetrics` serves
//!    the metrics exposition; any other name is a plain-text 404.
//! 2. Exact method + path.
//! 3. Any-method (`"*"`) endpoint on the same path.
//! 4. Otherwise a JSON `unknown_endpoint` 404, counted by `service.api`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gantry::{EndpointConfig, PrometheusMetrics, Request, Response, Server, ServerConfig, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry::Error> {
//!     let config = ServerConfig::new([ServiceConfig::new("orders", [
//!         EndpointConfig::new("Get", "/orders/:id", ["GET"], get_order),
//!         EndpointConfig::new("Webhook", "/orders.Webhook", ["*"], webhook),
//!     ])]);
//!
//!     Server::setup(&config, Arc::new(PrometheusMetrics::new()))?
//!         .listen_and_serve()
//!         .await
//! }
//!
//! async fn get_order(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn webhook(req: Request) -> Response {
//!     Response::text(format!("got {}", req.method()))
//! }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod logging;
pub mod metrics;
pub mod retry;

pub use config::{EndpointConfig, ServerConfig, ServiceConfig};
pub use dispatch::{Dispatcher, INTERNAL_PREFIX, NOT_FOUND_BODY};
pub use error::Error;
pub use handler::{BoxedHandler, Handler};
pub use http::{Method, StatusCode};
pub use method::{InvalidMethod, MethodMatcher, WILDCARD};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{RouteEntry, Router};
pub use server::{LISTEN_ADDR, Server};

// `metrics` alone would be ambiguous with the extern crate of the same name.
pub use crate::metrics::{Metrics, PrometheusMetrics};
