//! Request dispatch.
//!
//! Every request takes one of three paths:
//!
//! ```text
//! /__encore.<Name>   → internal API (never consults the route table)
//! /<anything else>   → route table: exact method, then any-method
//! no match           → unknown_endpoint counter + structured 404
//! ```
//!
//! The internal namespace is checked first, so no user endpoint can shadow
//! it no matter what path it registers.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use percent_encoding::percent_decode_str;
use tracing::error;

use crate::handler::BoxedHandler;
use crate::method::MethodMatcher;
use crate::metrics::{Metrics, encode};
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::router::Router;

/// Prefix of the reserved internal endpoint namespace, after the leading `/`.
pub const INTERNAL_PREFIX: &str = "__encore.";

/// Body of the 404 sent when no endpoint matches.
pub const NOT_FOUND_BODY: &str = r#"{
  "code": "unknown_endpoint",
  "message": "endpoint not found",
  "details": null
}
"#;

/// Labels recorded when the path carries no `service.api` shape.
const UNKNOWN_SERVICE: &str = "unknown";
const UNKNOWN_API: &str = "Unknown";

/// APIs served under [`INTERNAL_PREFIX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InternalApi {
    ScrapeMetrics,
}

impl InternalApi {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "ScrapeMetrics" => Some(Self::ScrapeMetrics),
            _ => None,
        }
    }
}

/// Routes requests to endpoint handlers.
///
/// Holds only immutable state plus a handle to the metrics backend, so one
/// instance is shared by every connection task.
pub struct Dispatcher {
    router: Router,
    metrics: Arc<dyn Metrics>,
}

impl Dispatcher {
    pub fn new(router: Router, metrics: Arc<dyn Metrics>) -> Self {
        Self { router, metrics }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Routes one request and produces its response.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        match self.route(&req) {
            Ok((handler, params)) => {
                req.set_params(params);
                handler.call(req).await
            }
            Err(res) => res,
        }
    }

    /// Resolves the handler for `req`, or the response that ends it early.
    ///
    /// Works on the percent-decoded path, so `%2E` reaches the internal
    /// namespace and parameters arrive decoded. Decoding borrows unless the
    /// path actually contains an escape.
    fn route(&self, req: &Request) -> Result<(BoxedHandler, HashMap<String, String>), Response> {
        let path = percent_decode_str(req.path()).decode_utf8_lossy();
        let endpoint = path.strip_prefix('/').unwrap_or(&*path);

        if let Some(name) = endpoint.strip_prefix(INTERNAL_PREFIX) {
            return Err(match InternalApi::from_name(name) {
                Some(InternalApi::ScrapeMetrics) => self.scrape_metrics(),
                None => Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .text(format!("unknown internal endpoint: {name}")),
            });
        }

        let exact = MethodMatcher::Exact(req.method().clone());
        self.router.lookup(&exact, &path)
            .or_else(|| self.router.lookup(&MethodMatcher::Any, &path))
            .ok_or_else(|| self.unknown_endpoint(endpoint))
    }

    fn unknown_endpoint(&self, endpoint: &str) -> Response {
        let (service, api) = split_endpoint(endpoint);
        self.metrics.unknown_endpoint(service, api);
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .json(NOT_FOUND_BODY)
    }

    fn scrape_metrics(&self) -> Response {
        let families = match self.metrics.gather() {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "could not gather metrics");
                return internal_error(format!("could not gather metrics: {e}"));
            }
        };

        let mut body = Vec::new();
        for family in &families {
            if let Err(e) = encode(family, &mut body) {
                error!(family = %family.name, error = %e, "could not encode metrics");
                return internal_error(format!("could not encode metrics: {e}"));
            }
        }
        Response::builder().bytes(ContentType::Prometheus, body)
    }
}

/// Best-effort `(service, api)` labels: split at the first `.`.
///
/// Applied to the whole path, so nested or parameterised paths yield odd
/// labels; dashboards already depend on this shape.
fn split_endpoint(endpoint: &str) -> (&str, &str) {
    endpoint.split_once('.').unwrap_or((UNKNOWN_SERVICE, UNKNOWN_API))
}

fn internal_error(msg: String) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text(msg)
}
