//! End-to-end dispatch over a real socket.

mod common;

use std::sync::Arc;

use gantry::{
    EndpointConfig, NOT_FOUND_BODY, PrometheusMetrics, Request, Response, ServerConfig,
    ServiceConfig,
};

use common::{TestServer, send};

async fn get_order(req: Request) -> Response {
    Response::text(format!("order {}", req.param("id").unwrap_or("?")))
}

async fn echo(req: Request) -> String {
    format!("{} {}", req.method(), String::from_utf8_lossy(req.body()))
}

async fn serve_file(req: Request) -> String {
    format!("file {}", req.param("path").unwrap_or(""))
}

async fn shadow(_: Request) -> &'static str {
    "user endpoint"
}

fn config() -> ServerConfig {
    ServerConfig::new([
        ServiceConfig::new("orders", [
            EndpointConfig::new("Get", "/orders/:id", ["GET"], get_order),
            EndpointConfig::new("Echo", "/orders.Echo", ["*"], echo),
            EndpointConfig::new("Files", "/static/*path", ["GET"], serve_file),
        ]),
        ServiceConfig::new("sneaky", [
            EndpointConfig::new("Shadow", "/__encore.ScrapeMetrics", ["*"], shadow),
        ]),
    ])
}

#[tokio::test]
async fn routes_exact_wildcard_and_catch_all() {
    let server = TestServer::start(&config(), Arc::new(PrometheusMetrics::new())).await;

    let res = send(server.addr, "GET", "/orders/42", "").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "order 42");

    let res = send(server.addr, "PUT", "/orders.Echo", "hello").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "PUT hello");

    let res = send(server.addr, "GET", "/static/css/site.css", "").await;
    assert_eq!(res.body, "file /css/site.css");

    let res = send(server.addr, "GET", "/static/", "").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "file /");

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_endpoint_is_counted_and_scraped() {
    let metrics = Arc::new(PrometheusMetrics::new());
    let server = TestServer::start(&config(), metrics.clone()).await;

    // Wrong method on an exact-only route is a miss too.
    let res = send(server.addr, "POST", "/orders/42", "").await;
    assert_eq!(res.status, 404);

    let res = send(server.addr, "POST", "/orders.Create", "").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(res.body, NOT_FOUND_BODY);

    let res = send(server.addr, "GET", "/__encore.ScrapeMetrics", "").await;
    assert_eq!(res.status, 200);
    assert_ne!(res.body, "user endpoint");
    assert!(res.body.contains("unknown_endpoint_total"));
    assert!(res.body.contains(r#"service="orders""#));
    assert!(res.body.contains(r#"endpoint="Create""#));
    assert!(res.body.contains(r#"service="unknown""#));

    server.shutdown().await;
}

#[tokio::test]
async fn escaped_paths_are_decoded_before_routing() {
    let metrics = Arc::new(PrometheusMetrics::new());
    let server = TestServer::start(&config(), metrics.clone()).await;

    let res = send(server.addr, "GET", "/orders/john%20doe", "").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "order john doe");

    let res = send(server.addr, "GET", "/__encore%2EScrapeMetrics", "").await;
    assert_eq!(res.status, 200);
    assert_ne!(res.body, "user endpoint");
    assert!(!metrics.render().contains("unknown_endpoint_total{"));

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_internal_api_is_plain_text() {
    let server = TestServer::start(&config(), Arc::new(PrometheusMetrics::new())).await;

    let res = send(server.addr, "GET", "/__encore.NotARealAPI", "").await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body, "unknown internal endpoint: NotARealAPI");
    assert!(res.header("content-type").unwrap().starts_with("text/plain"));

    server.shutdown().await;
}

#[tokio::test]
async fn concurrent_requests_share_one_table() {
    let server = TestServer::start(&config(), Arc::new(PrometheusMetrics::new())).await;
    let addr = server.addr;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..32 {
        tasks.spawn(async move {
            let res = send(addr, "GET", &format!("/orders/{i}"), "").await;
            assert_eq!(res.body, format!("order {i}"));
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    server.shutdown().await;
}
