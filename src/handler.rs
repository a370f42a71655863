//! Handler trait and type erasure.
//!
//! # How endpoint handlers are stored
//!
//! Every endpoint in a generated service has its own handler type, but the
//! route table keeps them all in one radix tree per method. Handlers are
//! therefore erased behind a trait object (`dyn ErasedHandler`) at
//! registration time:
//!
//! ```text
//! async fn create(req: Request) -> Response { … }   ← generated code
//!        ↓ EndpointConfig::new("Create", "/orders.Create", ["POST"], create)
//! create.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(Endpoint(create))                        ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time                ← one vtable dispatch
//! ```
//!
//! A lookup clones the `Arc` (one atomic increment) and makes one virtual
//! call. Nothing else is allocated for the handler on the hot path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` so tokio can move it between worker threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in
/// [`BoxedHandler`], which configuration values carry.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every connection task.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid endpoint handler.
///
/// Any `Fn(Request) -> impl Future<Output = impl IntoResponse>` qualifies,
/// including `async fn` items and closures. Sealed.
pub trait Handler: sealed::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod sealed {
    pub trait Sealed {}
}

impl<F, Fut> sealed::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Endpoint(self))
    }
}

/// An endpoint function behind the erased interface.
struct Endpoint<F>(F);

impl<F, Fut> ErasedHandler for Endpoint<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    fn call(&self, req: Request) -> BoxFuture {
        let pending = (self.0)(req);
        Box::pin(async move { pending.await.into_response() })
    }
}
