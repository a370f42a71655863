//! Unified error type.

use crate::method::MethodMatcher;
use crate::retry::RetryError;

/// The error type returned by gantry's fallible operations.
///
/// Routing misses and handler failures are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup failures: a route table that cannot be built, a socket that cannot
/// be bound, or a logger that cannot be installed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A route pattern is malformed or collides with one already registered
    /// under the same method.
    #[error("cannot register {method} {path}: {source}")]
    Route {
        method: MethodMatcher,
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("endpoint {service}.{endpoint}: invalid method `{method}`")]
    InvalidMethod {
        service: String,
        endpoint: String,
        method: String,
    },

    #[error("endpoint {service}.{endpoint} declares no methods")]
    NoMethods { service: String, endpoint: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("could not setup logging: {0}")]
    LogSocket(#[source] RetryError<std::io::Error>),
}
