//! Service and endpoint declarations.
//!
//! These values are produced by the code generator (or by hand in tests) and
//! handed to [`Server::setup`](crate::Server::setup). They are plain data:
//! nothing here validates. Method tokens and route patterns are checked
//! when setup registers them, before any socket is opened.

use std::fmt;

use crate::handler::{BoxedHandler, Handler};

/// Every service the process serves, in declaration order.
#[derive(Default)]
pub struct ServerConfig {
    pub services: Vec<ServiceConfig>,
}

impl ServerConfig {
    pub fn new(services: impl IntoIterator<Item = ServiceConfig>) -> Self {
        Self { services: services.into_iter().collect() }
    }
}

/// A named service and its endpoints.
pub struct ServiceConfig {
    pub name: String,
    pub endpoints: Vec<EndpointConfig>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, endpoints: impl IntoIterator<Item = EndpointConfig>) -> Self {
        Self { name: name.into(), endpoints: endpoints.into_iter().collect() }
    }
}

/// One endpoint: where it lives, which methods it answers, who handles it.
///
/// `methods` holds raw tokens. `"*"` declares an any-method endpoint.
pub struct EndpointConfig {
    pub name: String,
    pub path: String,
    pub methods: Vec<String>,
    pub handler: BoxedHandler,
}

impl EndpointConfig {
    pub fn new<M, S>(name: impl Into<String>, path: impl Into<String>, methods: M, handler: impl Handler) -> Self
    where
        M: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            path: path.into(),
            methods: methods.into_iter().map(Into::into).collect(),
            handler: handler.into_boxed_handler(),
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
