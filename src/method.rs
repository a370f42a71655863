//! Method matchers for route registration.
//!
//! An endpoint declares the HTTP methods it answers to as string tokens. A
//! token is either a concrete method (`"GET"`, `"POST"`, or any valid
//! extension token) or the wildcard marker `"*"`, meaning "any method not
//! otherwise registered for this path".
//!
//! The wildcard is a variant of its own, never a reserved method name, so no
//! real verb can ever collide with it.

use std::fmt;
use std::str::FromStr;

use http::Method;

/// The literal token that declares an any-method endpoint.
pub const WILDCARD: &str = "*";

/// Which requests a route registration applies to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum MethodMatcher {
    /// Exactly this HTTP method.
    Exact(Method),
    /// Any method, consulted only after an exact-method miss.
    Any,
}

impl MethodMatcher {
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<Method> for MethodMatcher {
    fn from(method: Method) -> Self {
        Self::Exact(method)
    }
}

/// Returned when a method token is neither `"*"` nor a valid HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid method token `{0}`")]
pub struct InvalidMethod(pub String);

/// Parses a declared method token. Case-sensitive per RFC 9110 §9.1, so
/// `"get"` is an extension method distinct from `GET`.
impl FromStr for MethodMatcher {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            return Ok(Self::Any);
        }
        Method::from_bytes(s.as_bytes())
            .map(Self::Exact)
            .map_err(|_| InvalidMethod(s.to_owned()))
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(method) => f.write_str(method.as_str()),
            Self::Any => f.write_str(WILDCARD),
        }
    }
}
