//! Radix-tree route table.
//!
//! One tree per [`MethodMatcher`]. The wildcard is just another key, so an
//! any-method lookup walks exactly the same machinery as an exact one. The
//! table is built once during setup and never mutated afterwards, which is
//! what lets every connection task read it without a lock.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::MethodMatcher;

/// One registered (method, pattern) pair, in the form it was inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: MethodMatcher,
    pub pattern: String,
}

/// The route table.
pub struct Router {
    trees: HashMap<MethodMatcher, MatchitRouter<Target>>,
    entries: Vec<RouteEntry>,
}

/// What a tree leaf holds.
struct Target {
    handler: BoxedHandler,
    /// Name of a catch-all written `*name`. Its value keeps the leading `/`,
    /// and an empty remainder matches as `"/"`.
    rooted: Option<String>,
}

impl Router {
    pub fn new() -> Self {
        Self { trees: HashMap::new(), entries: Vec::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics where [`Router::register`] would return an error. Use
    /// `register` when the routes come from configuration.
    pub fn on(mut self, method: MethodMatcher, path: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.register(method, path, handler.into_boxed_handler()) {
            panic!("{e}");
        }
        self
    }

    /// Inserts a binding.
    ///
    /// Parameters are written `{name}` or `:name`. A trailing catch-all is
    /// either `{*name}`, capturing the non-empty remainder after the last
    /// `/`, or `*name`, capturing the remainder including its leading `/`
    /// (so `/files/*rest` matches `/files/` with `rest = "/"`).
    ///
    /// Registering a pattern that collides with an existing one under the
    /// same matcher fails; nothing is overwritten.
    pub fn register(
        &mut self,
        method: MethodMatcher,
        path: &str,
        handler: BoxedHandler,
    ) -> Result<(), Error> {
        let pattern = normalize_pattern(path);
        let err = |source: matchit::InsertError| Error::Route {
            method: method.clone(),
            path: path.to_owned(),
            source,
        };

        let tree = self.trees.entry(method.clone()).or_default();
        let rooted = pattern.rooted.as_ref().map(|r| r.name.clone());
        tree.insert(pattern.route.as_ref(), Target { handler: Arc::clone(&handler), rooted })
            .map_err(err)?;
        if let Some(r) = pattern.rooted {
            if let Err(e) = tree.insert(r.bare_route, Target { handler, rooted: Some(r.name) }) {
                tree.remove(pattern.route.as_ref());
                return Err(err(e));
            }
        }

        self.entries.push(RouteEntry { method, pattern: pattern.route.into_owned() });
        Ok(())
    }

    /// Finds the handler bound to `path` under exactly this matcher.
    ///
    /// No fallback happens here: a miss under `Exact` does not consult `Any`.
    pub fn lookup(
        &self,
        method: &MethodMatcher,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.trees.get(method)?;
        let matched = tree.at(path).ok()?;
        let target = matched.value;
        let mut params: HashMap<String, String> = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        if let Some(name) = &target.rooted {
            let rest = params.remove(name).unwrap_or_default();
            params.insert(name.clone(), format!("/{rest}"));
        }
        Some((Arc::clone(&target.handler), params))
    }

    /// Every registration, in insertion order.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.entries
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// A route pattern in matchit syntax.
struct Pattern<'a> {
    route: Cow<'a, str>,
    rooted: Option<RootedCatchAll>,
}

/// A trailing `*name`: matchit's `{*name}` never matches an empty
/// remainder, so the bare prefix is registered alongside it.
struct RootedCatchAll {
    name: String,
    bare_route: String,
}

/// Rewrites `:name` and `*name` segments into matchit's `{name}` and
/// `{*name}` syntax. Patterns already in brace form pass through unchanged.
fn normalize_pattern(path: &str) -> Pattern<'_> {
    if !path.split('/').any(|seg| seg.starts_with(':') || seg.starts_with('*')) {
        return Pattern { route: Cow::Borrowed(path), rooted: None };
    }

    let rooted = path.rsplit_once('/').and_then(|(prefix, last)| {
        last.strip_prefix('*').map(|name| RootedCatchAll {
            name: name.to_owned(),
            bare_route: format!("{}/", normalize_segments(prefix)),
        })
    });
    Pattern { route: Cow::Owned(normalize_segments(path)), rooted }
}

fn normalize_segments(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if let Some(name) = seg.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = seg.strip_prefix('*') {
                format!("{{*{name}}}")
            } else {
                seg.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
