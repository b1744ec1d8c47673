//! Custom routes.
//!
//! Most prototype pages need no route at all: auto-routing finds the
//! template. Register a route when a page needs logic, such as branching on an
//! answer.
//!
//! # Lookup
//!
//! Routes live in one radix tree per HTTP method, a
//! `HashMap<Method, matchit::Router<BoxedHandler>>`. A request first picks
//! its method's tree (a miss means no route for that method at all), then
//! walks the tree along the path, so lookup is O(path-length) whatever the
//! number of routes. `{name}` segments are captured on the way down and land
//! in [`Request::param`](crate::Request::param).
//!
//! ```text
//! POST /where-do-you-live
//!        ↓ routes[POST]
//! radix tree walk  "/where-do-you-live"
//!        ↓ hit
//! (Arc<dyn ErasedHandler>, params)   ← one Arc clone
//!        ↓ miss
//! None: the pipeline moves on to auto-routing
//! ```
//!
//! The router runs after auto-store-data and the locals hooks, so a handler
//! already sees this request's answers in the session. Conflicting routes
//! are a programming error and panic at registration, before any request
//! is served.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};

/// Custom routes, consulted after auto-store-data and before auto-routing.
///
/// ```rust,no_run
/// use protokit::{Flow, Request, Response, Router};
///
/// async fn where_do_you_live(req: Request) -> Flow {
///     let next = match req.session().get("country").and_then(|v| v.as_str()) {
///         Some("England") => "/england",
///         _ => "/ineligible",
///     };
///     Flow::respond(req, Response::redirect(next))
/// }
///
/// let routes = Router::new().post("/where-do-you-live", where_do_you_live);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
