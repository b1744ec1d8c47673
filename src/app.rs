//! The kit pipeline, assembled.
//!
//! [`App::handle`] takes one `http::Request` and always produces one
//! `http::Response`. Nothing escapes as an error: failures end on the error
//! page. Stage order:
//!
//! ```text
//! session load → locals → [production: https redirect → password gate]
//!   → reset pages → session defaults → auto-store-data → session save
//!   → locals hooks → custom routes → POST-to-GET redirect → auto-routes
//!   → 404 page
//! ```
//!
//! The session is saved once more after the response is decided, so a custom
//! route's changes stick. The error page renders with the locals gathered up
//! to the last completed stage, so it still sees `data` and `currentPage`.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tracing::{Instrument, debug, warn};

use crate::config::Config;
use crate::error::{BoxError, Error};
use crate::handler::Flow;
use crate::middleware::authentication::{self, Authentication};
use crate::middleware::{
    auto_routes, auto_store_data, locals, pages, production_headers, redirect_post_to_get,
    reset_session_data, session_defaults, trace,
};
use crate::render::{Locals, Renderer, Templates};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::session::{self, MemoryStore, SessionStore};

/// Unwraps a [`Flow`], returning early from the pipeline if a stage answered.
macro_rules! next {
    ($flow:expr) => {
        match $flow {
            Flow::Continue(req) => req,
            Flow::Respond(req, res) => return Ok((req, res)),
        }
    };
}

/// Sets app-wide locals before custom routes and auto-routes run.
type LocalsHook = Box<dyn Fn(&mut Request) + Send + Sync>;

/// A configured prototype: templates, sessions, custom routes.
///
/// ```rust,no_run
/// use protokit::{App, Config, Router};
///
/// let app = App::new(Config::from_env().unwrap()).routes(Router::new());
/// ```
pub struct App {
    config: Config,
    renderer: Arc<dyn Renderer>,
    sessions: Arc<dyn SessionStore>,
    routes: Router,
    hooks: Vec<LocalsHook>,
    auth: Option<Authentication>,
    session_name: String,
}

impl App {
    /// An app rendering [`Templates`] from `config.views`.
    pub fn new(config: Config) -> Self {
        let templates = Templates::new(config.views.clone());
        Self::with_renderer(config, templates)
    }

    pub fn with_renderer(config: Config, renderer: impl Renderer) -> Self {
        let auth = config.password.as_deref().map(Authentication::new);
        if config.production && auth.is_none() {
            warn!("production mode without PROTOTYPE_PASSWORD; every page will show an error");
        }
        Self {
            session_name: session::session_name(&config.service_name),
            renderer: Arc::new(renderer),
            sessions: Arc::new(MemoryStore::new()),
            routes: Router::new(),
            hooks: Vec::new(),
            auth,
            config,
        }
    }

    /// Replaces the in-memory session store.
    pub fn with_store(mut self, store: impl SessionStore) -> Self {
        self.sessions = Arc::new(store);
        self
    }

    pub fn routes(mut self, routes: Router) -> Self {
        self.routes = routes;
        self
    }

    /// Adds a hook that sets locals on every request, after the answers are
    /// stored and before any route or template sees the request.
    ///
    /// ```rust,no_run
    /// use protokit::{App, Config};
    ///
    /// let app = App::new(Config::new()).locals(|req| {
    ///     req.locals_mut().insert("phase", "beta");
    /// });
    /// ```
    pub fn locals(mut self, hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the session cookie.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Reads the body, runs the pipeline, and converts the result for hyper.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let span = trace::request_span(req.method(), req.uri().path());
        let started = Instant::now();
        async move {
            let (parts, body) = req.into_parts();
            let res = match body.collect().await {
                Ok(collected) => {
                    let req = http::Request::from_parts(parts, collected.to_bytes());
                    self.respond(Request::from(req)).await
                }
                Err(e) => {
                    let locals = Locals::new().with("serviceName", self.config.service_name.as_str());
                    let mut res = self.fail(Error::Body(e.into()), &locals).await;
                    self.secure(&mut res);
                    res
                }
            };
            trace::finish(&tracing::Span::current(), res.status_code(), started);
            res.into_inner()
        }
        .instrument(span)
        .await
    }

    /// Runs the pipeline on an already-read request.
    pub async fn respond(&self, mut req: Request) -> Response {
        req.attach_renderer(Arc::clone(&self.renderer));
        let (session_id, is_new) = self.load_session(&mut req).await;

        let mut locals = Locals::new();
        let mut res = match self.pipeline(req, &session_id, &mut locals).await {
            Ok((req, res)) => {
                self.sessions.save(&session_id, req.session).await;
                res
            }
            Err(err) => self.fail(err, &locals).await,
        };

        if is_new {
            res.set_cookie(&session::session_cookie(&self.session_name, &session_id));
        }
        self.secure(&mut res);
        res
    }

    fn secure(&self, res: &mut Response) {
        if self.config.production {
            production_headers::apply(res);
        }
    }

    async fn load_session(&self, req: &mut Request) -> (String, bool) {
        if let Some(id) = req.cookie(&self.session_name).map(str::to_owned) {
            if let Some(data) = self.sessions.load(&id).await {
                req.session = data;
                return (id, false);
            }
            debug!("unknown or expired session, starting a new one");
        }
        (session::new_session_id(), true)
    }

    /// `seen` holds the request's locals as of the last stage that can fail.
    async fn pipeline(
        &self,
        mut req: Request,
        session_id: &str,
        seen: &mut Locals,
    ) -> Result<(Request, Response), Error> {
        locals::set_locals(&mut req, &self.config.service_name);
        seen.clone_from(&req.locals);

        if self.config.production {
            req = next!(production_headers::production_headers(req));
            req = next!(authentication::authentication(req, self.auth.as_ref()).await?);
        }

        req = next!(reset_session_data::reset_session_data(req).await?);
        session_defaults::session_defaults(&mut req, &self.config.session_data_defaults);
        auto_store_data::auto_store_data(&mut req);
        // Answers survive even if a custom route below fails.
        self.sessions.save(session_id, req.session.clone()).await;

        for hook in &self.hooks {
            hook(&mut req);
        }
        seen.clone_from(&req.locals);

        if let Some((handler, params)) = self.routes.lookup(&req.method, &req.path) {
            req.params = params;
            req = next!(handler.call(req).await?);
            auto_store_data::sync_data_local(&mut req);
        }

        req = next!(redirect_post_to_get::redirect_post_to_get(req));
        req = next!(auto_routes::auto_routes(req, &*self.renderer).await?);

        let res = pages::not_found(&req.path, &req.locals, &*self.renderer).await;
        Ok((req, res))
    }

    async fn fail(&self, err: Error, locals: &Locals) -> Response {
        pages::error_page(&err, locals, &*self.renderer).await
    }
}
