//! # protokit
//!
//! The request pipeline of a prototyping kit for clickable service
//! prototypes. Designers write pages and forms. The kit remembers answers and
//! finds pages. Nothing more.
//!
//! ## The contract
//!
//! Two behaviours carry every prototype:
//!
//! - **Auto-store-data**: every submitted form field and query parameter is
//!   merged into per-browser session data, available to every template as
//!   `data`. See [`store`].
//! - **Auto-routes**: a request for `/apply/name` renders the template
//!   `apply/name`, or `apply/name/index` if that is what exists, with no
//!   route registration. See [`middleware::auto_routes`].
//!
//! Around them sit the things a published prototype needs: a password gate
//! and security headers in production, "clear session data" pages, default
//! answers, a not-found page and an error page.
//!
//! What the kit leaves to others: the HTTP server (hyper, see
//! `demos/prototype.rs`), static assets, and TLS.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use protokit::{App, Config, Flow, Request, Response, Router};
//!
//! # async fn serve(app: App) {}
//! #[tokio::main]
//! async fn main() {
//!     let routes = Router::new().post("/where-do-you-live", where_do_you_live);
//!     let app = App::new(Config::from_env().unwrap()).routes(routes);
//!     serve(app).await;
//! }
//!
//! async fn where_do_you_live(req: Request) -> Flow {
//!     let next = match req.session().get("country").and_then(|v| v.as_str()) {
//!         Some("England") => "/england",
//!         _ => "/ineligible",
//!     };
//!     Flow::respond(req, Response::redirect(next))
//! }
//! ```

mod app;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod value;

pub mod config;
pub mod middleware;
pub mod query;
pub mod render;
pub mod session;
pub mod store;

pub use app::App;
pub use config::Config;
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Flow, Handler, IntoFlow};
pub use http::{Method, StatusCode};
pub use render::{Locals, RenderError, Renderer, Templates};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use session::{MemoryStore, SessionStore};
pub use value::{SessionData, UNCHECKED, Value};
