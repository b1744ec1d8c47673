//! The last two stops: the not-found page and the error page.
//!
//! Both render through the app's renderer, so a prototype can override
//! `404.html` or `500.html`. If the error page itself cannot render, a plain
//! text response goes out instead.

use http::StatusCode;
use tracing::{error, warn};

use crate::error::Error;
use crate::render::{Locals, Renderer};
use crate::response::Response;
use crate::value::{SessionData, Value};

/// `404` page for `path`.
pub async fn not_found(path: &str, locals: &Locals, renderer: &dyn Renderer) -> Response {
    let locals = locals.clone().with("path", path);
    match renderer.render("404", &locals).await {
        Ok(html) => Response::builder().status(StatusCode::NOT_FOUND).html(html),
        Err(err) => error_page(&err.into(), &locals, renderer).await,
    }
}

/// Error page for `err`, with its status.
pub async fn error_page(err: &Error, locals: &Locals, renderer: &dyn Renderer) -> Response {
    let status = err.status();
    let chain = err.chain();
    error!(status = status.as_u16(), error = %chain, "request failed");

    let message = err.to_string();
    let mut details: SessionData = [
        ("name".to_owned(), Value::from(err.title())),
        ("status".to_owned(), Value::from(status.as_u16())),
    ]
    .into_iter()
    .collect();
    if chain != message {
        details.insert("details".to_owned(), Value::from(chain.as_str()));
    }
    details.insert("message".to_owned(), Value::from(message));

    let locals = locals.clone().with("error", details);
    match renderer.render("500", &locals).await {
        Ok(html) => Response::builder().status(status).html(html),
        Err(render_err) => {
            warn!(error = %render_err, "error page failed to render");
            Response::builder().status(status).text(format!("{}: {chain}", err.title()))
        }
    }
}
