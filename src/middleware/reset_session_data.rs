//! The "clear session data" pages.
//!
//! `GET /prototype-admin/reset` asks for confirmation. Any request to
//! `/prototype-admin/reset-session-data` empties the session and links back to
//! `returnPage`, if that is a local path.

use http::Method;
use tracing::info;

use crate::error::Error;
use crate::handler::Flow;
use crate::middleware::is_local_path;
use crate::request::Request;
use crate::response::Response;

pub const RESET_PATH: &str = "/prototype-admin/reset";
pub const RESET_DATA_PATH: &str = "/prototype-admin/reset-session-data";

pub async fn reset_session_data(mut req: Request) -> Result<Flow, Error> {
    if req.method == Method::GET && req.path == RESET_PATH {
        let return_page = req.query_str("returnPage").unwrap_or("/").to_owned();
        req.locals.insert("returnPage", return_page);
        let html = req.render("reset").await?;
        return Ok(Flow::Respond(req, Response::html(html)));
    }

    if req.path == RESET_DATA_PATH {
        let return_page = req
            .form_str("returnPage")
            .filter(|page| is_local_path(page))
            .unwrap_or("/")
            .to_owned();
        info!(cleared = req.session.len(), "session data reset");
        req.session.clear();
        req.locals.insert("returnPage", return_page);
        let html = req.render("reset-done").await?;
        return Ok(Flow::Respond(req, Response::html(html)));
    }

    Ok(Flow::Continue(req))
}
