//! Password gate for published prototypes.
//!
//! Only active in production. A visitor without the `authentication` cookie is
//! sent to the password page, which remembers where they were going. The
//! cookie holds the SHA-256 hex digest of the password, never the password.

use http::Method;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Error;
use crate::handler::Flow;
use crate::middleware::is_local_path;
use crate::query;
use crate::request::Request;
use crate::response::Response;
use crate::value::{SessionData, Value};

pub const PASSWORD_PATH: &str = "/prototype-admin/password";
pub const COOKIE_NAME: &str = "authentication";

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;
const WRONG_PASSWORD: &str = "wrong-password";

/// Reachable without the cookie, so the password page can load its styles.
const ALLOWED_PATHS: &[&str] = &[
    PASSWORD_PATH,
    "/nhsuk-frontend/nhsuk-frontend.min.css",
    "/nhsuk-frontend/nhsuk-frontend.min.css.map",
    "/nhsuk-frontend/nhsuk-frontend.min.js",
    "/nhsuk-frontend/nhsuk-frontend.min.js.map",
];
const ALLOWED_PREFIX: &str = "/nhsuk-frontend/assets/";

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Clone)]
pub struct Authentication {
    hash: String,
}

impl Authentication {
    pub fn new(password: &str) -> Self {
        Self { hash: hash_password(password) }
    }

    fn cookie(&self) -> String {
        format!(
            "{COOKIE_NAME}={}; Max-Age={COOKIE_MAX_AGE_SECS}; Path=/; HttpOnly; Secure; SameSite=None",
            self.hash
        )
    }

    pub async fn check(&self, mut req: Request) -> Result<Flow, Error> {
        if req.path == PASSWORD_PATH && req.method == Method::GET {
            let errors = match req.query.get("errors") {
                Some(Value::Sequence(list)) => list.clone(),
                Some(one) => vec![one.clone()],
                None => Vec::new(),
            };
            let return_url = req.query_str("returnURL").unwrap_or("/").to_owned();
            req.locals.insert("errors", errors);
            req.locals.insert("returnURL", return_url);
            let html = req.render("password").await?;
            return Ok(Flow::Respond(req, Response::html(html)));
        }

        if req.path == PASSWORD_PATH && req.method == Method::POST {
            let return_url = req
                .form_str("returnURL")
                .filter(|url| is_local_path(url))
                .unwrap_or("/")
                .to_owned();
            let submitted = req.form_str("password").unwrap_or_default();

            if hash_password(submitted) == self.hash {
                info!("password accepted");
                let mut res = Response::redirect(&return_url);
                res.set_cookie(&self.cookie());
                return Ok(Flow::Respond(req, res));
            }
            debug!("wrong password");
            let retry: SessionData = [
                ("errors".to_owned(), Value::from(WRONG_PASSWORD)),
                ("returnURL".to_owned(), Value::from(return_url)),
            ]
            .into_iter()
            .collect();
            let location = query::encode(PASSWORD_PATH, &retry);
            return Ok(Flow::Respond(req, Response::redirect(&location)));
        }

        if req.path.starts_with(ALLOWED_PREFIX) || ALLOWED_PATHS.contains(&req.path.as_str()) {
            return Ok(Flow::Continue(req));
        }
        if req.cookie(COOKIE_NAME) == Some(self.hash.as_str()) {
            return Ok(Flow::Continue(req));
        }

        let wanted: SessionData =
            [("returnURL".to_owned(), Value::from(query::encode(&req.path, &req.query)))]
                .into_iter()
                .collect();
        let location = query::encode(PASSWORD_PATH, &wanted);
        Ok(Flow::Respond(req, Response::redirect(&location)))
    }
}

/// The gate stage. Without a password every request is an error explaining
/// how to set one.
pub async fn authentication(req: Request, auth: Option<&Authentication>) -> Result<Flow, Error> {
    match auth {
        Some(auth) => auth.check(req).await,
        None => Err(Error::PasswordNotSet),
    }
}
