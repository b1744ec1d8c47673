//! Incoming HTTP request type.
//!
//! Beyond the raw parts, a [`Request`] carries what the pipeline works on:
//! the decoded query and form fields, the session data, and the locals every
//! template sees.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method};

use crate::error::Error;
use crate::query;
use crate::render::{Locals, Renderer};
use crate::value::SessionData;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) original_url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) query: SessionData,
    pub(crate) form: SessionData,
    pub(crate) session: SessionData,
    pub(crate) locals: Locals,
    pub(crate) renderer: Option<Arc<dyn Renderer>>,
}

impl Request {
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Path plus query string, exactly as requested.
    pub fn original_url(&self) -> &str { &self.original_url }

    /// Decoded query string fields.
    pub fn query(&self) -> &SessionData { &self.query }

    /// Decoded urlencoded form fields; empty for any other content type.
    pub fn form(&self) -> &SessionData { &self.form }

    pub fn session(&self) -> &SessionData { &self.session }
    pub fn session_mut(&mut self) -> &mut SessionData { &mut self.session }

    pub fn locals(&self) -> &Locals { &self.locals }
    pub fn locals_mut(&mut self) -> &mut Locals { &mut self.locals }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter of a custom route.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Value of cookie `name` from the `cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"'))
    }

    /// A string query field, if present.
    pub fn query_str(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(|v| v.as_str())
    }

    /// A string form field, if present.
    pub fn form_str(&self, key: &str) -> Option<&str> {
        self.form.get(key).and_then(|v| v.as_str())
    }

    /// Renders `template` with this request's locals.
    pub async fn render(&self, template: &str) -> Result<String, Error> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| Error::Config("no renderer attached to request".to_owned()))?;
        Ok(renderer.render(template, &self.locals).await?)
    }

    pub(crate) fn attach_renderer(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderer = Some(renderer);
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();
        let original_url = parts
            .uri
            .path_and_query()
            .map_or_else(|| path.clone(), |pq| pq.as_str().to_owned());
        let query = parts.uri.query().map(|q| query::parse(q.as_bytes())).unwrap_or_default();

        let is_form = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED));
        let form = if is_form { query::parse(&body) } else { SessionData::new() };

        Self {
            method: parts.method,
            path,
            original_url,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            query,
            form,
            session: SessionData::new(),
            locals: Locals::new(),
            renderer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn request(method: &str, uri: &str, headers: &[(&str, &str)], body: &'static str) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        Request::from(builder.body(Bytes::from_static(body.as_bytes())).unwrap())
    }

    #[test]
    fn decodes_query_and_keeps_original_url() {
        let req = request("GET", "/search?q=cats&tags%5B%5D=a", &[], "");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.original_url(), "/search?q=cats&tags%5B%5D=a");
        assert_eq!(req.query_str("q"), Some("cats"));
        assert_eq!(req.query()["tags"], Value::Sequence(vec!["a".into()]));
    }

    #[test]
    fn decodes_urlencoded_forms_only() {
        let form = request(
            "POST",
            "/submit",
            &[("content-type", "application/x-www-form-urlencoded; charset=utf-8")],
            "name=Ann&address[city]=Leeds",
        );
        assert_eq!(form.form_str("name"), Some("Ann"));
        assert!(form.form()["address"].as_mapping().is_some());

        let json = request("POST", "/submit", &[("content-type", "application/json")], r#"{"a":1}"#);
        assert!(json.form().is_empty());
        assert_eq!(json.body(), br#"{"a":1}"#);
    }

    #[test]
    fn reads_cookies() {
        let req = request("GET", "/", &[("cookie", "a=1; authentication=abc; b=\"q\"")], "");
        assert_eq!(req.cookie("authentication"), Some("abc"));
        assert_eq!(req.cookie("b"), Some("q"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[tokio::test]
    async fn render_without_renderer_is_a_config_error() {
        let req = request("GET", "/", &[], "");
        assert!(matches!(req.render("index").await, Err(Error::Config(_))));
    }
}
