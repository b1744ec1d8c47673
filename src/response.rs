//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and hand it back in a
//! [`Flow::Respond`](crate::Flow::Respond). The pipeline adds the session
//! cookie and, in production, the security headers.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK)
///
/// ```rust
/// use protokit::Response;
/// use http::StatusCode;
///
/// Response::html("<h1>Hello</h1>");
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::redirect("/next-page");
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use protokit::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::NOT_FOUND)
///     .header("x-reason", "no template")
///     .html("<h1>Page not found</h1>");
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: HeaderMap,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: HeaderMap::new(), status: code }
    }

    /// `302 Found` to `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder().status(StatusCode::FOUND).header(LOCATION.as_str(), location).no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// First value of header `name`, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Adds a `set-cookie` header. Earlier cookies are kept.
    pub fn set_cookie(&mut self, cookie: &str) {
        append(&mut self.headers, SET_COOKIE.as_str(), cookie);
    }

    /// Sets `name`, replacing any existing value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some((name, value)) = header_pair(name, value) {
            self.headers.insert(name, value);
        }
    }

    /// Converts into the `http` response hyper writes to the wire.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(self.body));
        *out.status_mut() = self.status;
        *out.headers_mut() = self.headers;
        out
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. Names or values that are not valid HTTP are dropped
    /// with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        append(&mut self.headers, name, value);
        self
    }

    /// Terminate with an HTML body (`text/html; charset=utf-8`).
    pub fn html(self, body: impl Into<String>) -> Response {
        let body: String = body.into();
        self.finish(HTML, Bytes::from(body))
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        let body: String = body.into();
        self.finish(TEXT, Bytes::from(body))
    }

    /// Terminate with no body (e.g. `204`, `302`).
    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { body, headers: self.headers, status: self.status }
    }
}

fn header_pair(name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => Some((name, value)),
        _ => {
            warn!(header = name, "dropping invalid response header");
            None
        }
    }
}

fn append(headers: &mut HeaderMap, name: &str, value: &str) {
    if let Some((name, value)) = header_pair(name, value) {
        headers.append(name, value);
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a bare status: `Flow::respond(req, StatusCode::NO_CONTENT)`.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
