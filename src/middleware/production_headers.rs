//! Production-only transport security.
//!
//! Plain-http requests are redirected to https on the same host, judged by
//! `x-forwarded-proto` since the kit runs behind a TLS-terminating proxy.
//! Every production response carries the two headers in [`apply`].

use http::header::{CONTENT_SECURITY_POLICY, HOST, STRICT_TRANSPORT_SECURITY};
use tracing::debug;

use crate::handler::Flow;
use crate::request::Request;
use crate::response::Response;

pub const CSP: &str = "upgrade-insecure-requests";
pub const HSTS: &str = "max-age=31536000; includeSubDomains; preload";

const FORWARDED_PROTO: &str = "x-forwarded-proto";

pub fn production_headers(req: Request) -> Flow {
    if is_https(&req) {
        return Flow::Continue(req);
    }
    let Some(host) = req.header(HOST.as_str()).filter(|h| !h.is_empty()) else {
        return Flow::Continue(req);
    };
    let location = format!("https://{host}{}", req.original_url);
    debug!(%location, "redirecting to https");
    Flow::Respond(req, Response::redirect(&location))
}

/// Adds the security headers to a response.
pub fn apply(res: &mut Response) {
    res.set_header(CONTENT_SECURITY_POLICY.as_str(), CSP);
    res.set_header(STRICT_TRANSPORT_SECURITY.as_str(), HSTS);
}

fn is_https(req: &Request) -> bool {
    req.header(FORWARDED_PROTO)
        .and_then(|v| v.split(',').next())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}
