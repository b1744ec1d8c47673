//! Locals every template can rely on.

use crate::request::Request;

/// Sets `currentPage` (path plus query, as requested) and `serviceName`.
pub fn set_locals(req: &mut Request, service_name: &str) {
    let current = req.original_url.clone();
    req.locals.insert("currentPage", current);
    req.locals.insert("serviceName", service_name);
}
