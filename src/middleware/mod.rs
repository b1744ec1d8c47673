//! The kit's pipeline stages.
//!
//! [`App`](crate::App) runs these in a fixed order for every request. Each is
//! usable on its own too. Stages that may answer a request return a
//! [`Flow`](crate::Flow); stages that only prepare it take `&mut Request`.
//!
//! | Stage | Effect |
//! |---|---|
//! | [`trace`] | per-request span with method, path, status, latency |
//! | [`locals`] | `currentPage` and `serviceName` for every template |
//! | [`production_headers`] | https redirect and security headers |
//! | [`authentication`] | password gate for published prototypes |
//! | [`reset_session_data`] | the "clear session data" pages |
//! | [`session_defaults`] | default answers under the user's own |
//! | [`auto_store_data`] | every submitted field into the session |
//! | [`redirect_post_to_get`] | unhandled POSTs become GETs |
//! | [`auto_routes`] | request path to template |
//! | [`pages`] | the not-found and error pages |

pub mod authentication;
pub mod auto_routes;
pub mod auto_store_data;
pub mod locals;
pub mod pages;
pub mod production_headers;
pub mod redirect_post_to_get;
pub mod reset_session_data;
pub mod session_defaults;
pub mod trace;

/// A path on this site: one leading `/`, not a protocol-relative `//host`.
pub(crate) fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths() {
        assert!(is_local_path("/"));
        assert!(is_local_path("/apply/name?x=1"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path(""));
    }
}
