//! Turns an unhandled POST into a GET of the same URL, so refreshing the next
//! page never asks to resend the form.

use http::Method;

use crate::handler::Flow;
use crate::query;
use crate::request::Request;
use crate::response::Response;

pub fn redirect_post_to_get(req: Request) -> Flow {
    if req.method != Method::POST {
        return Flow::Continue(req);
    }
    let location = query::encode(&req.path, &req.query);
    Flow::Respond(req, Response::redirect(&location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    #[test]
    fn post_redirects_with_query() {
        let req = Request::from(
            http::Request::post("/apply/name?edit=true").body(Bytes::new()).unwrap(),
        );
        match redirect_post_to_get(req) {
            Flow::Respond(_, res) => {
                assert_eq!(res.status_code(), StatusCode::FOUND);
                assert_eq!(res.header("location"), Some("/apply/name?edit=true"));
            }
            Flow::Continue(_) => panic!("expected a redirect"),
        }
    }

    #[test]
    fn other_methods_pass() {
        let get = Request::from(http::Request::get("/a").body(Bytes::new()).unwrap());
        assert!(redirect_post_to_get(get).is_continue());
    }
}
