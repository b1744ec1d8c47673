//! Auto-routing: request path to template, no route registration.
//!
//! `/` renders `index`. `/apply/name` renders `apply/name`. If that template
//! does not exist, `apply/name/index` is tried once. If neither exists the
//! request carries on to the not-found page. A template that exists but
//! fails is an error, never a 404.

use tracing::debug;

use crate::error::Error;
use crate::handler::Flow;
use crate::render::{Locals, RenderError, Renderer};
use crate::request::Request;
use crate::response::Response;

/// How resolving one request path ended.
#[derive(Debug)]
pub enum Outcome {
    /// HTML from the first template that rendered.
    Rendered(String),
    /// No template at the path or at its `/index` fallback.
    NotFound,
    /// A template was found but failed. The renderer's error, untouched.
    RenderError(RenderError),
}

/// Template name for a request path: leading `/` stripped, `""` → `index`.
pub fn template_name(request_path: &str) -> String {
    let name = request_path.strip_prefix('/').unwrap_or(request_path);
    if name.is_empty() { "index".to_owned() } else { name.to_owned() }
}

fn ends_with_index(name: &str) -> bool {
    name.rsplit('/').next() == Some("index")
}

/// Resolves `request_path` to rendered HTML, trying the directory index once.
///
/// At most two render calls: the path itself, then `path/index`.
pub async fn resolve<R>(renderer: &R, request_path: &str, locals: &Locals) -> Outcome
where
    R: Renderer + ?Sized,
{
    let mut name = template_name(request_path);
    loop {
        debug!(template = %name, "auto-route render attempt");
        match renderer.render(&name, locals).await {
            Ok(html) => return Outcome::Rendered(html),
            Err(RenderError::NotFound { .. }) if !ends_with_index(&name) => name.push_str("/index"),
            Err(RenderError::NotFound { .. }) => return Outcome::NotFound,
            Err(err) => return Outcome::RenderError(err),
        }
    }
}

/// Pipeline stage: answer with the resolved template, or carry on.
pub async fn auto_routes(req: Request, renderer: &dyn Renderer) -> Result<Flow, Error> {
    match resolve(renderer, req.path(), req.locals()).await {
        Outcome::Rendered(html) => Ok(Flow::Respond(req, Response::html(html))),
        Outcome::NotFound => Ok(Flow::Continue(req)),
        Outcome::RenderError(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::render::RenderFuture;

    /// Renderer over a fixed table: `Ok` renders, `Err` fails with that message.
    struct Table {
        templates: HashMap<&'static str, Result<&'static str, &'static str>>,
        calls: Mutex<Vec<String>>,
    }

    impl Table {
        fn new(entries: &[(&'static str, Result<&'static str, &'static str>)]) -> Self {
            Self { templates: entries.iter().copied().collect(), calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Renderer for Table {
        fn render<'a>(&'a self, name: &'a str, _locals: &'a Locals) -> RenderFuture<'a> {
            self.calls.lock().unwrap().push(name.to_owned());
            let result = match self.templates.get(name) {
                Some(Ok(html)) => Ok((*html).to_owned()),
                Some(Err(message)) => Err(RenderError::failed(name, std::io::Error::other(*message))),
                None => Err(RenderError::NotFound { name: name.to_owned() }),
            };
            Box::pin(async move {
                tokio::task::yield_now().await;
                result
            })
        }
    }

    fn rendered(outcome: Outcome) -> String {
        match outcome {
            Outcome::Rendered(html) => html,
            other => panic!("expected Rendered, got {other:?}"),
        }
    }

    #[test]
    fn template_names() {
        assert_eq!(template_name("/"), "index");
        assert_eq!(template_name(""), "index");
        assert_eq!(template_name("/simple"), "simple");
        assert_eq!(template_name("/a/b"), "a/b");
        assert_eq!(template_name("//double"), "/double");
    }

    #[tokio::test]
    async fn root_renders_index() {
        let table = Table::new(&[("index", Ok("home"))]);
        assert_eq!(rendered(resolve(&table, "/", &Locals::new()).await), "home");
        assert_eq!(table.calls(), ["index"]);
    }

    #[tokio::test]
    async fn root_without_index_is_not_found_after_one_attempt() {
        let table = Table::new(&[]);
        assert!(matches!(resolve(&table, "/", &Locals::new()).await, Outcome::NotFound));
        assert_eq!(table.calls(), ["index"]);
    }

    #[tokio::test]
    async fn direct_template_skips_the_fallback() {
        let table = Table::new(&[("simple", Ok("simple page")), ("simple/index", Ok("wrong"))]);
        assert_eq!(rendered(resolve(&table, "/simple", &Locals::new()).await), "simple page");
        assert_eq!(table.calls(), ["simple"]);
    }

    #[tokio::test]
    async fn directory_falls_back_to_index() {
        let table = Table::new(&[("nested/index", Ok("nested index"))]);
        assert_eq!(rendered(resolve(&table, "/nested", &Locals::new()).await), "nested index");
        assert_eq!(table.calls(), ["nested", "nested/index"]);
    }

    #[tokio::test]
    async fn missing_everywhere_is_not_found() {
        let table = Table::new(&[]);
        assert!(matches!(resolve(&table, "/missing", &Locals::new()).await, Outcome::NotFound));
        assert_eq!(table.calls(), ["missing", "missing/index"]);
    }

    #[tokio::test]
    async fn explicit_index_is_not_suffixed_again() {
        let table = Table::new(&[]);
        assert!(matches!(resolve(&table, "/docs/index", &Locals::new()).await, Outcome::NotFound));
        assert_eq!(table.calls(), ["docs/index"]);
    }

    #[tokio::test]
    async fn names_merely_ending_in_index_still_fall_back() {
        let table = Table::new(&[("reindex/index", Ok("ok"))]);
        assert_eq!(rendered(resolve(&table, "/reindex", &Locals::new()).await), "ok");
    }

    #[tokio::test]
    async fn broken_template_is_a_render_error_with_its_message() {
        let table = Table::new(&[("broken", Err("unexpected end of input"))]);
        match resolve(&table, "/broken", &Locals::new()).await {
            Outcome::RenderError(RenderError::Failed { name, source }) => {
                assert_eq!(name, "broken");
                assert_eq!(source.to_string(), "unexpected end of input");
            }
            other => panic!("expected RenderError, got {other:?}"),
        }
        assert_eq!(table.calls(), ["broken"]);
    }

    #[tokio::test]
    async fn broken_fallback_is_a_render_error() {
        let table = Table::new(&[("section/index", Err("boom"))]);
        assert!(matches!(
            resolve(&table, "/section", &Locals::new()).await,
            Outcome::RenderError(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_requests_retry_independently() {
        let table = std::sync::Arc::new(Table::new(&[("a/index", Ok("A")), ("b", Ok("B"))]));
        let locals = Locals::new();
        let (a, b, c) = tokio::join!(
            resolve(&*table, "/a", &locals),
            resolve(&*table, "/b", &locals),
            resolve(&*table, "/c", &locals),
        );
        assert_eq!(rendered(a), "A");
        assert_eq!(rendered(b), "B");
        assert!(matches!(c, Outcome::NotFound));

        let mut calls = table.calls();
        calls.sort();
        assert_eq!(calls, ["a", "a/index", "b", "c", "c/index"]);
    }

    #[tokio::test]
    async fn stage_answers_html_or_continues() {
        let table = Table::new(&[("page", Ok("<p>page</p>"))]);
        let request = |uri: &str| {
            Request::from(http::Request::get(uri).body(bytes::Bytes::new()).unwrap())
        };

        match auto_routes(request("/page"), &table).await.unwrap() {
            Flow::Respond(_, res) => {
                assert_eq!(res.header("content-type"), Some("text/html; charset=utf-8"));
                assert_eq!(res.body(), b"<p>page</p>");
            }
            Flow::Continue(_) => panic!("expected a response"),
        }
        assert!(auto_routes(request("/nope"), &table).await.unwrap().is_continue());
    }
}
