//! Template rendering.
//!
//! The pipeline only ever asks one question of a renderer: *render this name
//! with these locals*. The answer is HTML, or a [`RenderError`] that says
//! plainly whether the template was missing or broke while rendering. Nobody
//! has to sniff error messages.
//!
//! [`Templates`] is the stock renderer: minijinja over one or more view
//! directories, with `.html` appended to extension-less names and the kit's
//! own pages (`404`, `500`, `password`, `reset`, `reset-done`) built in as a
//! last resort.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use tracing::debug;

use crate::handler::BoxFuture;
use crate::value::{SessionData, Value};

// ── Locals ────────────────────────────────────────────────────────────────────

/// Variables handed to every template render.
///
/// The pipeline fills in `data` (the session data), `currentPage` and
/// `serviceName`. Custom routes add whatever else they need.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Locals(IndexMap<String, Value>);

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Session data as the template sees it, under `data`.
    pub fn data(&self) -> Option<&SessionData> {
        self.get("data").and_then(Value::as_mapping)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a render produced no output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No template exists under this name. Routing falls through.
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// The template exists but failed to compile or evaluate.
    #[error("template `{name}` failed to render")]
    Failed {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl RenderError {
    pub fn failed(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self::Failed { name: name.into(), source: source.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Renderer ──────────────────────────────────────────────────────────────────

/// Result of one render call.
pub type RenderFuture<'a> = BoxFuture<'a, Result<String, RenderError>>;

/// Anything that can turn a template name plus locals into HTML.
///
/// Implementations must report a missing template as
/// [`RenderError::NotFound`] and nothing else as such; the auto-router's
/// directory-index fallback depends on it.
pub trait Renderer: Send + Sync + 'static {
    fn render<'a>(&'a self, name: &'a str, locals: &'a Locals) -> RenderFuture<'a>;
}

// ── Templates ─────────────────────────────────────────────────────────────────

const BUILTIN: &[(&str, &str)] = &[
    ("404.html", include_str!("../views/404.html")),
    ("500.html", include_str!("../views/500.html")),
    ("password.html", include_str!("../views/password.html")),
    ("reset.html", include_str!("../views/reset.html")),
    ("reset-done.html", include_str!("../views/reset-done.html")),
];

/// minijinja-backed [`Renderer`] over a list of view directories.
///
/// Directories are searched in order; the first match wins. By default every
/// render reloads templates from disk, so edits show up on the next request.
/// Call [`Templates::cached`] to compile each template once instead.
///
/// Loading reads files, so each render runs on tokio's blocking pool and
/// must be awaited inside a tokio runtime.
pub struct Templates {
    dirs: Arc<[PathBuf]>,
    cached: Arc<Environment<'static>>,
    reload: bool,
}

impl Templates {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dirs: Arc<[PathBuf]> = dirs.into_iter().map(Into::into).collect();
        let cached = Arc::new(environment(Arc::clone(&dirs)));
        Self { dirs, cached, reload: true }
    }

    /// Keep compiled templates between renders.
    pub fn cached(mut self) -> Self {
        self.reload = false;
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// The environment a render should use: the shared one, or a fresh one
    /// that rereads every file.
    fn environment(&self) -> Arc<Environment<'static>> {
        if self.reload {
            Arc::new(environment(Arc::clone(&self.dirs)))
        } else {
            Arc::clone(&self.cached)
        }
    }
}

impl Renderer for Templates {
    fn render<'a>(&'a self, name: &'a str, locals: &'a Locals) -> RenderFuture<'a> {
        let env = self.environment();
        let job_name = name.to_owned();
        let job_locals = locals.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || render_blocking(&env, &job_name, &job_locals))
                .await
                .unwrap_or_else(|e| Err(RenderError::failed(name, e)))
        })
    }
}

fn render_blocking(env: &Environment<'_>, name: &str, locals: &Locals) -> Result<String, RenderError> {
    let template = env.get_template(&file_name(name)).map_err(|e| match e.kind() {
        ErrorKind::TemplateNotFound => RenderError::NotFound { name: name.to_owned() },
        _ => RenderError::failed(name, e),
    })?;
    template.render(locals).map_err(|e| RenderError::failed(name, e))
}

fn environment(dirs: Arc<[PathBuf]>) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_loader(move |name| load(&dirs, name));
    env
}

fn load(dirs: &[PathBuf], name: &str) -> Result<Option<String>, minijinja::Error> {
    let Some(relative) = safe_relative(name) else {
        return Ok(None);
    };
    for dir in dirs {
        let path = dir.join(&relative);
        match std::fs::read_to_string(&path) {
            Ok(source) => {
                debug!(template = name, path = %path.display(), "loaded template");
                return Ok(Some(source));
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::IsADirectory) => {}
            Err(e) => {
                return Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {}", path.display()),
                )
                .with_source(e));
            }
        }
    }
    Ok(BUILTIN.iter().find(|(n, _)| *n == name).map(|(_, src)| (*src).to_owned()))
}

/// Appends `.html` when the last path segment has no extension.
fn file_name(name: &str) -> String {
    let last = name.rsplit('/').next().unwrap_or(name);
    if last.contains('.') { name.to_owned() } else { format!("{name}.html") }
}

/// `name` as a path that cannot leave its view directory.
fn safe_relative(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
