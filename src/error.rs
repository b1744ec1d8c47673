//! Unified error type.

use http::StatusCode;

use crate::render::RenderError;

/// Boxed error from a request body or other foreign source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by protokit's fallible operations.
///
/// Expected outcomes (a missing page, a login redirect) are [`Response`]s, not
/// errors. An `Error` that escapes a pipeline stage ends up on the error page,
/// with the status from [`Error::status`].
///
/// [`Response`]: crate::Response
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid session data defaults: {0}")]
    Defaults(#[from] serde_json::Error),

    #[error("failed to read request body")]
    Body(#[source] BoxError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("set the PROTOTYPE_PASSWORD environment variable to publish this prototype")]
    PasswordNotSet,

    /// An error a route handler raised with a status of its choosing.
    #[error("{message}")]
    Http { status: StatusCode, message: String },
}

impl Error {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// Status the error page answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::PasswordNotSet => StatusCode::UNAUTHORIZED,
            Self::Http { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short title for the error page.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PasswordNotSet => "Password not set",
            Self::Render(_) => "Template error",
            Self::Body(_) => "Bad request",
            _ => "Error",
        }
    }

    /// This error and every `source()` beneath it, joined with `: `.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
