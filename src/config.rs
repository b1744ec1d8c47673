//! Kit configuration.
//!
//! Build a [`Config`] in code, or read it from the environment with
//! [`Config::from_env`], which loads a `.env` file first if one exists.
//!
//! | Variable | Effect |
//! |---|---|
//! | `SERVICE_NAME` | `serviceName` in templates; seeds the session cookie name |
//! | `NODE_ENV` | `production` turns on security headers and the password gate |
//! | `KIT_ENV` | read when `NODE_ENV` is unset |
//! | `PROTOTYPE_PASSWORD` | password for the gate |
//! | `VIEWS_PATH` | `:`-separated template directories, searched in order |
//! | `SESSION_DATA_DEFAULTS` | JSON file of default session data |

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::value::SessionData;

pub const DEFAULT_SERVICE_NAME: &str = "Service name goes here";
pub const DEFAULT_VIEWS_PATH: &str = "app/views";

#[derive(Clone, Debug)]
pub struct Config {
    pub service_name: String,
    pub production: bool,
    pub password: Option<String>,
    pub views: Vec<PathBuf>,
    pub session_data_defaults: SessionData,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_owned(),
            production: false,
            password: None,
            views: vec![PathBuf::from(DEFAULT_VIEWS_PATH)],
            session_data_defaults: SessionData::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::Config(format!(".env: {e}")));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds from any key lookup. Unset and empty variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(name) = get("SERVICE_NAME") {
            config.service_name = name;
        }
        config.production = get("NODE_ENV")
            .or_else(|| get("KIT_ENV"))
            .is_some_and(|env| env == "production");
        config.password = get("PROTOTYPE_PASSWORD");
        if let Some(views) = get("VIEWS_PATH") {
            config.views = std::env::split_paths(&views).collect();
        }
        if let Some(path) = get("SESSION_DATA_DEFAULTS") {
            config.session_data_defaults = load_defaults(Path::new(&path))?;
        }
        Ok(config)
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn views<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.views = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn session_data_defaults(mut self, defaults: SessionData) -> Self {
        self.session_data_defaults = defaults;
        self
    }
}

/// Reads a JSON object of default session data.
pub fn load_defaults(path: &Path) -> Result<SessionData, Error> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
