//! Navigation targets of the console.
//!
//! `/` is the instance list, `/instance/{id}/explore/{*path}` the explorer
//! for one instance with an optional key path.

use std::fmt;

use thiserror::Error;

use crate::{InstanceId, NamespacePath};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown route '{0}'")]
    Unknown(String),

    #[error("route '{0}' has no instance id")]
    MissingInstance(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Explore {
        instance: InstanceId,
        /// Raw path after `explore/`, possibly empty or ending in `/`.
        path: String,
    },
}

impl Route {
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let trimmed = raw.trim();
        let rest = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if rest.is_empty() {
            return Ok(Route::Home);
        }

        let unknown = || RouteError::Unknown(trimmed.to_string());
        let rest = rest.strip_prefix("instance/").ok_or_else(unknown)?;
        let (instance, tail) = rest.split_once('/').unwrap_or((rest, ""));
        if instance.is_empty() {
            return Err(RouteError::MissingInstance(trimmed.to_string()));
        }
        let path = match tail {
            "explore" => "",
            _ => tail.strip_prefix("explore/").ok_or_else(unknown)?,
        };

        Ok(Route::Explore {
            instance: InstanceId::new(instance.to_string()),
            path: path.to_string(),
        })
    }

    /// Explorer route for `instance`, selecting `key` when given.
    pub fn explore(instance: InstanceId, key: Option<&NamespacePath>) -> Self {
        Route::Explore {
            instance,
            path: key.map(|k| k.to_string()).unwrap_or_default(),
        }
    }

    /// Candidate key named by the route.
    ///
    /// A non-empty path without a trailing separator is taken to be a key.
    /// The explorer later checks this against the parent listing.
    pub fn selected_key(&self) -> Option<NamespacePath> {
        match self {
            Route::Explore { path, .. } if !path.is_empty() && !path.ends_with('/') => {
                NamespacePath::parse(path)
            }
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<&InstanceId> {
        match self {
            Route::Explore { instance, .. } => Some(instance),
            Route::Home => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Explore { instance, path } => write!(f, "/instance/{instance}/explore/{path}"),
        }
    }
}
