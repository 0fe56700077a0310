//! One-shot subcommands against a single registry URL.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use nsreg_client::Registry;
use nsreg_explorer::NamespacePath;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// List the projects of an instance
    Projects { url: String },
    /// List the groups and values under a project path
    Ls {
        url: String,
        project: String,
        #[arg(default_value = "")]
        path: String,
    },
    /// Print the JSON value stored at <project>/<path>
    Get { url: String, key: String },
    /// Store a JSON document at <project>/<path>
    Set { url: String, key: String, json: String },
    /// Delete the value stored at <project>/<path>
    Delete { url: String, key: String },
}

impl Commands {
    /// Registry base URL the command talks to.
    pub fn url(&self) -> &str {
        match self {
            Commands::Projects { url }
            | Commands::Ls { url, .. }
            | Commands::Get { url, .. }
            | Commands::Set { url, .. }
            | Commands::Delete { url, .. } => url,
        }
    }

    /// Run the command, writing its result to `out`.
    pub async fn execute<R: Registry>(&self, registry: &R, out: &mut impl Write) -> Result<()> {
        match self {
            Commands::Projects { .. } => {
                let projects = registry.list_projects().await?;
                writeln!(out, "{}", serde_json::to_string_pretty(&projects)?)?;
            }
            Commands::Ls { project, path, .. } => {
                let listing = registry.list_children(project, path).await?;
                writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
            }
            Commands::Get { key, .. } => {
                let key = parse_key(key)?;
                let value = registry.get_value(key.project(), key.relative()).await?;
                writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            }
            Commands::Set { key, json, .. } => {
                let key = parse_key(key)?;
                let value: Value = serde_json::from_str(json).context("Invalid JSON format.")?;
                registry.set_value(key.project(), key.relative(), &value).await?;
                tracing::info!(key = %key, "Value saved");
                writeln!(out, "Saved {key}")?;
            }
            Commands::Delete { key, .. } => {
                let key = parse_key(key)?;
                registry.delete_value(key.project(), key.relative()).await?;
                tracing::info!(key = %key, "Value deleted");
                writeln!(out, "Deleted {key}")?;
            }
        }
        Ok(())
    }
}

/// A value key needs a project and at least one segment below it.
fn parse_key(raw: &str) -> Result<NamespacePath> {
    match NamespacePath::parse(raw) {
        Some(key) if !key.relative().is_empty() => Ok(key),
        _ => bail!("'{raw}' is not a key; expected <project>/<path>"),
    }
}
