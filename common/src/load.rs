//! Top-level document: `remotes` + `exec` compiled into a [`Config`]

use std::path::Path;

use serde::Serialize;

use crate::document::{self, Node, Value};
use crate::plan::{self, ExecPlan};
use crate::remotes::{self, RemoteSet};
use crate::{ConfigError, LoadError};

/// Compiled configuration: the root remotes and the plan to run against them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub remotes: RemoteSet,
    pub plan: ExecPlan,
}

impl Config {
    #[tracing::instrument]
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("read {} bytes of config", text.len());
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        let doc = document::parse(text)?;
        Self::from_document(&doc)
    }

    /// Remotes are compiled (and checked for emptiness) before `exec` is looked at.
    pub fn from_document(doc: &Value) -> Result<Self, LoadError> {
        let root = Node::root(doc);
        if !root.is_map() && !root.is_null() {
            return Err(LoadError::Remotes(ConfigError::malformed("remotes")));
        }
        let (mut seen_remotes, mut seen_exec) = (false, false);
        for entry in root.children() {
            let key = entry.key().unwrap_or_default();
            match key.as_ref() {
                "remotes" if seen_remotes => {
                    return Err(LoadError::Remotes(ConfigError::malformed("remotes")));
                }
                "remotes" => seen_remotes = true,
                "exec" if seen_exec => return Err(LoadError::Exec(ConfigError::malformed("exec"))),
                "exec" => seen_exec = true,
                other => tracing::warn!("ignoring unknown top-level key `{}`", other),
            }
        }
        let remotes = match root.get("remotes") {
            Some(node) => remotes::parse(&node).map_err(LoadError::Remotes)?,
            None => RemoteSet::new(),
        };
        if remotes.is_empty() {
            return Err(LoadError::NoRootRemotes);
        }
        tracing::info!("remotes: {}", remotes.names().join(", "));
        let plan = match root.get("exec") {
            Some(node) => plan::compile(&node, &remotes).map_err(LoadError::Exec)?,
            None => ExecPlan::default(),
        };
        if plan.is_empty() {
            return Err(LoadError::NoCommands);
        }
        tracing::info!("compiled {} command(s)", plan.len());
        Ok(Self { remotes, plan })
    }
}
