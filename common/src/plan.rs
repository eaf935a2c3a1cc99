//! Execution plan and the compiler for the `exec` section
//!
//! ```yaml
//! exec:
//!   - settings:                      # optional, applies to this exec item
//!       flags: [no-target-files-overwrite]
//!     copy:
//!       - settings:                  # no `files` sibling: applies to the following items
//!           flags: [allow-next-target-files-overwrite]
//!       - files:
//!           - from: ./build/app.conf
//!             to: /etc/app.conf
//!   - copy:
//!       settings:                    # bare settings, updates the root scope
//!         flags: [deny-next-target-files-overwrite]
//! ```
//!
//! The compiler walks the document in declaration order and emits one [`Command`] per
//! `files` entry. Settings cascade through a [`ScopeStack`]: scope depth 1 is the root of
//! `exec`, an exec item with settings adds a scope, and copy items with settings add scopes
//! on top of that. Each command captures the settings and the remotes that were active when
//! it was declared.

use serde::Serialize;

use crate::document::Node;
use crate::remotes::RemoteSet;
use crate::scope::ScopeStack;
use crate::settings::{self, CopySettings, Mode};
use crate::ConfigError;

/// Deepest scope a copy item replaces when it starts.
const COPY_ITEM_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyFile {
    pub from: String,
    pub to: String,
    pub remotes: RemoteSet,
    pub settings: CopySettings,
}

impl CopyFile {
    pub fn overwrite_allowed(&self) -> bool {
        self.settings.overwrite_allowed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CopyFile(CopyFile),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::CopyFile(copy) => write!(
                f,
                "copy file: from=`{}` to=`{}` flags={}",
                copy.from, copy.to, copy.settings
            ),
        }
    }
}

/// Commands in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecPlan {
    commands: Vec<Command>,
}

impl ExecPlan {
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExecPlan {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Compile the `exec` node against the root remotes.
pub fn compile(exec: &Node<'_>, remotes: &RemoteSet) -> Result<ExecPlan, ConfigError> {
    let mut compiler = Compiler::new(remotes.clone());
    compiler.exec(exec)?;
    Ok(compiler.finish())
}

struct Compiler {
    settings: ScopeStack<CopySettings>,
    remotes: ScopeStack<RemoteSet>,
    plan: ExecPlan,
}

impl Compiler {
    fn new(root_remotes: RemoteSet) -> Self {
        Self {
            settings: ScopeStack::default(),
            remotes: ScopeStack::new(root_remotes),
            plan: ExecPlan::default(),
        }
    }

    fn finish(self) -> ExecPlan {
        self.plan
    }

    fn exec(&mut self, node: &Node<'_>) -> Result<(), ConfigError> {
        if !node.is_seq() && !node.is_null() {
            return Err(ConfigError::malformed("exec"));
        }
        for item in node.children() {
            if !item.is_map() {
                return Err(ConfigError::malformed("exec"));
            }
            let mut copy = None;
            let mut item_settings = None;
            for entry in item.children() {
                match entry.key().as_deref() {
                    Some("copy") if copy.is_none() => copy = Some(entry),
                    Some("copy") => return Err(ConfigError::malformed("exec/copy")),
                    Some("settings") if item_settings.is_none() => item_settings = Some(entry),
                    Some("settings") => return Err(ConfigError::malformed("exec/settings")),
                    _ => return Err(ConfigError::malformed("exec")),
                }
            }
            let Some(copy) = copy else {
                return Err(ConfigError::malformed("exec"));
            };
            let top = self.settings.descend(
                1,
                |_, root| root.clear_current(),
                item_settings.is_some(),
            );
            if let Some(node) = &item_settings {
                settings::read(node, "exec/settings", top, Mode::CurrentItem)?;
            }
            let item_depth = self.settings.depth();
            self.copy(&copy, item_depth, item_settings.is_some())?;
        }
        Ok(())
    }

    /// `item_depth` is the depth of the enclosing exec item's scope.
    fn copy(
        &mut self,
        node: &Node<'_>,
        item_depth: usize,
        has_item_settings: bool,
    ) -> Result<(), ConfigError> {
        if !node.is_seq() && !node.is_map() && !node.is_null() {
            return Err(ConfigError::malformed("exec/copy"));
        }
        for entry in node.children() {
            if entry.has_key() {
                if !entry.key_is("settings") {
                    return Err(ConfigError::malformed("exec/copy"));
                }
                if has_item_settings {
                    return Err(ConfigError::malformed("exec/copy/settings"));
                }
                let top = self
                    .settings
                    .descend(1, |_, root| root.clear_current(), false);
                settings::read(&entry, "exec/copy/settings", top, Mode::NextScope)?;
                // the rest of this list is not processed
                return Ok(());
            }
            if !entry.is_map() {
                return Err(ConfigError::malformed("exec/copy"));
            }
            let mut files = None;
            let mut group_settings = None;
            for field in entry.children() {
                match field.key().as_deref() {
                    Some("files") if files.is_none() => files = Some(field),
                    Some("files") => return Err(ConfigError::malformed("exec/copy/files")),
                    Some("settings") if group_settings.is_none() => group_settings = Some(field),
                    Some("settings") => return Err(ConfigError::malformed("exec/copy/settings")),
                    _ => return Err(ConfigError::malformed("exec/copy")),
                }
            }
            if files.is_none() && group_settings.is_none() {
                return Err(ConfigError::malformed("exec/copy"));
            }
            let top = self.settings.descend(
                COPY_ITEM_MAX_DEPTH,
                |depth, scope| {
                    // scopes left behind by earlier copy items keep their sticky flags only
                    if depth > item_depth {
                        scope.clear_current();
                    }
                },
                group_settings.is_some(),
            );
            if let Some(node) = &group_settings {
                let mode = if files.is_some() {
                    Mode::CurrentItem
                } else {
                    Mode::NextScope
                };
                settings::read(node, "exec/copy/settings", top, mode)?;
            }
            if let Some(files) = &files {
                self.files(files)?;
            }
        }
        Ok(())
    }

    fn files(&mut self, node: &Node<'_>) -> Result<(), ConfigError> {
        if !node.is_seq() && !node.is_null() {
            return Err(ConfigError::malformed("exec/copy/files"));
        }
        for entry in node.children() {
            if !entry.is_map() {
                return Err(ConfigError::malformed("exec/copy"));
            }
            let mut from = None;
            let mut to = None;
            for field in entry.children() {
                match field.key().as_deref() {
                    Some("from") => {
                        if from.is_some() {
                            return Err(ConfigError::malformed("exec/copy/files/from"));
                        }
                        let Some(value) = field.val() else {
                            return Err(ConfigError::malformed("exec/copy/files"));
                        };
                        from = Some(value.into_owned());
                    }
                    Some("to") => {
                        if to.is_some() {
                            return Err(ConfigError::malformed("exec/copy/files/to"));
                        }
                        if field.is_null() {
                            to = Some(String::new());
                            continue;
                        }
                        let Some(value) = field.val() else {
                            return Err(ConfigError::malformed("exec/copy/files"));
                        };
                        to = Some(value.into_owned());
                    }
                    _ => return Err(ConfigError::malformed("exec/copy")),
                }
            }
            let (Some(from), Some(to)) = (from, to) else {
                return Err(ConfigError::malformed("exec/copy/files"));
            };
            if from.is_empty() {
                return Err(ConfigError::malformed("exec/copy/files"));
            }
            if to.is_empty() {
                tracing::warn!("copy of `{}` has an empty target path", from);
            }
            let command = CopyFile {
                from,
                to,
                remotes: self.remotes.top().clone(),
                settings: *self.settings.top(),
            };
            tracing::debug!(
                "compiled copy `{}` -> `{}` (flags {})",
                command.from,
                command.to,
                command.settings
            );
            self.plan.commands.push(Command::CopyFile(command));
        }
        Ok(())
    }
}
