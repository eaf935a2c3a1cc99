//! Fatal run errors and the exit codes they map to

use common::LoadError;
use remote::InitError;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Init(#[from] InitError),

    #[error("failed to render plan: {0}")]
    Render(#[from] serde_json::Error),
}

impl RunError {
    /// Process exit code for this error.
    ///
    /// | code | condition                                  |
    /// |------|--------------------------------------------|
    /// | 1    | config file unreadable or not valid YAML   |
    /// | 2    | `remotes` malformed or invalid             |
    /// | 3    | no root remotes                            |
    /// | 4    | `exec` malformed                           |
    /// | 5    | no commands                                |
    /// | 6    | network subsystem initialization failed    |
    /// | 7    | transport library initialization failed    |
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Load(LoadError::Unreadable { .. } | LoadError::Document(_)) => 1,
            RunError::Load(LoadError::Remotes(_)) => 2,
            RunError::Load(LoadError::NoRootRemotes) => 3,
            RunError::Load(LoadError::Exec(_)) => 4,
            RunError::Load(LoadError::NoCommands) => 5,
            RunError::Init(InitError::Network(_)) => 6,
            RunError::Init(InitError::Transport(_)) => 7,
            RunError::Render(_) => 1,
        }
    }
}
