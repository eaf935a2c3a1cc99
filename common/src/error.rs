use std::net::Ipv4Addr;

/// Problems found while compiling the configuration document.
///
/// Every variant is fatal for the whole run: nothing is executed when the configuration
/// does not compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed config: `{path}`")]
    Malformed { path: String },

    #[error("remote name is empty")]
    EmptyName,

    #[error("remote user is empty: name=`{name}`")]
    EmptyUser { name: String },

    #[error("remote ip or port is invalid: name=`{name}` ip=`{ip}` port=`{port}`")]
    InvalidAddress {
        name: String,
        ip: Ipv4Addr,
        port: u16,
    },

    #[error("remote name is not unique: name=`{name}`")]
    DuplicateName { name: String },

    #[error("remote ip and port is not unique: name=`{name}` ip=`{ip}` port=`{port}`")]
    DuplicateAddress {
        name: String,
        ip: Ipv4Addr,
        port: u16,
    },
}

impl ConfigError {
    pub fn malformed(path: impl Into<String>) -> Self {
        ConfigError::Malformed { path: path.into() }
    }
}

/// Errors from loading a configuration file, one variant per way a run can fail before
/// connecting anywhere.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not open file: `{path}`")]
    Unreadable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not a valid document: {0}")]
    Document(#[from] serde_yaml::Error),

    #[error("{0}")]
    Remotes(#[source] ConfigError),

    #[error("no root remotes")]
    NoRootRemotes,

    #[error("{0}")]
    Exec(#[source] ConfigError),

    #[error("no commands to execute")]
    NoCommands,
}
