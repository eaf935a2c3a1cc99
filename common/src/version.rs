//! Build identification

/// Version of the running binary
///
/// The semantic version comes from Cargo.toml, git details are injected by build.rs when the
/// build happens inside a git checkout.
///
/// ```
/// use common::version::BuildVersion;
///
/// let v = BuildVersion {
///     semantic: "0.4.0".to_string(),
///     git_describe: Some("v0.3.0-7-g644da27".to_string()),
///     git_hash: None,
/// };
/// assert_eq!(v.to_string(), "0.4.0 (v0.3.0-7-g644da27)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BuildVersion {
    /// Semantic version from Cargo.toml (e.g., "0.4.0")
    pub semantic: String,

    /// Git describe output (e.g., "v0.3.0-7-g644da27")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_describe: Option<String>,

    /// Full git commit hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
}

impl BuildVersion {
    pub fn current() -> Self {
        Self {
            semantic: env!("CARGO_PKG_VERSION").to_string(),
            git_describe: option_env!("SSH_EXEC_GIT_DESCRIBE").map(String::from),
            git_hash: option_env!("SSH_EXEC_GIT_HASH").map(String::from),
        }
    }
}

impl std::fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.git_describe {
            Some(git_describe) => write!(f, "{} ({})", self.semantic, git_describe),
            None => write!(f, "{}", self.semantic),
        }
    }
}
