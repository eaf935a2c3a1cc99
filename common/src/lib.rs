//! Configuration compiler for `ssh-exec`
//!
//! This crate turns a YAML deployment document into a validated [`Config`]: the set of remote
//! hosts and the ordered plan of commands to run on each of them. It also hosts the small run
//! harness the binary uses to set up logging and report results.
//!
//! ```
//! let config = common::Config::from_yaml(
//!     r#"
//! remotes:
//!   - {name: a, user: u, ip: 10.0.0.1, port: 22}
//! exec:
//!   - copy:
//!       - files:
//!           - {from: /tmp/x, to: /etc/x}
//! "#,
//! )
//! .unwrap();
//! assert_eq!(config.plan.len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`scope`] - stack of settings snapshots for cascading configuration
//! - [`settings`] - copy behavior flags and the `settings` block reader
//! - [`document`] - read-only node view over the parsed YAML tree
//! - [`remotes`] - remote host registry
//! - [`plan`] - commands and the `exec` compiler
//! - [`load`] - the top-level document

pub mod config;
pub mod document;
pub mod error;
pub mod load;
pub mod plan;
pub mod remotes;
pub mod scope;
pub mod settings;
pub mod version;

pub use config::{OutputConfig, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, LoadError};
pub use load::Config;
pub use plan::{Command, CopyFile, ExecPlan};
pub use remotes::{RemoteDescriptor, RemoteSet};
pub use settings::CopySettings;

fn init_logging(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_directive()));
    // a subscriber installed earlier (e.g. by a test harness) stays in place
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Install logging, run `func` and report its outcome.
///
/// Errors are printed to stderr unless `quiet` is set; the summary is printed to stdout when
/// `print_summary` is set. The result is handed back so the caller can choose an
/// exit code.
pub fn run<Summary, Error, Fun>(output: OutputConfig, func: Fun) -> Result<Summary, Error>
where
    Summary: std::fmt::Display,
    Error: std::fmt::Display,
    Fun: FnOnce() -> Result<Summary, Error>,
{
    init_logging(&output);
    tracing::debug!("ssh-exec {}", version::BuildVersion::current());
    let result = func();
    match &result {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
        }
        Err(error) => {
            if !output.quiet {
                eprintln!("{error:#}");
            }
        }
    }
    result
}
