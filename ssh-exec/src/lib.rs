//! `ssh-exec` runs a deployment plan described in a YAML file against a list of remotes.
//!
//! For every remote, in declaration order, it connects over SSH, authenticates with a
//! password, opens an SFTP channel and copies the configured files. A remote that can not be
//! reached is reported and skipped; the run continues with the next one.
//!
//! # Configuration
//!
//! ```yaml
//! remotes:
//!   - name: web-1
//!     user: deploy
//!     pass: secret
//!     ip: 10.0.0.1
//!     port: 22
//! exec:
//!   - copy:
//!       - settings:
//!           flags: [allow-next-target-files-overwrite]
//!       - files:
//!           - from: ./build/app.conf
//!             to: /etc/app.conf
//! ```
//!
//! Settings cascade: `allow-next-target-files-overwrite` and `deny-next-target-files-overwrite`
//! stick to the following items, `no-target-files-overwrite` applies to one item only.
//!
//! # Exit codes
//!
//! See [`error::RunError::exit_code`]. Failures of individual remotes or files do not change
//! the exit code; use `--summary` to see them counted.

pub mod engine;
pub mod error;

pub use engine::{Engine, Summary};
pub use error::RunError;
