//! Runs a compiled plan against every remote, one remote at a time
//!
//! Per remote the connection goes through the [`Step`]s in order. A failing step abandons
//! that remote only; the run moves on to the next one. Failing commands are reported and the
//! remaining commands for the same remote still run.

use std::io::Read;

use anyhow::{anyhow, Context};
use common::{Command, CopyFile, ExecPlan, RemoteDescriptor, RemoteSet};
use remote::{
    Channel, FileMode, Guard, InitError, OpenFlags, RemoteFile, Session, Socket, Step, Transport,
};
use tracing::instrument;

/// Size of a single read from the local file and write to the remote one.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A remote that could not be taken through all connection steps.
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {remote}: {source:#}")]
pub struct RemoteError {
    pub remote: String,
    pub step: Step,
    #[source]
    pub source: anyhow::Error,
}

impl RemoteError {
    fn new(remote: &RemoteDescriptor, step: Step, source: anyhow::Error) -> Self {
        Self {
            remote: remote.to_string(),
            step,
            source,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub remotes_completed: usize,
    pub remotes_failed: usize,
    pub files_copied: usize,
    pub files_failed: usize,
    pub bytes_copied: u64,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            remotes_completed: self.remotes_completed + other.remotes_completed,
            remotes_failed: self.remotes_failed + other.remotes_failed,
            files_copied: self.files_copied + other.files_copied,
            files_failed: self.files_failed + other.files_failed,
            bytes_copied: self.bytes_copied + other.bytes_copied,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "remotes completed: {}\n\
            remotes failed: {}\n\
            files copied: {}\n\
            files failed: {}\n\
            bytes copied: {}",
            self.remotes_completed,
            self.remotes_failed,
            self.files_copied,
            self.files_failed,
            bytesize::ByteSize(self.bytes_copied),
        )
    }
}

pub struct Engine<'a, T: Transport> {
    transport: &'a T,
    chunk_size: usize,
}

impl<'a, T: Transport> Engine<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            chunk_size: CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        self.chunk_size = chunk_size;
        self
    }

    /// Run `plan` against each of `remotes` in order.
    ///
    /// Only initialization failures are returned; per-remote and per-command failures are
    /// logged and counted in the summary.
    pub fn run(&self, remotes: &RemoteSet, plan: &ExecPlan) -> Result<Summary, InitError> {
        self.transport.init()?;
        let mut summary = Summary::default();
        for remote in remotes {
            match self.run_remote(remote, plan) {
                Ok(remote_summary) => {
                    summary = summary
                        + remote_summary
                        + Summary {
                            remotes_completed: 1,
                            ..Default::default()
                        };
                }
                Err(error) => {
                    tracing::error!("{:#}", error);
                    summary.remotes_failed += 1;
                }
            }
            tracing::info!("disconnected: {}", remote);
        }
        Ok(summary)
    }

    #[instrument(skip_all, fields(remote = %remote.name))]
    fn run_remote(
        &self,
        remote: &RemoteDescriptor,
        plan: &ExecPlan,
    ) -> Result<Summary, RemoteError> {
        tracing::info!("connecting: {}", remote);
        let mut socket = Guard::new(
            self.transport
                .connect(remote.socket_addr())
                .map_err(|error| RemoteError::new(remote, Step::Connect, error))?,
        );
        tracing::info!("connected");
        let mut session = Guard::new(
            socket
                .handshake()
                .map_err(|error| RemoteError::new(remote, Step::Handshake, error))?,
        );
        tracing::info!("logging in: user=`{}`", remote.user);
        session
            .authenticate(&remote.user, &remote.pass)
            .map_err(|error| RemoteError::new(remote, Step::Authenticate, error))?;
        tracing::info!("logged in");
        let mut channel = Guard::new(
            session
                .open_channel()
                .map_err(|error| RemoteError::new(remote, Step::OpenChannel, error))?,
        );
        tracing::info!("executing");
        // channel, session and socket guards are released on return, in that order
        Ok(self.execute(&mut *channel, plan))
    }

    fn execute<C: Channel>(&self, channel: &mut C, plan: &ExecPlan) -> Summary {
        let mut summary = Summary::default();
        for command in plan {
            match command {
                Command::CopyFile(copy) => match self.copy_file(channel, copy) {
                    Ok(bytes) => {
                        summary.files_copied += 1;
                        summary.bytes_copied += bytes;
                    }
                    Err(error) => {
                        tracing::error!("{:#}", error);
                        summary.files_failed += 1;
                    }
                },
            }
        }
        summary
    }

    fn copy_file<C: Channel>(&self, channel: &mut C, copy: &CopyFile) -> anyhow::Result<u64> {
        tracing::info!(
            "copy file: from=`{}` to=`{}` flags={}",
            copy.from,
            copy.to,
            copy.settings
        );
        // the transfer always creates/truncates, the policy is only reported
        tracing::debug!("overwrite allowed: {}", copy.overwrite_allowed());
        let mut local = std::fs::File::open(&copy.from)
            .with_context(|| format!("failed to open local file `{}`", copy.from))?;
        let mut target = Guard::new(channel.open(
            &copy.to,
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            FileMode::DEFAULT_FILE,
        )?);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let count = match local.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    return Err(anyhow::Error::new(error)
                        .context(format!("failed to read local file `{}`", copy.from)));
                }
            };
            let written = target
                .write(&buffer[..count])
                .with_context(|| format!("failed to write remote file `{}`", copy.to))?;
            if written != count {
                return Err(anyhow!(
                    "short write to remote file `{}`: {} of {} bytes",
                    copy.to,
                    written,
                    count
                ));
            }
            total += count as u64;
        }
        tracing::info!("written: {}", bytesize::ByteSize(total));
        Ok(total)
    }
}
