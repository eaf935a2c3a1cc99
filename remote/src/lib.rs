//! Transport capability used by the execution engine
//!
//! A connection to a remote is a chain of resources, each acquired from the previous one:
//!
//! ```text
//! Transport::connect -> Socket::handshake -> Session::open_channel -> Channel::open
//!      (socket)              (session)            (file channel)        (remote file)
//! ```
//!
//! Every resource implements [`Release`]; the engine wraps each one in a [`Guard`] right after
//! acquiring it, so resources are released exactly once, on every exit path, in reverse order
//! of acquisition.
//!
//! The [`ssh`] module provides the libssh2-backed implementation.

use std::net::SocketAddrV4;

pub mod ssh;

/// Connection steps, in the order they are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Step {
    Connect,
    Handshake,
    Authenticate,
    OpenChannel,
}

/// Process-wide initialization failures; these abort the whole run.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to initialize the network subsystem: {0:#}")]
    Network(#[source] anyhow::Error),

    #[error("failed to initialize the transport library: {0:#}")]
    Transport(#[source] anyhow::Error),
}

/// Flags for opening a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(u8);

impl OpenFlags {
    pub const READ: OpenFlags = OpenFlags(0x01);
    pub const WRITE: OpenFlags = OpenFlags(0x02);
    pub const APPEND: OpenFlags = OpenFlags(0x04);
    pub const CREATE: OpenFlags = OpenFlags(0x08);
    pub const TRUNCATE: OpenFlags = OpenFlags(0x10);
    pub const EXCLUSIVE: OpenFlags = OpenFlags(0x20);

    pub fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        OpenFlags(self.0 | rhs.0)
    }
}

/// Unix permission bits for created files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    /// `rw-r--r--`
    pub const DEFAULT_FILE: FileMode = FileMode(0o644);
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:o}", self.0)
    }
}

/// A resource that must be given back when it is no longer needed.
///
/// `release` is called at most once per resource (by its [`Guard`]); failures while releasing
/// are logged by the implementation, there is nobody left to report them to.
pub trait Release {
    fn release(&mut self);
}

/// Owns a resource and releases it when dropped.
///
/// Guards declared later in a scope are dropped first, which gives reverse-acquisition order
/// for free.
#[derive(Debug)]
pub struct Guard<T: Release> {
    resource: T,
}

impl<T: Release> Guard<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

impl<T: Release> std::ops::Deref for Guard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}

impl<T: Release> std::ops::DerefMut for Guard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.resource
    }
}

impl<T: Release> Drop for Guard<T> {
    fn drop(&mut self) {
        self.resource.release();
    }
}

pub trait Transport {
    type Socket: Socket;

    /// One-time process-wide setup. Calling it again is a no-op.
    fn init(&self) -> Result<(), InitError>;

    fn connect(&self, addr: SocketAddrV4) -> anyhow::Result<Self::Socket>;
}

/// Connected transport socket.
pub trait Socket: Release {
    type Session: Session;

    /// Start a transport session over this socket.
    fn handshake(&mut self) -> anyhow::Result<Self::Session>;
}

pub trait Session: Release {
    type Channel: Channel;

    fn authenticate(&mut self, user: &str, pass: &str) -> anyhow::Result<()>;

    /// Open the file-transfer channel; requires an authenticated session.
    fn open_channel(&mut self) -> anyhow::Result<Self::Channel>;
}

/// File-transfer channel.
pub trait Channel: Release {
    type File: RemoteFile;

    fn open(&mut self, path: &str, flags: OpenFlags, mode: FileMode) -> anyhow::Result<Self::File>;
}

pub trait RemoteFile: Release {
    /// Write `buf`, returning how many bytes the remote accepted.
    fn write(&mut self, buf: &[u8]) -> anyhow::Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Release for Tracked {
        fn release(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn guards_release_in_reverse_order() {
        let log = Rc::new(RefCell::new(vec![]));
        {
            let _first = Guard::new(Tracked {
                name: "first",
                log: log.clone(),
            });
            let _second = Guard::new(Tracked {
                name: "second",
                log: log.clone(),
            });
        }
        assert_eq!(*log.borrow(), ["second", "first"]);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn acquire_then_fail(log: &Rc<RefCell<Vec<&'static str>>>) -> anyhow::Result<()> {
            let _socket = Guard::new(Tracked {
                name: "socket",
                log: log.clone(),
            });
            anyhow::bail!("handshake failed")
        }
        let log = Rc::new(RefCell::new(vec![]));
        assert!(acquire_then_fail(&log).is_err());
        assert_eq!(*log.borrow(), ["socket"]);
    }

    #[test]
    fn open_flags_combine() {
        let flags = OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE;
        assert!(flags.contains(OpenFlags::WRITE | OpenFlags::TRUNCATE));
        assert!(!flags.contains(OpenFlags::EXCLUSIVE));
    }

    #[test]
    fn steps_display_in_kebab_case() {
        use strum::IntoEnumIterator;
        let steps: Vec<_> = Step::iter().map(|step| step.to_string()).collect();
        assert_eq!(
            steps,
            ["connect", "handshake", "authenticate", "open-channel"]
        );
        assert_eq!(FileMode::DEFAULT_FILE.to_string(), "644");
    }
}
