//! SSH/SFTP transport backed by libssh2
//!
//! All calls block the current thread; there is no timeout layer.

use std::io::Write;
use std::net::{Shutdown, SocketAddrV4, TcpStream};
use std::sync::Once;

use anyhow::Context;

use crate::{FileMode, InitError, OpenFlags, Release};

static LIBSSH2_INIT: Once = Once::new();

#[derive(Debug, Default, Clone, Copy)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }
}

impl crate::Transport for SshTransport {
    type Socket = SshSocket;

    fn init(&self) -> Result<(), InitError> {
        // never fails: std brings sockets up on first use and libssh2 would otherwise
        // initialize lazily in `Session::new`. The network and transport init exit
        // codes are only reachable through other `Transport` providers.
        LIBSSH2_INIT.call_once(|| {
            tracing::debug!("initializing libssh2");
            ssh2::init();
        });
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn connect(&self, addr: SocketAddrV4) -> anyhow::Result<SshSocket> {
        let stream =
            TcpStream::connect(addr).with_context(|| format!("failed to connect to {addr}"))?;
        Ok(SshSocket {
            stream: Some(stream),
        })
    }
}

#[derive(Debug)]
pub struct SshSocket {
    stream: Option<TcpStream>,
}

impl crate::Socket for SshSocket {
    type Session = SshSession;

    fn handshake(&mut self) -> anyhow::Result<SshSession> {
        let stream = self
            .stream
            .as_ref()
            .context("socket is already closed")?
            .try_clone()
            .context("failed to duplicate socket handle")?;
        let mut session = ssh2::Session::new().context("failed to create ssh session")?;
        session.set_tcp_stream(stream);
        session.handshake().context("ssh handshake failed")?;
        Ok(SshSession {
            session: Some(session),
        })
    }
}

impl Release for SshSocket {
    fn release(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        if let Err(error) = stream.shutdown(Shutdown::Both) {
            // the peer may already be gone
            tracing::debug!("socket shutdown: {:#}", error);
        }
    }
}

pub struct SshSession {
    session: Option<ssh2::Session>,
}

impl SshSession {
    fn session(&self) -> anyhow::Result<&ssh2::Session> {
        self.session.as_ref().context("session is already closed")
    }
}

impl crate::Session for SshSession {
    type Channel = SftpChannel;

    fn authenticate(&mut self, user: &str, pass: &str) -> anyhow::Result<()> {
        let session = self.session()?;
        session
            .userauth_password(user, pass)
            .with_context(|| format!("password authentication failed for user `{user}`"))?;
        if !session.authenticated() {
            anyhow::bail!("server did not accept credentials for user `{user}`");
        }
        Ok(())
    }

    fn open_channel(&mut self) -> anyhow::Result<SftpChannel> {
        let sftp = self
            .session()?
            .sftp()
            .context("failed to open sftp channel")?;
        Ok(SftpChannel { sftp: Some(sftp) })
    }
}

impl Release for SshSession {
    fn release(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Err(error) = session.disconnect(Some(ssh2::DisconnectCode::ByApplication), ".", None)
        {
            tracing::debug!("session disconnect: {:#}", error);
        }
    }
}

pub struct SftpChannel {
    sftp: Option<ssh2::Sftp>,
}

impl crate::Channel for SftpChannel {
    type File = SftpFile;

    fn open(&mut self, path: &str, flags: OpenFlags, mode: FileMode) -> anyhow::Result<SftpFile> {
        let sftp = self.sftp.as_ref().context("sftp channel is already closed")?;
        let mode = i32::try_from(mode.0).with_context(|| format!("invalid file mode {mode}"))?;
        let file = sftp
            .open_mode(
                std::path::Path::new(path),
                ssh_open_flags(flags),
                mode,
                ssh2::OpenType::File,
            )
            .with_context(|| format!("failed to open remote file `{path}`"))?;
        Ok(SftpFile { file: Some(file) })
    }
}

impl Release for SftpChannel {
    fn release(&mut self) {
        // dropping the handle shuts the sftp subsystem down
        self.sftp.take();
    }
}

fn ssh_open_flags(flags: OpenFlags) -> ssh2::OpenFlags {
    let mut result = ssh2::OpenFlags::empty();
    for (ours, theirs) in [
        (OpenFlags::READ, ssh2::OpenFlags::READ),
        (OpenFlags::WRITE, ssh2::OpenFlags::WRITE),
        (OpenFlags::APPEND, ssh2::OpenFlags::APPEND),
        (OpenFlags::CREATE, ssh2::OpenFlags::CREATE),
        (OpenFlags::TRUNCATE, ssh2::OpenFlags::TRUNCATE),
        (OpenFlags::EXCLUSIVE, ssh2::OpenFlags::EXCLUSIVE),
    ] {
        if flags.contains(ours) {
            result |= theirs;
        }
    }
    result
}

pub struct SftpFile {
    file: Option<ssh2::File>,
}

impl crate::RemoteFile for SftpFile {
    fn write(&mut self, buf: &[u8]) -> anyhow::Result<usize> {
        let file = self.file.as_mut().context("remote file is already closed")?;
        // libssh2 accepts at most one sftp packet per call
        let mut written = 0;
        while written < buf.len() {
            let count = file
                .write(&buf[written..])
                .context("failed to write remote file")?;
            if count == 0 {
                break;
            }
            written += count;
        }
        Ok(written)
    }
}

impl Release for SftpFile {
    fn release(&mut self) {
        // libssh2 closes the handle when it is dropped
        if self.file.take().is_some() {
            tracing::trace!("remote file closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Socket, Transport};

    #[test]
    fn flags_translate() {
        let flags = ssh_open_flags(OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE);
        assert_eq!(
            flags,
            ssh2::OpenFlags::WRITE | ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE
        );
        assert_eq!(ssh_open_flags(OpenFlags::default()), ssh2::OpenFlags::empty());
    }

    #[test]
    fn init_is_idempotent() {
        let transport = SshTransport::new();
        transport.init().unwrap();
        transport.init().unwrap();
    }

    #[test]
    fn released_socket_refuses_handshake() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let std::net::SocketAddr::V4(addr) = listener.local_addr().unwrap() else {
            panic!("expected an ipv4 listener");
        };
        let mut socket = SshTransport::new().connect(addr).unwrap();
        socket.release();
        // a second release is harmless
        socket.release();
        assert!(socket.handshake().is_err());
    }
}
