use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A connected byte stream implementing `Read` and `Write`.
///
/// This is the I/O type every transport operation hands back, whichever
/// endpoint scheme produced it.
pub struct WireStream {
    inner: WireStreamInner,
}

enum WireStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for WireStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            WireStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for WireStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            WireStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            WireStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl WireStream {
    /// Wrap a TCP stream. Accepted sockets are forced back to blocking mode.
    pub(crate) fn from_tcp(stream: TcpStream) -> Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            inner: WireStreamInner::Tcp(stream),
        })
    }

    /// Wrap a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Result<Self> {
        stream.set_nonblocking(false)?;
        Ok(Self {
            inner: WireStreamInner::Unix(stream),
        })
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => Ok(Self {
                inner: WireStreamInner::Tcp(stream.try_clone()?),
            }),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => Ok(Self {
                inner: WireStreamInner::Unix(stream.try_clone()?),
            }),
        }
    }

    /// Shut down both halves of the connection.
    ///
    /// Errors from an already-disconnected peer are ignored.
    pub fn shutdown(&self) {
        let _ = match &self.inner {
            WireStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
    }

    /// Human-readable description of the remote end.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            WireStreamInner::Tcp(stream) => stream
                .peer_addr()
                .map(|addr| format!("tcp://{addr}"))
                .unwrap_or_else(|_| "tcp://<unknown>".to_string()),
            #[cfg(unix)]
            WireStreamInner::Unix(_) => match self.peer_credentials() {
                Some((uid, _gid, pid)) => format!("ipc:uid={uid},pid={pid}"),
                None => "ipc:<unnamed>".to_string(),
            },
        }
    }

    /// Get the credentials of a Unix-socket peer (Linux only).
    ///
    /// Returns `(uid, gid, pid)` via `SO_PEERCRED`, or `None` if unavailable.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        use std::os::fd::AsRawFd;

        let fd = match &self.inner {
            WireStreamInner::Unix(stream) => stream.as_raw_fd(),
            WireStreamInner::Tcp(_) => return None,
        };

        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid writable pointers for the provided sizes,
        // and `fd` is an open Unix socket descriptor owned by this stream.
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc == 0 && len as usize == std::mem::size_of::<libc::ucred>() {
            Some((cred.uid, cred.gid, cred.pid as u32))
        } else {
            None
        }
    }

    /// Get the credentials of a Unix-socket peer.
    ///
    /// Returns `None` on platforms that do not expose peer credentials.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<(u32, u32, u32)> {
        None
    }
}

impl std::fmt::Debug for WireStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            WireStreamInner::Tcp(_) => f.debug_struct("WireStream").field("type", &"tcp").finish(),
            #[cfg(unix)]
            WireStreamInner::Unix(_) => {
                f.debug_struct("WireStream").field("type", &"unix").finish()
            }
        }
    }
}
