//! The reliable byte-stream transports a connect point can name.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

/// Either side of an open transport, cloned so the reader and writer can own
/// independent handles to the same underlying socket.
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Transport {
    pub fn connect_tcp(addr: SocketAddr) -> io::Result<Self> {
        Ok(Transport::Tcp(TcpStream::connect(addr)?))
    }

    #[cfg(unix)]
    pub fn connect_unix(path: &std::path::Path) -> io::Result<Self> {
        Ok(Transport::Unix(UnixStream::connect(path)?))
    }

    #[cfg(not(unix))]
    pub fn connect_unix(_path: &std::path::Path) -> io::Result<Self> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "local-domain sockets are not supported on this platform",
        ))
    }

    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Transport::Tcp(s) => Ok(Transport::Tcp(s.try_clone()?)),
            #[cfg(unix)]
            Transport::Unix(s) => Ok(Transport::Unix(s.try_clone()?)),
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Transport::Tcp(s) => s.set_read_timeout(timeout),
            #[cfg(unix)]
            Transport::Unix(s) => s.set_read_timeout(timeout),
        }
    }

    pub fn shutdown(&self) {
        let _ = match self {
            Transport::Tcp(s) => s.shutdown(std::net::Shutdown::Both),
            #[cfg(unix)]
            Transport::Unix(s) => s.shutdown(std::net::Shutdown::Both),
        };
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Transport::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Transport::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Transport::Unix(s) => s.flush(),
        }
    }
}
