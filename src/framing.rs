//! Reads and writes newline-delimited JSON frames.

use crate::error::{Error, Status};
use crate::msgs::{self, IncomingMessage};
use crate::transport::Transport;
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

/// The inbound half of the framing codec: decodes one JSON object per line.
/// Embedded newlines in strings are JSON-escaped by construction, so a raw
/// `\n` byte always terminates a frame.
pub struct FrameReader {
    inner: BufReader<Transport>,
}

impl FrameReader {
    pub fn new(transport: Transport) -> Self {
        FrameReader {
            inner: BufReader::new(transport),
        }
    }

    /// Reads and decodes the next frame. `Ok(None)` means a clean EOF.
    pub fn read_frame(&mut self) -> Result<Option<IncomingMessage>, Error> {
        let mut line = String::new();
        let n = self
            .inner
            .read_line(&mut line)
            .map_err(Error::from)?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            // Tolerate a stray blank line between frames rather than treating
            // whitespace-only input as a violation.
            return self.read_frame();
        }
        msgs::parse_incoming(trimmed).map(Some)
    }
}

/// The outbound half: a single writer gate so concurrent submitters never
/// interleave partial frames on the wire.
pub struct FrameWriter {
    inner: Mutex<Transport>,
}

impl FrameWriter {
    pub fn new(transport: Transport) -> Self {
        FrameWriter {
            inner: Mutex::new(transport),
        }
    }

    pub fn write_frame(&self, line: &str) -> Result<(), Error> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::new(Status::Internal, "writer gate poisoned".to_string()))?;
        guard.write_all(line.as_bytes()).map_err(Error::from)?;
        guard.write_all(b"\n").map_err(Error::from)?;
        guard.flush().map_err(Error::from)?;
        Ok(())
    }

    /// Shuts the underlying transport down, waking any other handle to the
    /// same socket (e.g. a reader thread's independent `try_clone`) that is
    /// blocked in a read.
    pub fn shutdown(&self) {
        if let Ok(guard) = self.inner.lock() {
            guard.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    #[cfg(unix)]
    use std::os::unix::net::UnixStream;

    #[cfg(unix)]
    #[test]
    fn round_trips_a_frame() {
        let (a, mut b) = UnixStream::pair().unwrap();
        let writer = FrameWriter::new(Transport::Unix(a));
        writer.write_frame(r#"{"id":1,"result":{}}"#).unwrap();
        let mut buf = [0u8; 64];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"{\"id\":1,\"result\":{}}\n");
    }

    #[cfg(unix)]
    #[test]
    fn reads_multiple_frames() {
        let (mut a, b) = UnixStream::pair().unwrap();
        a.write_all(b"{\"id\":1,\"update\":{}}\n{\"id\":1,\"result\":{}}\n")
            .unwrap();
        drop(a);
        let mut reader = FrameReader::new(Transport::Unix(b));
        let first = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.kind, msgs::ResponseKind::Update);
        let second = reader.read_frame().unwrap().unwrap();
        assert_eq!(second.kind, msgs::ResponseKind::Result);
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn malformed_frame_is_a_protocol_violation() {
        let (mut a, b) = UnixStream::pair().unwrap();
        a.write_all(b"not json\n").unwrap();
        drop(a);
        let mut reader = FrameReader::new(Transport::Unix(b));
        let err = reader.read_frame().unwrap_err();
        assert_eq!(err.status(), Status::PeerProtocolViolation);
    }
}
