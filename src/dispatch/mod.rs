//! The Dispatcher: owns one connection, multiplexes outstanding requests.

pub mod reader;
pub mod registry;

use crate::error::{Error, Status};
use crate::framing::{FrameReader, FrameWriter};
use crate::msgs::{self, RequestId};
use crate::transport::Transport;
use reader::ShutdownState;
use registry::{Entry, Registry, Terminal};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Owns the post-authentication connection: the writer gate, the registry,
/// and the background reader thread.
pub struct Dispatcher {
    writer: FrameWriter,
    registry: Arc<Registry>,
    shutdown: Arc<ShutdownState>,
    next_id: AtomicI64,
    salt: i64,
    reader_thread: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(transport: Transport) -> std::io::Result<Self> {
        let read_half = transport.try_clone()?;
        let registry = Arc::new(Registry::new());
        let shutdown = Arc::new(ShutdownState::default());
        let reader_thread = reader::spawn(FrameReader::new(read_half), registry.clone(), shutdown.clone());
        Ok(Dispatcher {
            writer: FrameWriter::new(transport),
            registry,
            shutdown,
            next_id: AtomicI64::new(1),
            salt: connection_salt(),
            reader_thread: Some(reader_thread),
        })
    }

    fn fresh_id(&self) -> RequestId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        RequestId::Int(n ^ self.salt)
    }

    fn check_shutdown(&self) -> Result<(), Error> {
        if self.shutdown.is_shutdown() {
            // Callers always see a uniform SHUTDOWN here; the triggering
            // reason is only used to terminate already-pending entries.
            return Err(Error::new(Status::Shutdown, "connection is shut down".to_string()));
        }
        Ok(())
    }

    /// Submits a caller request, returning the bound registry entry.
    pub fn submit(&self, raw: &str) -> Result<(RequestId, Arc<Entry>), Error> {
        self.check_shutdown()?;

        let (id, line) = msgs::prepare_outgoing(raw, || self.fresh_id())?;

        let entry = self.registry.insert_pending(id.clone()).ok_or_else(|| {
            Error::new(Status::InvalidInput, format!("request id {id} is already in use"))
        })?;

        if let Err(e) = self.writer.write_frame(&line) {
            entry.push_terminal(Terminal::ConnectionLost);
            self.registry.remove(&id);
            return Err(e);
        }

        tracing::debug!(request_id = %id, "submitted rpc request");
        Ok((id, entry))
    }

    /// Submits an internal control request (e.g. a cancellation) and blocks
    /// for its own terminal reply, independent of any other handle's state.
    fn call_internal(&self, raw: &str) -> Result<(String, crate::msgs::ResponseKind), Error> {
        let (id, entry) = self.submit(raw)?;
        let result = entry.wait();
        self.registry.remove(&id);
        result
    }

    /// Issues an out-of-band cancel for `id`.
    ///
    /// Cancelling a request that has already terminated (whether by a peer
    /// reply, a previous cancel, or connection loss) is itself a no-op, but
    /// is reported as `REQUEST_COMPLETED`, not success: the handle has
    /// nothing left to cancel.
    pub fn cancel(&self, id: &RequestId) -> Result<(), Error> {
        let already_completed = || {
            Error::new(Status::RequestCompleted, "request has already completed".to_string())
        };

        let entry = match self.registry.get(id) {
            Some(e) => e,
            None => return Err(already_completed()),
        };
        if entry.is_terminated() {
            return Err(already_completed());
        }
        if !entry.mark_cancel_sent() {
            return Err(already_completed());
        }

        self.check_shutdown()?;
        let cancel_msg = serde_json::json!({
            "method": "arti_rpc_client_core:cancel",
            "params": { "request_id": serde_json::Value::from(id) },
        })
        .to_string();

        match self.call_internal(&cancel_msg) {
            Ok((_, kind)) if kind != crate::msgs::ResponseKind::Error => {
                entry.push_terminal(Terminal::Cancelled);
                Ok(())
            }
            Ok((raw, _)) => Err(Error::new(Status::RequestFailed, "peer rejected cancellation".to_string())
                .with_response(raw)),
            Err(e) if e.status() == Status::RequestCompleted => Err(already_completed()),
            Err(e) => Err(e),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    pub(crate) fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.registry.shutdown_all();
        // Shut the transport down so the reader thread's independent socket
        // handle wakes from its blocking read instead of waiting forever on
        // a peer that never closes the connection.
        self.writer.shutdown();
        if let Some(handle) = self.reader_thread.take() {
            // The reader wakes on shutdown/EOF/IO error; detach rather than
            // block the dropping thread on it.
            drop(handle);
        }
    }
}

fn connection_salt() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);
    nanos.wrapping_mul(0x9E37_79B9_7F4A_7C15u64 as i64) | 1
}
