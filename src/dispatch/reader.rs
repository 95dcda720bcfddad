//! The single background reader task: decodes frames and routes them by id.

use super::registry::{Registry, Terminal};
use crate::error::{Error, Status};
use crate::framing::FrameReader;
use crate::msgs::ResponseKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Tracks whether the connection has gone fatally wrong, and why.
#[derive(Default)]
pub struct ShutdownState {
    flag: AtomicBool,
    reason: std::sync::Mutex<Option<Error>>,
}

impl ShutdownState {
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<Error> {
        self.reason.lock().unwrap().clone()
    }

    fn trigger(&self, err: Error) {
        let mut guard = self.reason.lock().unwrap();
        if guard.is_none() {
            *guard = Some(err);
        }
        self.flag.store(true, Ordering::Release);
    }
}

/// Spawns the reader thread. It runs until EOF or a fatal protocol error,
/// then terminates every tracked entry and marks the connection shut down.
pub fn spawn(
    mut frames: FrameReader,
    registry: Arc<Registry>,
    shutdown: Arc<ShutdownState>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("arti-rpc-reader".into())
        .spawn(move || {
            let fatal = loop {
                match frames.read_frame() {
                    Ok(None) => {
                        break Error::new(Status::Shutdown, "peer closed the connection".to_string())
                    }
                    Ok(Some(msg)) => {
                        if let Err(e) = dispatch_one(&registry, msg) {
                            break e;
                        }
                    }
                    Err(e) => break e,
                }
            };
            tracing::error!(reason = %fatal, "rpc connection reader shutting down");
            shutdown.trigger(fatal);
            registry.shutdown_all();
        })
        .expect("failed to spawn rpc reader thread")
}

fn dispatch_one(registry: &Registry, msg: crate::msgs::IncomingMessage) -> Result<(), Error> {
    let id = msg.id.clone().ok_or_else(|| {
        Error::new(
            Status::PeerProtocolViolation,
            "message lacks a required id field".to_string(),
        )
    })?;
    let entry = registry.get(&id).ok_or_else(|| {
        Error::new(
            Status::PeerProtocolViolation,
            format!("message refers to unknown request id {id}"),
        )
    })?;

    if entry.is_terminated() && msg.kind.is_terminal() {
        return Err(Error::new(
            Status::PeerProtocolViolation,
            format!("duplicate terminal message for request id {id}"),
        ));
    }

    match msg.kind {
        ResponseKind::Update => entry.push_update(msg.raw),
        ResponseKind::Result => entry.push_terminal(Terminal::Peer {
            raw: msg.raw,
            is_error: false,
        }),
        ResponseKind::Error => entry.push_terminal(Terminal::Peer {
            raw: msg.raw,
            is_error: true,
        }),
    }
    Ok(())
}
