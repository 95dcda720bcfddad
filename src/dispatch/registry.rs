//! The Handle Registry: per-request state, keyed by request id.

use crate::error::{Error, Status};
use crate::msgs::RequestId;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

/// What eventually resolves a pending entry.
#[derive(Debug, Clone)]
pub enum Terminal {
    /// The peer's own terminal reply (`result` or `error`), verbatim.
    Peer { raw: String, is_error: bool },
    Cancelled,
    ConnectionLost,
}

enum QueueItem {
    Update(String),
    Terminal(Terminal),
}

struct EntryState {
    queue: std::collections::VecDeque<QueueItem>,
    terminated: bool,
    cancel_sent: bool,
}

/// Shared state for one outstanding request; `Handle` holds a clone of the
/// `Arc` around this.
pub struct Entry {
    pub id: RequestId,
    state: Mutex<EntryState>,
    cv: Condvar,
}

impl Entry {
    fn new(id: RequestId) -> Self {
        Entry {
            id,
            state: Mutex::new(EntryState {
                queue: Default::default(),
                terminated: false,
                cancel_sent: false,
            }),
            cv: Condvar::new(),
        }
    }

    pub fn push_update(&self, raw: String) {
        let mut st = self.state.lock().unwrap();
        if st.terminated {
            return;
        }
        st.queue.push_back(QueueItem::Update(raw));
        self.cv.notify_all();
    }

    pub fn push_terminal(&self, terminal: Terminal) {
        let mut st = self.state.lock().unwrap();
        if st.terminated {
            return;
        }
        st.terminated = true;
        st.queue.push_back(QueueItem::Terminal(terminal));
        self.cv.notify_all();
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().unwrap().terminated
    }

    pub fn mark_cancel_sent(&self) -> bool {
        let mut st = self.state.lock().unwrap();
        if st.terminated {
            false
        } else {
            st.cancel_sent = true;
            true
        }
    }

    /// Blocks until a message is available, returning it consumed. Each
    /// delivered item (including the terminal one) is returned to exactly one
    /// caller, matching the multi-waiter fairness rule.
    pub fn wait(&self) -> Result<(String, crate::msgs::ResponseKind), Error> {
        let mut st = self.state.lock().unwrap();
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Ok(match item {
                    QueueItem::Update(raw) => (raw, crate::msgs::ResponseKind::Update),
                    QueueItem::Terminal(Terminal::Peer { raw, is_error }) => (
                        raw,
                        if is_error {
                            crate::msgs::ResponseKind::Error
                        } else {
                            crate::msgs::ResponseKind::Result
                        },
                    ),
                    QueueItem::Terminal(Terminal::Cancelled) => {
                        return Err(Error::new(
                            Status::RequestFailed,
                            "request was cancelled".to_string(),
                        ))
                    }
                    QueueItem::Terminal(Terminal::ConnectionLost) => {
                        return Err(Error::new(Status::Shutdown, "connection is shut down".to_string()))
                    }
                });
            }
            if st.terminated {
                return Err(Error::new(
                    Status::RequestCompleted,
                    "request has already completed".to_string(),
                ));
            }
            st = self.cv.wait(st).unwrap();
        }
    }
}

/// Maps request ids to [`Entry`] state for one connection.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<RequestId, Arc<Entry>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh pending entry, or `None` if `id` is already live.
    pub fn insert_pending(&self, id: RequestId) -> Option<Arc<Entry>> {
        let mut map = self.entries.lock().unwrap();
        if map.contains_key(&id) {
            return None;
        }
        let entry = Arc::new(Entry::new(id.clone()));
        map.insert(id, entry.clone());
        Some(entry)
    }

    pub fn get(&self, id: &RequestId) -> Option<Arc<Entry>> {
        self.entries.lock().unwrap().get(id).cloned()
    }

    pub fn remove(&self, id: &RequestId) {
        self.entries.lock().unwrap().remove(id);
    }

    /// Terminates every currently-tracked entry with `ConnectionLost`.
    pub fn shutdown_all(&self) {
        let map = self.entries.lock().unwrap();
        for entry in map.values() {
            entry.push_terminal(Terminal::ConnectionLost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_is_rejected() {
        let reg = Registry::new();
        assert!(reg.insert_pending(RequestId::Int(1)).is_some());
        assert!(reg.insert_pending(RequestId::Int(1)).is_none());
    }

    #[test]
    fn terminal_then_second_waiter_sees_completed() {
        let reg = Registry::new();
        let entry = reg.insert_pending(RequestId::Int(1)).unwrap();
        entry.push_terminal(Terminal::Peer {
            raw: "{}".into(),
            is_error: false,
        });
        assert!(entry.wait().is_ok());
        let err = entry.wait().unwrap_err();
        assert_eq!(err.status(), Status::RequestCompleted);
    }

    #[test]
    fn updates_delivered_before_terminal() {
        let reg = Registry::new();
        let entry = reg.insert_pending(RequestId::Int(1)).unwrap();
        entry.push_update("u1".into());
        entry.push_terminal(Terminal::Peer {
            raw: "r1".into(),
            is_error: false,
        });
        let (raw, kind) = entry.wait().unwrap();
        assert_eq!(raw, "u1");
        assert_eq!(kind, crate::msgs::ResponseKind::Update);
        let (raw, kind) = entry.wait().unwrap();
        assert_eq!(raw, "r1");
        assert_eq!(kind, crate::msgs::ResponseKind::Result);
    }

    #[test]
    fn shutdown_terminates_pending_entries() {
        let reg = Registry::new();
        let entry = reg.insert_pending(RequestId::Int(1)).unwrap();
        reg.shutdown_all();
        let err = entry.wait().unwrap_err();
        assert_eq!(err.status(), Status::Shutdown);
    }
}
