//! The caller-facing `Handle`: one outstanding request.

use crate::dispatch::registry::{Entry, Registry};
use crate::error::Error;
use crate::msgs::{RequestId, ResponseKind};
use std::sync::Arc;

/// Represents exactly one outstanding request.
///
/// May be shared across threads (via `clone`, or by sharing a `&Handle`);
/// multiple waiters may call [`Handle::wait`] concurrently, and each
/// delivered message goes to exactly one of them.
#[derive(Clone)]
pub struct Handle {
    id: RequestId,
    entry: Arc<Entry>,
    registry: Option<Arc<Registry>>,
}

impl Handle {
    pub(crate) fn new(id: RequestId, entry: Arc<Entry>) -> Self {
        Handle {
            id,
            entry,
            registry: None,
        }
    }

    pub(crate) fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(crate) fn id(&self) -> &RequestId {
        &self.id
    }

    /// Blocks until a message is available on this handle, or it is
    /// terminated.
    ///
    /// Receiving a peer error reply is reported as `Ok` with
    /// `ResponseKind::Error`, not as an `Err`: only [`crate::Connection::execute`]
    /// treats a peer error as a failure.
    pub fn wait(&self) -> Result<(String, ResponseKind), Error> {
        self.entry.wait()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        // Freeing a handle never cancels the request; it only lets the
        // registry forget about it once there is nothing left to deliver.
        // An Arc clone means other Handles/waiters may still be alive; the
        // registry entry itself is kept alive by any such clone regardless.
        if Arc::strong_count(&self.entry) == 1 {
            if let Some(registry) = &self.registry {
                if self.entry.is_terminated() {
                    registry.remove(&self.id);
                }
            }
        }
    }
}
