//! The caller-facing `Connection`: a long-lived, thread-safe handle onto one
//! authenticated RPC connection.

use crate::auth::SessionInfo;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::handle::Handle;
use crate::msgs::ResponseKind;
use crate::proxy;
use crate::transport::Transport;
use std::net::SocketAddr;
use std::sync::Arc;

struct Inner {
    dispatcher: Dispatcher,
    session_id: String,
    proxy_endpoint: Option<SocketAddr>,
}

/// A connection to the RPC service. Cheap to clone; every operation may be
/// invoked concurrently from any thread.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    pub(crate) fn new(transport: Transport, session: SessionInfo) -> Result<Self, Error> {
        let dispatcher = Dispatcher::new(transport)?;
        Ok(Connection {
            inner: Arc::new(Inner {
                dispatcher,
                session_id: session.session_id,
                proxy_endpoint: session.proxy_endpoint,
            }),
        })
    }

    /// The negotiated session's object id. Stable for the connection's
    /// lifetime, readable without blocking.
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Sends `request` and blocks for its successful result.
    ///
    /// A peer error reply is surfaced as `Err` with status `REQUEST_FAILED`,
    /// unlike [`Handle::wait`], which reports it as a successful `ERROR`
    /// response. The injected/validated id is present in the returned JSON.
    pub fn execute(&self, request: &str) -> Result<String, Error> {
        let (_id, entry) = self.inner.dispatcher.submit(request)?;
        let (raw, kind) = entry.wait()?;
        match kind {
            ResponseKind::Result => Ok(raw),
            ResponseKind::Error => Err(crate::error::Error::new(
                crate::error::Status::RequestFailed,
                "request failed".to_string(),
            )
            .with_response(raw)),
            ResponseKind::Update => unreachable!("wait() never returns a non-terminal update"),
        }
    }

    /// Sends `request` and returns a [`Handle`] for waiting/cancelling it.
    pub fn execute_with_handle(&self, request: &str) -> Result<Handle, Error> {
        let (id, entry) = self.inner.dispatcher.submit(request)?;
        Ok(Handle::new(id, entry).with_registry(self.inner.dispatcher.registry()))
    }

    /// Cancels the request behind `handle`.
    pub fn cancel_handle(&self, handle: &Handle) -> Result<(), Error> {
        self.inner.dispatcher.cancel(handle.id())
    }

    /// Opens an anonymized TCP stream through the service's proxy.
    pub fn open_stream(
        &self,
        host: &str,
        port: u16,
        on_object: Option<&str>,
        isolation: &str,
    ) -> Result<proxy::OpenedStream, Error> {
        proxy::open_stream(self, host, port, on_object, isolation)
    }

    pub(crate) fn proxy_endpoint(&self) -> Option<SocketAddr> {
        self.inner.proxy_endpoint
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
