//! Client library for Arti's RPC protocol.
//!
//! Resolves a connect point, authenticates to a running instance of the
//! service, and gives callers a [`Connection`] for issuing multiplexed JSON
//! requests and opening anonymized proxy streams. Does not interpret request
//! or response bodies beyond the envelope needed to correlate them; callers
//! own the RPC method vocabulary.

mod auth;
mod builder;
mod conn;
mod connect_point;
mod dispatch;
mod error;
mod framing;
mod handle;
mod msgs;
mod proxy;
mod transport;
mod util;

#[cfg(feature = "capi")]
pub mod capi;

pub use builder::ConnBuilder;
pub use conn::Connection;
pub use connect_point::EntryType;
pub use error::{Error, Status};
pub use handle::Handle;
pub use msgs::ResponseKind;
pub use proxy::OpenedStream;
