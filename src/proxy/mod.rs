//! The stream opener: turns an RPC-negotiated one-time credential into a
//! live, anonymized TCP stream via the service's SOCKS5 proxy.

mod socks5;

use crate::conn::Connection;
use crate::error::{Error, Status};
use anyhow::Context;
use serde_json::Value;
use std::net::TcpStream;
use std::time::Duration;

/// A TCP stream opened through the service's proxy, plus the server-side
/// object id naming it, if the caller asked for one.
///
/// Dropping the socket closes the local half of the connection but does not,
/// by itself, free the server-side stream object; that still requires
/// releasing `stream_id` like any other RPC object.
pub struct OpenedStream {
    pub socket: TcpStream,
    pub stream_id: Option<String>,
}

/// Allocates a one-time SOCKS5 credential for `host:port` via `conn`, then
/// completes the proxy handshake over the connection's announced proxy
/// endpoint.
pub fn open_stream(
    conn: &Connection,
    host: &str,
    port: u16,
    on_object: Option<&str>,
    isolation: &str,
) -> Result<OpenedStream, Error> {
    if host.is_empty() {
        return Err(Error::new(Status::InvalidInput, "host must not be empty".to_string()));
    }

    let target_obj = on_object.unwrap_or_else(|| conn.session_id());
    let request = serde_json::json!({
        "obj": target_obj,
        "method": "auth:get_proxy_info",
        "params": {
            "isolation": isolation,
        },
    })
    .to_string();

    let raw = conn.execute(&request)?;
    let (username, password, stream_id) = parse_proxy_credential(&raw)?;

    let endpoint = conn
        .proxy_endpoint()
        .ok_or_else(|| Error::new(Status::ProxyIo, "connection has no known proxy endpoint".to_string()))?;

    let mut socket = TcpStream::connect_timeout(&endpoint, Duration::from_secs(30)).map_err(|e| {
        let err = Error::new(Status::ProxyIo, format!("failed to connect to proxy: {e}"));
        match e.raw_os_error() {
            Some(code) => err.with_os_error(code),
            None => err,
        }
    })?;
    socket.set_nodelay(true).ok();

    socks5::connect(&mut socket, &username, &password, host, port)?;

    Ok(OpenedStream { socket, stream_id })
}

fn parse_proxy_credential(raw: &str) -> Result<(String, String, Option<String>), Error> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        Error::new(Status::PeerProtocolViolation, format!("malformed proxy credential reply: {e}"))
    })?;
    let result = value.get("result").ok_or_else(|| {
        Error::new(
            Status::PeerProtocolViolation,
            "proxy credential reply has no result field".to_string(),
        )
    })?;

    extract_credential(result).map_err(|e| Error::new(Status::PeerProtocolViolation, format!("{e:#}")))
}

/// The messy part of credential extraction, kept separate so its `Context`
/// chain doesn't have to fight the status-code plumbing above.
fn extract_credential(result: &Value) -> anyhow::Result<(String, String, Option<String>)> {
    let credential = result
        .get("proxy_auth")
        .and_then(Value::as_str)
        .context("proxy credential reply is missing proxy_auth")?;
    let (username, password) = credential
        .split_once(':')
        .context("proxy_auth is not in username:password form")?;
    let stream_id = result.get("stream_id").and_then(Value::as_str).map(str::to_string);
    Ok((username.to_string(), password.to_string(), stream_id))
}
