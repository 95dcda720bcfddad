//! The authentication handshake: hello, method selection, proof of
//! possession of the cookie, session negotiation.
//!
//! The exact wire shape of the handshake is an external reference (the
//! upstream RPC wire spec); this module implements a JSON-RPC-flavored hello
//! / cookie-proof exchange for authenticating to the service.

use crate::connect_point::schema::{AuthRecipe, ProxyOverride};
use crate::error::{Error, Status};
use crate::transport::Transport;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;

/// What a successful handshake negotiates.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub proxy_endpoint: Option<SocketAddr>,
}

pub fn authenticate(
    transport: &mut Transport,
    recipe: &AuthRecipe,
    proxy_override: &ProxyOverride,
) -> Result<SessionInfo, Error> {
    let cookie = read_cookie(&recipe.cookie_path)?;

    write_line(
        transport,
        &serde_json::json!({ "hello": { "client": "arti-rpc-client-core" } }).to_string(),
    )?;

    let mut reader = BufReader::new(read_half(transport)?);
    let hello_reply = read_line(&mut reader)?;
    let hello: serde_json::Value = serde_json::from_str(&hello_reply).map_err(|e| {
        Error::new(
            Status::PeerProtocolViolation,
            format!("malformed hello reply: {e}"),
        )
    })?;
    let hello = hello.get("hello").ok_or_else(|| {
        Error::new(
            Status::PeerProtocolViolation,
            "hello reply is missing a hello field".to_string(),
        )
    })?;

    let methods = hello
        .get("auth_methods")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            Error::new(
                Status::PeerProtocolViolation,
                "hello reply is missing auth_methods".to_string(),
            )
        })?;
    let supports_cookie = methods.iter().any(|m| m.as_str() == Some("cookie"));
    if !supports_cookie {
        return Err(Error::new(
            Status::PeerProtocolViolation,
            "peer does not advertise mandatory cookie authentication".to_string(),
        ));
    }

    let announced_proxy = hello
        .get("proxy_endpoint")
        .and_then(parse_proxy_endpoint);

    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&cookie)
        .expect("HMAC accepts a key of any length");
    mac.update(&nonce);
    let tag = mac.finalize().into_bytes();

    write_line(
        transport,
        &serde_json::json!({
            "id": "auth",
            "auth": {
                "method": "cookie",
                "nonce": hex::encode(nonce),
                "mac": hex::encode(tag),
            }
        })
        .to_string(),
    )?;

    let auth_reply = read_line(&mut reader)?;
    let auth_reply: serde_json::Value = serde_json::from_str(&auth_reply).map_err(|e| {
        Error::new(
            Status::PeerProtocolViolation,
            format!("malformed auth reply: {e}"),
        )
    })?;

    if auth_reply.get("error").is_some() {
        return Err(
            Error::new(Status::BadAuth, "peer rejected authentication credential".to_string())
                .with_response(auth_reply.to_string()),
        );
    }

    let session_id = auth_reply
        .get("result")
        .and_then(|r| r.get("session"))
        .and_then(|s| s.as_str())
        .ok_or_else(|| {
            Error::new(
                Status::PeerProtocolViolation,
                "auth reply has no session id".to_string(),
            )
        })?
        .to_string();

    let proxy_endpoint = match (proxy_override.host.as_deref(), proxy_override.port) {
        (Some(host), Some(port)) => format!("{host}:{port}").parse().ok(),
        _ => announced_proxy,
    };

    Ok(SessionInfo {
        session_id,
        proxy_endpoint,
    })
}

fn read_cookie(path: &std::path::Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| {
        let status = if e.kind() == std::io::ErrorKind::NotFound
            || e.kind() == std::io::ErrorKind::PermissionDenied
        {
            Status::ConnectPointNotUsable
        } else {
            Status::ConnectIo
        };
        Error::new(status, format!("could not read cookie file: {e}")).with_os_error(
            e.raw_os_error().unwrap_or(0),
        )
    })
}

fn read_half(transport: &Transport) -> Result<Transport, Error> {
    transport.try_clone().map_err(Error::from)
}

fn write_line(transport: &mut Transport, line: &str) -> Result<(), Error> {
    transport.write_all(line.as_bytes()).map_err(Error::from)?;
    transport.write_all(b"\n").map_err(Error::from)?;
    transport.flush().map_err(Error::from)?;
    Ok(())
}

fn read_line(reader: &mut BufReader<Transport>) -> Result<String, Error> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).map_err(Error::from)?;
    if n == 0 {
        return Err(Error::new(
            Status::ConnectIo,
            "peer closed the connection during authentication".to_string(),
        ));
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

fn parse_proxy_endpoint(v: &serde_json::Value) -> Option<SocketAddr> {
    let host = v.get("host")?.as_str()?;
    let port = v.get("port")?.as_u64()? as u16;
    format!("{host}:{port}").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::net::UnixStream;
    use std::thread;

    #[cfg(unix)]
    #[test]
    fn successful_handshake_yields_session() {
        let (client_sock, server_sock) = UnixStream::pair().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cookie_path = dir.path().join("cookie");
        std::fs::write(&cookie_path, b"0123456789abcdef0123456789abcdef").unwrap();

        let server = thread::spawn(move || {
            let mut reader = BufReader::new(server_sock.try_clone().unwrap());
            let mut sock = server_sock;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            sock.write_all(br#"{"hello":{"auth_methods":["cookie"],"proxy_endpoint":{"host":"127.0.0.1","port":9150}}}"#)
                .unwrap();
            sock.write_all(b"\n").unwrap();
            let mut line2 = String::new();
            reader.read_line(&mut line2).unwrap();
            sock.write_all(br#"{"id":"auth","result":{"session":"sess1"}}"#)
                .unwrap();
            sock.write_all(b"\n").unwrap();
        });

        let recipe = AuthRecipe {
            cookie_path,
        };
        let mut transport = Transport::Unix(client_sock);
        let session = authenticate(&mut transport, &recipe, &ProxyOverride::default()).unwrap();
        assert_eq!(session.session_id, "sess1");
        assert_eq!(session.proxy_endpoint.unwrap().port(), 9150);
        server.join().unwrap();
    }
}
