//! Shared scaffolding for the integration tests: a scripted in-process peer
//! speaking the authentication handshake and the NDJSON request protocol
//! over a Unix-domain socket, plus connect-point fixture helpers.
//!
//! No test in this crate opens a real network connection or spawns a real
//! Arti process; every peer here is a thread driving one end of a
//! `UnixStream`/`TcpStream` pair created locally.

#![allow(dead_code)]

use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

pub fn write_cookie(dir: &Path) -> PathBuf {
    let path = dir.join("rpc.cookie");
    std::fs::write(&path, b"test-cookie-0123456789abcdef").unwrap();
    path
}

/// A connect-point TOML entry naming a Unix socket and cookie file.
pub fn connect_point_toml(sock_path: &Path, cookie_path: &Path) -> String {
    format!(
        "transport = \"unix\"\npath = {:?}\n[auth]\ncookie_path = {:?}\n",
        sock_path.display().to_string(),
        cookie_path.display().to_string(),
    )
}

/// Accepts one connection on `listener` and drives the hello/cookie
/// handshake, replying with `session_id` and (if given) an announced proxy
/// endpoint. Returns a reader and writer half for the rest of the script.
pub fn accept_and_authenticate(
    listener: &UnixListener,
    session_id: &str,
    proxy_addr: Option<(&str, u16)>,
) -> (BufReader<UnixStream>, UnixStream) {
    let (stream, _) = listener.accept().unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    let _hello = read_json(&mut reader);
    let mut hello_reply = serde_json::json!({
        "hello": {
            "auth_methods": ["cookie"],
        }
    });
    if let Some((host, port)) = proxy_addr {
        hello_reply["hello"]["proxy_endpoint"] = serde_json::json!({ "host": host, "port": port });
    }
    write_json(&mut writer, &hello_reply);

    let _auth = read_json(&mut reader);
    write_json(
        &mut writer,
        &serde_json::json!({ "id": "auth", "result": { "session": session_id } }),
    );

    (reader, writer)
}

pub fn read_json(reader: &mut BufReader<UnixStream>) -> Value {
    let mut line = String::new();
    let n = reader.read_line(&mut line).unwrap();
    assert!(n > 0, "peer's stream closed before expected message");
    serde_json::from_str(line.trim_end_matches(['\n', '\r'])).unwrap()
}

pub fn write_json(writer: &mut UnixStream, value: &Value) {
    writer.write_all(value.to_string().as_bytes()).unwrap();
    writer.write_all(b"\n").unwrap();
    writer.flush().unwrap();
}
