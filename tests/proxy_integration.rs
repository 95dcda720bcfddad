//! Exercises `Connection::open_stream` end to end: one RPC call to allocate
//! a one-time credential, one SOCKS5 `CONNECT` against a scripted proxy,
//! with the target hostname never resolved locally.

#[path = "support/mod.rs"]
mod support;

use arti_rpc_client_core::{ConnBuilder, EntryType};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::net::UnixListener;
use std::thread;

/// A minimal scripted SOCKS5 proxy: accepts one connection, requires
/// username/password `expected_user`/`expected_pass`, and accepts a
/// `CONNECT` to any domain target.
fn run_fake_socks_proxy(listener: TcpListener, expected_user: &str, expected_pass: &str) -> String {
    let (mut sock, _) = listener.accept().unwrap();

    let mut greeting = [0u8; 3];
    sock.read_exact(&mut greeting).unwrap();
    assert_eq!(greeting, [0x05, 0x01, 0x02]);
    sock.write_all(&[0x05, 0x02]).unwrap();

    let mut auth_head = [0u8; 2];
    sock.read_exact(&mut auth_head).unwrap();
    let mut user = vec![0u8; auth_head[1] as usize];
    sock.read_exact(&mut user).unwrap();
    let mut pass_len = [0u8; 1];
    sock.read_exact(&mut pass_len).unwrap();
    let mut pass = vec![0u8; pass_len[0] as usize];
    sock.read_exact(&mut pass).unwrap();
    assert_eq!(String::from_utf8(user).unwrap(), expected_user);
    assert_eq!(String::from_utf8(pass).unwrap(), expected_pass);
    sock.write_all(&[0x01, 0x00]).unwrap();

    let mut req_head = [0u8; 4];
    sock.read_exact(&mut req_head).unwrap();
    assert_eq!(&req_head[..2], &[0x05, 0x01]);
    assert_eq!(req_head[3], 0x03, "expected a domain-name address type");
    let mut len = [0u8; 1];
    sock.read_exact(&mut len).unwrap();
    let mut domain = vec![0u8; len[0] as usize];
    sock.read_exact(&mut domain).unwrap();
    let mut port = [0u8; 2];
    sock.read_exact(&mut port).unwrap();

    // Success reply: bound address 0.0.0.0:0.
    sock.write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).unwrap();

    String::from_utf8(domain).unwrap()
}

#[test]
fn open_stream_allocates_a_credential_then_tunnels_through_socks5() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let rpc_listener = UnixListener::bind(&sock_path).unwrap();

    let proxy_listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let proxy_addr = proxy_listener.local_addr().unwrap();

    let proxy_thread = thread::spawn(move || {
        run_fake_socks_proxy(proxy_listener, "streamuser", "streampass")
    });

    let rpc_thread = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(
            &rpc_listener,
            "sess-1",
            Some(("127.0.0.1", proxy_addr.port())),
        );
        let request = support::read_json(&mut reader);
        assert_eq!(request["method"], "auth:get_proxy_info");
        let id = request["id"].clone();
        support::write_json(
            &mut writer,
            &serde_json::json!({
                "id": id,
                "result": {
                    "proxy_auth": "streamuser:streampass",
                    "stream_id": "stream-1",
                }
            }),
        );
    });

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );
    let conn = builder.connect().unwrap();

    let opened = conn.open_stream("example.invalid", 80, None, "").unwrap();
    assert_eq!(opened.stream_id.as_deref(), Some("stream-1"));
    assert_eq!(opened.socket.peer_addr().unwrap(), proxy_addr);

    let requested_domain = proxy_thread.join().unwrap();
    assert_eq!(requested_domain, "example.invalid");

    rpc_thread.join().unwrap();
}
