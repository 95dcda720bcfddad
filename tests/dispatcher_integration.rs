//! Exercises request/response multiplexing end to end against a scripted
//! peer: happy-path execute, multi-waiter fairness, cancellation, and
//! protocol-violation shutdown.

#[path = "support/mod.rs"]
mod support;

use arti_rpc_client_core::{ConnBuilder, EntryType, ResponseKind, Status};
use serde_json::Value;
use std::os::unix::net::UnixListener;
use std::thread;
use std::time::Duration;

#[test]
fn happy_path_execute_returns_peers_result() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let listener = UnixListener::bind(&sock_path).unwrap();

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );

    let peer = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(&listener, "sess-1", None);
        let request = support::read_json(&mut reader);
        let id = request["id"].clone();
        support::write_json(&mut writer, &serde_json::json!({ "id": id, "result": { "pong": true } }));
    });

    let conn = builder.connect().unwrap();
    assert!(!conn.session_id().is_empty());

    let raw = conn.execute(r#"{"obj":"session","method":"ping"}"#).unwrap();
    let v: Value = serde_json::from_str(&raw).unwrap();
    assert!(v.get("id").is_some());
    assert_eq!(v["result"]["pong"], true);

    peer.join().unwrap();
}

#[test]
fn two_waiters_split_an_update_and_a_result_a_third_sees_completed() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let listener = UnixListener::bind(&sock_path).unwrap();

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );

    let peer = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(&listener, "sess-1", None);
        let request = support::read_json(&mut reader);
        let id = request["id"].clone();
        support::write_json(&mut writer, &serde_json::json!({ "id": id, "update": { "tick": 1 } }));
        support::write_json(&mut writer, &serde_json::json!({ "id": id, "result": { "done": true } }));
    });

    let conn = builder.connect().unwrap();
    let handle = conn.execute_with_handle(r#"{"obj":"session","method":"watch"}"#).unwrap();

    // Give the peer a moment to enqueue both messages before both waiters
    // race to consume them.
    thread::sleep(Duration::from_millis(50));

    let h1 = handle.clone();
    let h2 = handle.clone();
    let t1 = thread::spawn(move || h1.wait());
    let t2 = thread::spawn(move || h2.wait());
    let (_, kind1) = t1.join().unwrap().unwrap();
    let (_, kind2) = t2.join().unwrap().unwrap();

    let mut kinds = vec![kind1, kind2];
    kinds.sort_by_key(|k| *k as i32);
    assert_eq!(kinds, vec![ResponseKind::Result, ResponseKind::Update]);

    let err = handle.wait().unwrap_err();
    assert_eq!(err.status(), Status::RequestCompleted);

    peer.join().unwrap();
}

#[test]
fn cancel_then_wait_terminates_with_a_cancellation_error() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let listener = UnixListener::bind(&sock_path).unwrap();

    let peer = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(&listener, "sess-1", None);
        // The original request: read it, but never reply.
        let _slow_request = support::read_json(&mut reader);
        // The out-of-band cancel request: acknowledge it.
        let cancel_request = support::read_json(&mut reader);
        assert_eq!(cancel_request["method"], "arti_rpc_client_core:cancel");
        let id = cancel_request["id"].clone();
        support::write_json(&mut writer, &serde_json::json!({ "id": id, "result": {} }));
    });

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );
    let conn = builder.connect().unwrap();

    let handle = conn.execute_with_handle(r#"{"obj":"session","method":"slow_op"}"#).unwrap();
    conn.cancel_handle(&handle).unwrap();
    let err = handle.wait().unwrap_err();
    assert_eq!(err.status(), Status::RequestFailed);

    peer.join().unwrap();
}

#[test]
fn cancelling_an_already_completed_request_reports_request_completed() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let listener = UnixListener::bind(&sock_path).unwrap();

    let peer = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(&listener, "sess-1", None);
        let request = support::read_json(&mut reader);
        let id = request["id"].clone();
        support::write_json(&mut writer, &serde_json::json!({ "id": id, "result": { "done": true } }));
    });

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );
    let conn = builder.connect().unwrap();

    let handle = conn.execute_with_handle(r#"{"obj":"session","method":"ping"}"#).unwrap();
    let (_, kind) = handle.wait().unwrap();
    assert_eq!(kind, ResponseKind::Result);

    let err = conn.cancel_handle(&handle).unwrap_err();
    assert_eq!(err.status(), Status::RequestCompleted);

    peer.join().unwrap();
}

#[test]
fn unknown_id_frame_shuts_the_connection_down() {
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = support::write_cookie(dir.path());
    let sock_path = dir.path().join("rpc.sock");
    let listener = UnixListener::bind(&sock_path).unwrap();

    let peer = thread::spawn(move || {
        let (mut reader, mut writer) = support::accept_and_authenticate(&listener, "sess-1", None);
        let _pending_request = support::read_json(&mut reader);
        // No request with this id was ever submitted.
        support::write_json(&mut writer, &serde_json::json!({ "id": 999_999, "result": {} }));
    });

    let builder = ConnBuilder::new();
    builder.prepend_entry(
        EntryType::LiteralSpec,
        support::connect_point_toml(&sock_path, &cookie_path),
    );
    let conn = builder.connect().unwrap();

    let handle = conn.execute_with_handle(r#"{"obj":"session","method":"slow_op"}"#).unwrap();
    let err = handle.wait().unwrap_err();
    assert_eq!(err.status(), Status::Shutdown);

    // The connection is unusable for any further request once shut down,
    // regardless of what fatal error actually tripped the shutdown.
    let mut last_err = None;
    for _ in 0..50 {
        match conn.execute(r#"{"obj":"session","method":"ping"}"#) {
            Err(e) => {
                last_err = Some(e);
                break;
            }
            Ok(_) => thread::sleep(Duration::from_millis(10)),
        }
    }
    let last_err = last_err.expect("a submit after shutdown must fail");
    assert_eq!(last_err.status(), Status::Shutdown);

    peer.join().unwrap();
}
