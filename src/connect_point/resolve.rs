//! Evaluates a search path in order until one entry yields a usable,
//! authenticated connection.

use super::path::SearchPathEntry;
use super::schema::{self, ConnectPointDesc, ParsedEntry, TransportAddress, TransportKind};
use crate::auth;
use crate::conn::Connection;
use crate::error::{Error, Status};
use crate::transport::Transport;
use crate::util;

/// The outcome of trying a single search-path entry.
enum Outcome {
    Usable(Connection),
    Decline,
    Abort(Error),
}

/// Runs the full search path, returning the first usable connection.
pub fn evaluate(path: &[SearchPathEntry]) -> Result<Connection, Error> {
    if path.is_empty() {
        return Err(Error::new(
            Status::AllConnectAttemptsFailed,
            "connect-point search path is empty".to_string(),
        ));
    }

    for entry in path {
        match try_entry(entry) {
            Outcome::Usable(conn) => return Ok(conn),
            Outcome::Decline => continue,
            Outcome::Abort(e) => return Err(e),
        }
    }

    Err(Error::new(
        Status::AllConnectAttemptsFailed,
        "no connect point in the search path was usable".to_string(),
    ))
}

fn try_entry(entry: &SearchPathEntry) -> Outcome {
    let text = match entry {
        SearchPathEntry::LiteralSpec(text) => text.clone(),
        SearchPathEntry::LiteralPath(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if is_benign_io(&e) => {
                tracing::debug!(path = %path.display(), "declining connect point: {e}");
                return Outcome::Decline;
            }
            Err(e) => return Outcome::Abort(e.into()),
        },
        SearchPathEntry::ExpandablePath(raw) => {
            let expanded = match util::expand_path(&raw.to_string_lossy()) {
                Ok(p) => p,
                Err(e) => return Outcome::Abort(e),
            };
            match std::fs::read_to_string(&expanded) {
                Ok(text) => text,
                Err(e) if is_benign_io(&e) => {
                    tracing::debug!(path = %expanded.display(), "declining connect point: {e}");
                    return Outcome::Decline;
                }
                Err(e) => return Outcome::Abort(e.into()),
            }
        }
    };

    let desc = match schema::parse(&text) {
        Ok(ParsedEntry::Point(desc)) => desc,
        Ok(ParsedEntry::ExplicitAbort) => {
            return Outcome::Abort(Error::new(
                Status::AllConnectAttemptsFailed,
                "connect point explicitly ended the search".to_string(),
            ))
        }
        Err(e) => return Outcome::Abort(e),
    };

    match connect_and_auth(&desc) {
        Ok(conn) => Outcome::Usable(conn),
        Err(e) if is_benign_connect_failure(&e) => {
            tracing::debug!(reason = %e, "declining connect point: transport unavailable");
            Outcome::Decline
        }
        Err(e) => Outcome::Abort(e),
    }
}

fn connect_and_auth(desc: &ConnectPointDesc) -> Result<Connection, Error> {
    let mut transport = match &desc.address {
        TransportAddress::Path(path) => {
            if desc.transport != TransportKind::Unix {
                return Err(Error::new(
                    Status::BadConnectPointPath,
                    "path address requires a unix transport".to_string(),
                ));
            }
            Transport::connect_unix(path)?
        }
        TransportAddress::Socket(addr) => {
            if desc.transport != TransportKind::Tcp {
                return Err(Error::new(
                    Status::BadConnectPointPath,
                    "socket address requires a tcp transport".to_string(),
                ));
            }
            Transport::connect_tcp(*addr)?
        }
    };

    let session = auth::authenticate(&mut transport, &desc.auth, &desc.proxy_override)?;
    Connection::new(transport, session)
}

/// I/O failures that mean "this entry's transport isn't available here",
/// not "something is badly wrong".
fn is_benign_io(e: &std::io::Error) -> bool {
    use std::io::ErrorKind::*;
    matches!(
        e.kind(),
        NotFound | PermissionDenied | ConnectionRefused | Unsupported
    )
}

fn is_benign_connect_failure(e: &Error) -> bool {
    matches!(
        e.status(),
        Status::ConnectIo | Status::ConnectPointNotUsable | Status::NotSupported
    )
}
