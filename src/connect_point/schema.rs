//! The resolved connect-point record, and TOML parsing into it.
//!
//! The exact schema is an external reference (the upstream wire/config spec);
//! this module parses the subset of fields needed to classify an entry's
//! outcome.

use crate::error::{Error, Status};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The typed core of a connect-point parse failure, before it's folded into
/// the crate's single public `Error` at this module's boundary.
#[derive(Debug, thiserror::Error)]
enum SchemaError {
    #[error("connect point is not a TOML table")]
    NotATable,
    #[error("connect point is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unrecognized transport {0:?}")]
    UnrecognizedTransport(String),
    #[error("invalid TCP address {0:?}")]
    InvalidAddress(String),
    #[error("unsupported auth scheme {0:?}")]
    UnsupportedAuthScheme(String),
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        let status = match &e {
            SchemaError::UnsupportedAuthScheme(_) => Status::NotSupported,
            _ => Status::BadConnectPointPath,
        };
        Error::new(status, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Unix,
    Tcp,
}

#[derive(Debug, Clone)]
pub enum TransportAddress {
    Path(PathBuf),
    Socket(SocketAddr),
}

#[derive(Debug, Clone)]
pub struct AuthRecipe {
    pub cookie_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ProxyOverride {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// A resolved connect point: how to reach and authenticate to the service.
#[derive(Debug, Clone)]
pub struct ConnectPointDesc {
    pub transport: TransportKind,
    pub address: TransportAddress,
    pub auth: AuthRecipe,
    pub proxy_override: ProxyOverride,
}

/// A connect point may explicitly end the search rather than be tried.
pub enum ParsedEntry {
    Point(ConnectPointDesc),
    /// The entry's `abort = true` marker: evaluation must stop here.
    ExplicitAbort,
}

/// Parses a connect-point description's TOML text.
///
/// Returns `Err` for syntactically invalid TOML or a body missing a field
/// this implementation requires; this is always classified as an
/// unrecoverable ("Abort") parse error for its entry.
pub fn parse(text: &str) -> Result<ParsedEntry, Error> {
    let value: toml::Value = toml::from_str(text)
        .map_err(|e| Error::new(Status::BadConnectPointPath, format!("invalid connect point TOML: {e}")))?;

    let table = value.as_table().ok_or(SchemaError::NotATable)?;

    if table.get("abort").and_then(toml::Value::as_bool) == Some(true) {
        return Ok(ParsedEntry::ExplicitAbort);
    }

    let transport_name = table
        .get("transport")
        .and_then(toml::Value::as_str)
        .ok_or(SchemaError::MissingField("transport"))?;

    let (transport, address) = match transport_name {
        "unix" => {
            let path = table
                .get("path")
                .and_then(toml::Value::as_str)
                .ok_or(SchemaError::MissingField("path"))?;
            (TransportKind::Unix, TransportAddress::Path(PathBuf::from(path)))
        }
        "tcp" => {
            let addr_str = table
                .get("address")
                .and_then(toml::Value::as_str)
                .ok_or(SchemaError::MissingField("address"))?;
            let addr: SocketAddr = addr_str
                .parse()
                .map_err(|_| SchemaError::InvalidAddress(addr_str.to_string()))?;
            (TransportKind::Tcp, TransportAddress::Socket(addr))
        }
        other => return Err(SchemaError::UnrecognizedTransport(other.to_string()).into()),
    };

    let auth_table = table
        .get("auth")
        .and_then(toml::Value::as_table)
        .ok_or(SchemaError::MissingField("auth"))?;
    let scheme = auth_table
        .get("scheme")
        .and_then(toml::Value::as_str)
        .unwrap_or("cookie");
    if scheme != "cookie" {
        return Err(SchemaError::UnsupportedAuthScheme(scheme.to_string()).into());
    }
    let cookie_path = auth_table
        .get("cookie_path")
        .and_then(toml::Value::as_str)
        .ok_or(SchemaError::MissingField("auth.cookie_path"))?;

    let proxy_override = table
        .get("proxy")
        .and_then(toml::Value::as_table)
        .map(|p| ProxyOverride {
            host: p.get("host").and_then(toml::Value::as_str).map(String::from),
            port: p.get("port").and_then(toml::Value::as_integer).map(|p| p as u16),
        })
        .unwrap_or_default();

    Ok(ParsedEntry::Point(ConnectPointDesc {
        transport,
        address,
        auth: AuthRecipe {
            cookie_path: PathBuf::from(cookie_path),
        },
        proxy_override,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_unix_point() {
        let text = r#"
            transport = "unix"
            path = "/run/arti/rpc.sock"
            [auth]
            cookie_path = "/run/arti/rpc.cookie"
        "#;
        match parse(text).unwrap() {
            ParsedEntry::Point(p) => {
                assert_eq!(p.transport, TransportKind::Unix);
            }
            ParsedEntry::ExplicitAbort => panic!("expected a point"),
        }
    }

    #[test]
    fn explicit_abort_marker() {
        assert!(matches!(parse("abort = true").unwrap(), ParsedEntry::ExplicitAbort));
    }

    #[test]
    fn missing_required_field_is_bad_path() {
        let err = parse(r#"transport = "unix""#).unwrap_err();
        assert_eq!(err.status(), Status::BadConnectPointPath);
    }

    #[test]
    fn invalid_toml_is_bad_path() {
        let err = parse("not valid [[[ toml").unwrap_err();
        assert_eq!(err.status(), Status::BadConnectPointPath);
    }
}
