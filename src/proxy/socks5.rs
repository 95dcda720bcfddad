//! A minimal blocking SOCKS5 client: username/password auth (RFC 1929) and
//! `CONNECT`, with hostnames forwarded as-is (no local DNS).

use crate::error::{Error, Status};
use std::io::{Read, Write};
use std::net::TcpStream;

const SOCKS_VERSION: u8 = 0x05;
const METHOD_USER_PASS: u8 = 0x02;
const AUTH_VERSION: u8 = 0x01;
const CMD_CONNECT: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV4: u8 = 0x01;
const ATYP_IPV6: u8 = 0x04;

/// Performs the SOCKS5 handshake on an already-connected `stream`, then
/// issues `CONNECT host:port`. `username`/`password` authenticate to the
/// proxy itself, not to the final destination.
pub fn connect(
    stream: &mut TcpStream,
    username: &str,
    password: &str,
    host: &str,
    port: u16,
) -> Result<(), Error> {
    greet(stream)?;
    authenticate(stream, username, password)?;
    request_connect(stream, host, port)
}

fn greet(stream: &mut TcpStream) -> Result<(), Error> {
    stream
        .write_all(&[SOCKS_VERSION, 1, METHOD_USER_PASS])
        .map_err(proxy_io)?;
    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).map_err(proxy_io)?;
    if reply[0] != SOCKS_VERSION {
        return Err(Error::new(
            Status::ProxyStreamFailed,
            "proxy did not speak SOCKS5".to_string(),
        ));
    }
    if reply[1] != METHOD_USER_PASS {
        return Err(Error::new(
            Status::ProxyStreamFailed,
            "proxy did not accept username/password authentication".to_string(),
        ));
    }
    Ok(())
}

fn authenticate(stream: &mut TcpStream, username: &str, password: &str) -> Result<(), Error> {
    if username.len() > 255 || password.len() > 255 {
        return Err(Error::new(
            Status::InvalidInput,
            "SOCKS5 username/password must each be at most 255 bytes".to_string(),
        ));
    }
    let mut msg = Vec::with_capacity(3 + username.len() + password.len());
    msg.push(AUTH_VERSION);
    msg.push(username.len() as u8);
    msg.extend_from_slice(username.as_bytes());
    msg.push(password.len() as u8);
    msg.extend_from_slice(password.as_bytes());
    stream.write_all(&msg).map_err(proxy_io)?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).map_err(proxy_io)?;
    if reply[1] != 0x00 {
        return Err(Error::new(
            Status::ProxyStreamFailed,
            "proxy rejected the stream credential".to_string(),
        ));
    }
    Ok(())
}

fn request_connect(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), Error> {
    let mut msg = vec![SOCKS_VERSION, CMD_CONNECT, 0x00];
    if let Ok(addr) = host.parse::<std::net::Ipv4Addr>() {
        msg.push(ATYP_IPV4);
        msg.extend_from_slice(&addr.octets());
    } else if let Ok(addr) = host.parse::<std::net::Ipv6Addr>() {
        msg.push(ATYP_IPV6);
        msg.extend_from_slice(&addr.octets());
    } else {
        if host.len() > 255 {
            return Err(Error::new(
                Status::InvalidInput,
                "hostname is too long for SOCKS5".to_string(),
            ));
        }
        msg.push(ATYP_DOMAIN);
        msg.push(host.len() as u8);
        msg.extend_from_slice(host.as_bytes());
    }
    msg.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&msg).map_err(proxy_io)?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).map_err(proxy_io)?;
    if head[0] != SOCKS_VERSION {
        return Err(Error::new(
            Status::ProxyStreamFailed,
            "malformed SOCKS5 reply".to_string(),
        ));
    }
    if head[1] != 0x00 {
        return Err(Error::new(
            Status::ProxyStreamFailed,
            format!("proxy refused the stream (SOCKS5 reply code {})", head[1]),
        ));
    }
    // Consume and discard the bound-address field so the connection is left
    // at the start of the tunneled byte stream.
    let skip = match head[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).map_err(proxy_io)?;
            len[0] as usize
        }
        other => {
            return Err(Error::new(
                Status::ProxyStreamFailed,
                format!("unrecognized SOCKS5 address type {other}"),
            ))
        }
    };
    let mut discard = vec![0u8; skip + 2];
    stream.read_exact(&mut discard).map_err(proxy_io)?;
    Ok(())
}

fn proxy_io(e: std::io::Error) -> Error {
    let os_error = e.raw_os_error();
    let err = Error::new(Status::ProxyIo, e.to_string());
    match os_error {
        Some(code) => err.with_os_error(code),
        None => err,
    }
}
