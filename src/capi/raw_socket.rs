//! The platform-specific raw socket type handed back by `arti_rpc_conn_open_stream`.

#[cfg(unix)]
pub type ArtiRpcRawSocket = std::os::raw::c_int;
#[cfg(windows)]
pub type ArtiRpcRawSocket = windows_sys::Win32::Networking::WinSock::SOCKET;

#[cfg(unix)]
pub const INVALID_SOCKET: ArtiRpcRawSocket = -1;
#[cfg(windows)]
pub const INVALID_SOCKET: ArtiRpcRawSocket = windows_sys::Win32::Networking::WinSock::INVALID_SOCKET;

#[cfg(unix)]
pub fn into_raw_socket(stream: std::net::TcpStream) -> ArtiRpcRawSocket {
    use std::os::unix::io::IntoRawFd;
    stream.into_raw_fd()
}

#[cfg(windows)]
pub fn into_raw_socket(stream: std::net::TcpStream) -> ArtiRpcRawSocket {
    use std::os::windows::io::IntoRawSocket;
    stream.into_raw_socket() as ArtiRpcRawSocket
}
