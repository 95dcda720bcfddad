//! The `ArtiRpcConnBuilder` / `ArtiRpcConn` / `ArtiRpcHandle` FFI surface.
//! Mirrors the external interface table one-to-one.

use super::error::ArtiRpcError;
use super::raw_socket::{into_raw_socket, ArtiRpcRawSocket, INVALID_SOCKET};
use super::status::{status_code, ArtiRpcStatus, ARTI_RPC_STATUS_SUCCESS};
use super::string::ArtiRpcStr;
use crate::builder::ConnBuilder;
use crate::connect_point::EntryType;
use crate::conn::Connection;
use crate::error::{Error, Status};
use crate::handle::Handle;
use crate::msgs::ResponseKind;
use std::ffi::{c_char, c_int, CStr, CString};

pub struct ArtiRpcConnBuilder(ConnBuilder);

pub struct ArtiRpcConn {
    conn: Connection,
    session_id_cstr: CString,
}

pub struct ArtiRpcHandle(Handle);

const ARTI_RPC_RESPONSE_TYPE_RESULT: c_int = 1;
const ARTI_RPC_RESPONSE_TYPE_UPDATE: c_int = 2;
const ARTI_RPC_RESPONSE_TYPE_ERROR: c_int = 3;

/// # Safety
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
unsafe fn set_error(error_out: *mut *mut ArtiRpcError, err: Error) -> ArtiRpcStatus {
    let status = status_code(err.status());
    if !error_out.is_null() {
        *error_out = Box::into_raw(ArtiRpcError::new(err));
    }
    status
}

/// Reads a required, non-NULL C string argument.
///
/// # Safety
/// `ptr` must be NULL or point to a valid, NUL-terminated C string.
unsafe fn required_str<'a>(ptr: *const c_char) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::new(Status::InvalidInput, "argument must not be NULL".to_string()));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| Error::new(Status::InvalidInput, format!("argument is not valid UTF-8: {e}")))
}

/// Reads an optional C string argument: NULL means `None`.
///
/// # Safety
/// `ptr` must be NULL or point to a valid, NUL-terminated C string.
unsafe fn optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, Error> {
    if ptr.is_null() {
        Ok(None)
    } else {
        required_str(ptr).map(Some)
    }
}

/// Create a new `ArtiRpcConnBuilder` with default settings.
///
/// # Safety
/// `builder_out` must be a valid, writable `*mut *mut ArtiRpcConnBuilder`.
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_builder_new(
    builder_out: *mut *mut ArtiRpcConnBuilder,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    if builder_out.is_null() {
        return set_error(error_out, Error::new(Status::InvalidInput, "builder_out must not be NULL".to_string()));
    }
    *builder_out = Box::into_raw(Box::new(ArtiRpcConnBuilder(ConnBuilder::new())));
    ARTI_RPC_STATUS_SUCCESS
}

/// Release storage held by `builder`.
///
/// # Safety
/// `builder` must be NULL or a pointer previously returned by
/// `arti_rpc_conn_builder_new` and not already freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_builder_free(builder: *mut ArtiRpcConnBuilder) {
    if !builder.is_null() {
        drop(Box::from_raw(builder));
    }
}

/// Prepend a single entry to `builder`'s connect-point search path.
///
/// # Safety
/// `builder` must be a live pointer from `arti_rpc_conn_builder_new`.
/// `entry` must be a valid, NUL-terminated C string.
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_builder_prepend_entry(
    builder: *const ArtiRpcConnBuilder,
    entry_type: c_int,
    entry: *const c_char,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let builder = match builder.as_ref() {
        Some(b) => b,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "builder must not be NULL".to_string())),
    };
    let entry_type = match entry_type {
        1 => EntryType::LiteralSpec,
        2 => EntryType::ExpandablePath,
        3 => EntryType::LiteralPath,
        other => {
            return set_error(
                error_out,
                Error::new(Status::InvalidInput, format!("unrecognized entry_type {other}")),
            )
        }
    };
    let text = match required_str(entry) {
        Ok(s) => s,
        Err(e) => return set_error(error_out, e),
    };
    builder.0.prepend_entry(entry_type, text);
    ARTI_RPC_STATUS_SUCCESS
}

/// Use `builder` to open a new RPC connection.
///
/// # Safety
/// `builder` must be a live pointer from `arti_rpc_conn_builder_new`.
/// `rpc_conn_out` must be a valid, writable `*mut *mut ArtiRpcConn`.
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_builder_connect(
    builder: *const ArtiRpcConnBuilder,
    rpc_conn_out: *mut *mut ArtiRpcConn,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let builder = match builder.as_ref() {
        Some(b) => b,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "builder must not be NULL".to_string())),
    };
    if rpc_conn_out.is_null() {
        return set_error(error_out, Error::new(Status::InvalidInput, "rpc_conn_out must not be NULL".to_string()));
    }
    match builder.0.connect() {
        Ok(conn) => {
            let session_id_cstr = CString::new(conn.session_id()).unwrap_or_default();
            *rpc_conn_out = Box::into_raw(Box::new(ArtiRpcConn { conn, session_id_cstr }));
            ARTI_RPC_STATUS_SUCCESS
        }
        Err(e) => {
            *rpc_conn_out = std::ptr::null_mut();
            set_error(error_out, e)
        }
    }
}

/// Return the object id of `rpc_conn`'s negotiated session, or NULL if none
/// was negotiated.
///
/// # Safety
/// `rpc_conn` must be NULL or a live pointer previously returned by this
/// library. The result is valid only as long as `rpc_conn` is not freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_get_session_id(rpc_conn: *const ArtiRpcConn) -> *const c_char {
    match rpc_conn.as_ref() {
        Some(c) => c.session_id_cstr.as_ptr(),
        None => std::ptr::null(),
    }
}

/// Run an RPC request over `rpc_conn` and wait for a successful response.
///
/// # Safety
/// `rpc_conn` must be a live pointer from `arti_rpc_conn_builder_connect`.
/// `msg` must be a valid, NUL-terminated C string.
/// `response_out`/`error_out` must be NULL or valid, writable out-pointers.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_execute(
    rpc_conn: *const ArtiRpcConn,
    msg: *const c_char,
    response_out: *mut *mut ArtiRpcStr,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let rpc_conn = match rpc_conn.as_ref() {
        Some(c) => c,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "rpc_conn must not be NULL".to_string())),
    };
    let msg = match required_str(msg) {
        Ok(s) => s,
        Err(e) => return set_error(error_out, e),
    };
    match rpc_conn.conn.execute(msg) {
        Ok(response) => {
            if !response_out.is_null() {
                *response_out = Box::into_raw(ArtiRpcStr::new(response));
            }
            ARTI_RPC_STATUS_SUCCESS
        }
        Err(e) => {
            if !response_out.is_null() {
                *response_out = std::ptr::null_mut();
            }
            set_error(error_out, e)
        }
    }
}

/// Send an RPC request over `rpc_conn` and return a handle for its response.
///
/// # Safety
/// `rpc_conn` must be a live pointer from `arti_rpc_conn_builder_connect`.
/// `msg` must be a valid, NUL-terminated C string.
/// `handle_out` must be a valid, writable `*mut *mut ArtiRpcHandle`.
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_execute_with_handle(
    rpc_conn: *const ArtiRpcConn,
    msg: *const c_char,
    handle_out: *mut *mut ArtiRpcHandle,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let rpc_conn = match rpc_conn.as_ref() {
        Some(c) => c,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "rpc_conn must not be NULL".to_string())),
    };
    if handle_out.is_null() {
        return set_error(error_out, Error::new(Status::InvalidInput, "handle_out must not be NULL".to_string()));
    }
    let msg = match required_str(msg) {
        Ok(s) => s,
        Err(e) => {
            *handle_out = std::ptr::null_mut();
            return set_error(error_out, e);
        }
    };
    match rpc_conn.conn.execute_with_handle(msg) {
        Ok(handle) => {
            *handle_out = Box::into_raw(Box::new(ArtiRpcHandle(handle)));
            ARTI_RPC_STATUS_SUCCESS
        }
        Err(e) => {
            *handle_out = std::ptr::null_mut();
            set_error(error_out, e)
        }
    }
}

/// Attempt to cancel the request behind `handle`.
///
/// # Safety
/// `rpc_conn` and `handle` must be live pointers from this library.
/// `error_out` must be NULL or a valid, writable `*mut *mut ArtiRpcError`.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_cancel_handle(
    rpc_conn: *const ArtiRpcConn,
    handle: *const ArtiRpcHandle,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let rpc_conn = match rpc_conn.as_ref() {
        Some(c) => c,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "rpc_conn must not be NULL".to_string())),
    };
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "handle must not be NULL".to_string())),
    };
    match rpc_conn.conn.cancel_handle(&handle.0) {
        Ok(()) => ARTI_RPC_STATUS_SUCCESS,
        Err(e) => set_error(error_out, e),
    }
}

/// Wait until some response arrives on `handle`, or an error occurs.
///
/// # Safety
/// `handle` must be a live pointer from `arti_rpc_conn_execute_with_handle`.
/// `response_out`/`response_type_out`/`error_out` must be NULL or valid,
/// writable out-pointers.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_handle_wait(
    handle: *const ArtiRpcHandle,
    response_out: *mut *mut ArtiRpcStr,
    response_type_out: *mut c_int,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    let handle = match handle.as_ref() {
        Some(h) => h,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "handle must not be NULL".to_string())),
    };
    match handle.0.wait() {
        Ok((raw, kind)) => {
            if !response_out.is_null() {
                *response_out = Box::into_raw(ArtiRpcStr::new(raw));
            }
            if !response_type_out.is_null() {
                *response_type_out = match kind {
                    ResponseKind::Result => ARTI_RPC_RESPONSE_TYPE_RESULT,
                    ResponseKind::Update => ARTI_RPC_RESPONSE_TYPE_UPDATE,
                    ResponseKind::Error => ARTI_RPC_RESPONSE_TYPE_ERROR,
                };
            }
            ARTI_RPC_STATUS_SUCCESS
        }
        Err(e) => {
            if !response_out.is_null() {
                *response_out = std::ptr::null_mut();
            }
            if !response_type_out.is_null() {
                *response_type_out = 0;
            }
            set_error(error_out, e)
        }
    }
}

/// Release storage held by `handle`. Does not cancel the underlying request.
///
/// # Safety
/// `handle` must be NULL or a pointer previously returned by this library and
/// not already freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_handle_free(handle: *mut ArtiRpcHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Close and free an open RPC connection.
///
/// # Safety
/// `rpc_conn` must be NULL or a pointer previously returned by this library
/// and not already freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_free(rpc_conn: *mut ArtiRpcConn) {
    if !rpc_conn.is_null() {
        drop(Box::from_raw(rpc_conn));
    }
}

/// Open an anonymized data stream to `hostname`:`port` over `rpc_conn`'s proxy.
///
/// # Safety
/// `rpc_conn` must be a live pointer from `arti_rpc_conn_builder_connect`.
/// `hostname` and `isolation` must be valid, NUL-terminated C strings;
/// `on_object` may be NULL. `socket_out` must be a valid, writable
/// `*mut ArtiRpcRawSocket`. `stream_id_out`/`error_out` must be NULL or valid,
/// writable out-pointers.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_conn_open_stream(
    rpc_conn: *const ArtiRpcConn,
    hostname: *const c_char,
    port: c_int,
    on_object: *const c_char,
    isolation: *const c_char,
    socket_out: *mut ArtiRpcRawSocket,
    stream_id_out: *mut *mut ArtiRpcStr,
    error_out: *mut *mut ArtiRpcError,
) -> ArtiRpcStatus {
    if !socket_out.is_null() {
        *socket_out = INVALID_SOCKET;
    }
    if !stream_id_out.is_null() {
        *stream_id_out = std::ptr::null_mut();
    }

    let rpc_conn = match rpc_conn.as_ref() {
        Some(c) => c,
        None => return set_error(error_out, Error::new(Status::InvalidInput, "rpc_conn must not be NULL".to_string())),
    };
    let hostname = match required_str(hostname) {
        Ok(s) => s,
        Err(e) => return set_error(error_out, e),
    };
    if !(0..=u16::MAX as c_int).contains(&port) {
        return set_error(error_out, Error::new(Status::InvalidInput, format!("port {port} out of range")));
    }
    let on_object = match optional_str(on_object) {
        Ok(s) => s,
        Err(e) => return set_error(error_out, e),
    };
    let isolation = match optional_str(isolation) {
        Ok(s) => s.unwrap_or(""),
        Err(e) => return set_error(error_out, e),
    };

    match rpc_conn.conn.open_stream(hostname, port as u16, on_object, isolation) {
        Ok(opened) => {
            if !socket_out.is_null() {
                *socket_out = into_raw_socket(opened.socket);
            }
            if let (false, Some(id)) = (stream_id_out.is_null(), opened.stream_id) {
                *stream_id_out = Box::into_raw(ArtiRpcStr::new(id));
            }
            ARTI_RPC_STATUS_SUCCESS
        }
        Err(e) => set_error(error_out, e),
    }
}
