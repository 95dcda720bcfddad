//! `ArtiRpcError`: the owned, clonable FFI error object.

use super::status::{status_code, ArtiRpcStatus};
use crate::error::Error;
use std::ffi::{c_char, CString};

/// Opaque error object. Treat as read-only; access only via `arti_rpc_err_*`.
pub struct ArtiRpcError {
    inner: Error,
    message_cstr: CString,
    response_cstr: Option<CString>,
}

impl ArtiRpcError {
    pub(crate) fn new(inner: Error) -> Box<Self> {
        let message_cstr = CString::new(inner.message()).unwrap_or_else(|_| {
            CString::new("error message contained an interior NUL byte").unwrap()
        });
        let response_cstr = inner
            .response()
            .and_then(|r| CString::new(r).ok());
        Box::new(ArtiRpcError {
            inner,
            message_cstr,
            response_cstr,
        })
    }

    pub(crate) fn status(&self) -> ArtiRpcStatus {
        status_code(self.inner.status())
    }
}

/// Return the status code associated with `err`. `ARTI_RPC_STATUS_INVALID_INPUT` if NULL.
///
/// # Safety
/// `err` must be NULL or a live pointer previously returned by this library.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_status(err: *const ArtiRpcError) -> ArtiRpcStatus {
    match err.as_ref() {
        Some(err) => err.status(),
        None => status_code(crate::error::Status::InvalidInput),
    }
}

/// Return the OS error code behind `err`, or 0 if there isn't one or `err` is NULL.
///
/// # Safety
/// `err` must be NULL or a live pointer previously returned by this library.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_os_error_code(err: *const ArtiRpcError) -> i32 {
    match err.as_ref() {
        Some(err) => err.inner.os_error_code(),
        None => 0,
    }
}

/// Return a human-readable message for `err`, or NULL if `err` is NULL.
///
/// # Safety
/// `err` must be NULL or a live pointer previously returned by this library.
/// The returned pointer is valid only as long as `err` is not freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_message(err: *const ArtiRpcError) -> *const c_char {
    match err.as_ref() {
        Some(err) => err.message_cstr.as_ptr(),
        None => std::ptr::null(),
    }
}

/// Return the peer's raw JSON error response behind `err`, or NULL if there
/// isn't one or `err` is NULL.
///
/// # Safety
/// `err` must be NULL or a live pointer previously returned by this library.
/// The returned pointer is valid only as long as `err` is not freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_response(err: *const ArtiRpcError) -> *const c_char {
    match err.as_ref().and_then(|e| e.response_cstr.as_ref()) {
        Some(c) => c.as_ptr(),
        None => std::ptr::null(),
    }
}

/// Return a newly allocated copy of `err`, or NULL if `err` is NULL.
///
/// # Safety
/// `err` must be NULL or a live pointer previously returned by this library.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_clone(err: *const ArtiRpcError) -> *mut ArtiRpcError {
    match err.as_ref() {
        Some(err) => Box::into_raw(ArtiRpcError::new(err.inner.clone())),
        None => std::ptr::null_mut(),
    }
}

/// Release storage held by `err`.
///
/// # Safety
/// `err` must be NULL or a pointer previously returned by this library and
/// not already freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_err_free(err: *mut ArtiRpcError) {
    if !err.is_null() {
        drop(Box::from_raw(err));
    }
}
