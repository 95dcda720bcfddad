//! `ArtiRpcStr`: an owned, NUL-terminated string handed back across the FFI
//! boundary (RPC responses, stream object ids).

use std::ffi::{c_char, CString};

pub struct ArtiRpcStr(CString);

impl ArtiRpcStr {
    pub(crate) fn new(s: impl Into<String>) -> Box<Self> {
        let cstring = CString::new(s.into()).unwrap_or_else(|e| {
            // An embedded NUL can't happen for a JSON response or object id; if
            // it ever does, truncate rather than panic across the FFI boundary.
            let mut bytes = e.into_vec();
            bytes.retain(|&b| b != 0);
            CString::new(bytes).expect("NUL bytes were just stripped")
        });
        Box::new(ArtiRpcStr(cstring))
    }
}

/// Return a const pointer to the NUL-terminated, UTF-8 contents of `string`.
/// NULL if `string` is NULL.
///
/// # Safety
/// `string` must be NULL or a live pointer previously returned by this
/// library. The result is valid only as long as `string` is not freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_str_get(string: *const ArtiRpcStr) -> *const c_char {
    match string.as_ref() {
        Some(s) => s.0.as_ptr(),
        None => std::ptr::null(),
    }
}

/// Free a string returned by this library.
///
/// # Safety
/// `string` must be NULL or a pointer previously returned by this library and
/// not already freed.
#[no_mangle]
pub unsafe extern "C" fn arti_rpc_str_free(string: *mut ArtiRpcStr) {
    if !string.is_null() {
        drop(Box::from_raw(string));
    }
}
