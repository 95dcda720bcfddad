//! `ArtiRpcStatus`: the numeric status code shared by every FFI entry point.

use crate::error::Status;
use std::ffi::c_char;

pub type ArtiRpcStatus = u32;

pub const ARTI_RPC_STATUS_SUCCESS: ArtiRpcStatus = 0;

pub(super) fn status_code(status: Status) -> ArtiRpcStatus {
    status as i32 as u32
}

/// Returns a human string for `status`, including codes this version of the
/// crate doesn't itself produce. Always non-NULL.
///
/// # Safety
/// None: this function takes no pointers.
#[no_mangle]
pub extern "C" fn arti_rpc_status_to_str(status: ArtiRpcStatus) -> *const c_char {
    match Status::from_i32(status as i32) {
        Some(s) => known_status_cstr(s),
        None => c"unrecognized status code".as_ptr(),
    }
}

fn known_status_cstr(status: Status) -> *const c_char {
    match status {
        Status::Success => c"success".as_ptr(),
        Status::InvalidInput => c"invalid input".as_ptr(),
        Status::NotSupported => c"not supported".as_ptr(),
        Status::ConnectIo => c"error during connect (IO error)".as_ptr(),
        Status::BadAuth => c"authentication failed".as_ptr(),
        Status::PeerProtocolViolation => c"peer violated the protocol".as_ptr(),
        Status::Shutdown => c"connection is shut down".as_ptr(),
        Status::Internal => c"internal error".as_ptr(),
        Status::RequestFailed => c"request failed".as_ptr(),
        Status::RequestCompleted => c"request already completed".as_ptr(),
        Status::ProxyIo => c"error communicating with proxy (IO error)".as_ptr(),
        Status::ProxyStreamFailed => c"proxy refused to open the stream".as_ptr(),
        Status::NotAuthenticated => c"not authenticated".as_ptr(),
        Status::AllConnectAttemptsFailed => c"all connect attempts failed".as_ptr(),
        Status::ConnectPointNotUsable => c"connect point was not usable".as_ptr(),
        Status::BadConnectPointPath => c"could not read or parse a connect point".as_ptr(),
    }
}
