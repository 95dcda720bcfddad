//! Connect-point resolution: the configurable search path of transport
//! endpoints evaluated in deterministic order until one yields a usable,
//! authenticated session.

pub mod path;
pub mod resolve;
pub mod schema;

pub use path::{EntryType, SearchPathEntry};
pub use resolve::evaluate;
