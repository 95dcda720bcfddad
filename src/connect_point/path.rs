//! Search-path assembly.

use crate::util;
use std::path::PathBuf;

pub const OVERRIDE_VAR: &str = "ARTI_RPC_CONNECT_PATH_OVERRIDE";
pub const DEFAULT_VAR: &str = "ARTI_RPC_CONNECT_PATH";

/// One entry in the connect-point search path.
#[derive(Debug, Clone)]
pub enum SearchPathEntry {
    /// An inline connect-point description, parsed directly (no expansion).
    LiteralSpec(String),
    /// A path whose `~`/`$VAR` markers are substituted before reading.
    ExpandablePath(PathBuf),
    /// A path read verbatim, with no substitution.
    LiteralPath(PathBuf),
}

/// Builder-facing tag for [`SearchPathEntry`], matching the external
/// interface's `entry_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EntryType {
    LiteralSpec = 1,
    ExpandablePath = 2,
    LiteralPath = 3,
}

impl SearchPathEntry {
    pub fn new(entry_type: EntryType, text: String) -> Self {
        match entry_type {
            EntryType::LiteralSpec => SearchPathEntry::LiteralSpec(text),
            EntryType::ExpandablePath => SearchPathEntry::ExpandablePath(PathBuf::from(text)),
            EntryType::LiteralPath => SearchPathEntry::LiteralPath(PathBuf::from(text)),
        }
    }
}

/// Built-in entries tried after everything else, so a vanilla install with no
/// configuration at all can still find a same-user, default-configured Arti.
fn builtin_defaults() -> Vec<SearchPathEntry> {
    vec![
        SearchPathEntry::ExpandablePath(PathBuf::from("~/.local/share/arti/rpc/connect.d/default.toml")),
        SearchPathEntry::ExpandablePath(PathBuf::from(
            "${ARTI_RPC_RUNTIME_DIR}/arti/rpc/connect.toml",
        )),
    ]
}

/// Assembles the full, ordered search path:
/// override env entries, then caller-prepended entries, then default env
/// entries, then built-in defaults.
pub fn build(prepended: Vec<SearchPathEntry>) -> Vec<SearchPathEntry> {
    let mut path = Vec::new();
    path.extend(env_entries(OVERRIDE_VAR));
    path.extend(prepended);
    path.extend(env_entries(DEFAULT_VAR));
    path.extend(builtin_defaults());
    path
}

fn env_entries(var: &str) -> Vec<SearchPathEntry> {
    util::read_path_list_env(var)
        .into_iter()
        .map(|p| {
            if util::looks_expandable(&p) {
                SearchPathEntry::ExpandablePath(p)
            } else {
                SearchPathEntry::LiteralPath(p)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_precedes_prepended_precedes_default() {
        std::env::set_var(OVERRIDE_VAR, "/override/a");
        std::env::set_var(DEFAULT_VAR, "/default/b");
        let path = build(vec![SearchPathEntry::LiteralPath(PathBuf::from("/prepended/c"))]);
        std::env::remove_var(OVERRIDE_VAR);
        std::env::remove_var(DEFAULT_VAR);

        let as_paths: Vec<PathBuf> = path
            .iter()
            .filter_map(|e| match e {
                SearchPathEntry::LiteralPath(p) | SearchPathEntry::ExpandablePath(p) => Some(p.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(as_paths[0], PathBuf::from("/override/a"));
        assert_eq!(as_paths[1], PathBuf::from("/prepended/c"));
        assert_eq!(as_paths[2], PathBuf::from("/default/b"));
    }
}
