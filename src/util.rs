//! Small helpers shared across the connect-point and auth modules.

use crate::error::{Error, Status};
use std::path::{Path, PathBuf};

/// Expands `~` and `${VAR}`/`$VAR` markers in a connect-point path entry.
///
/// Recognized variables: `HOME` (the user's home directory) and
/// `ARTI_RPC_RUNTIME_DIR` (a user-specific runtime directory, falling back to
/// a temp-dir-relative path if the platform has no better notion of one).
/// Any other `$NAME` reference is a fatal parse error for that entry.
pub fn expand_path(raw: &str) -> Result<PathBuf, Error> {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();

    if raw.starts_with('~') {
        let home = home_dir()?;
        out.push_str(&home.to_string_lossy());
        chars.next();
    }

    while let Some(c) = chars.next() {
        if c == '$' {
            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next();
            }
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if braced {
                if chars.peek() == Some(&'}') {
                    chars.next();
                } else {
                    return Err(Error::new(
                        Status::BadConnectPointPath,
                        format!("unterminated variable reference in {raw:?}"),
                    ));
                }
            }
            out.push_str(&resolve_var(&name, raw)?);
        } else {
            out.push(c);
        }
    }

    Ok(PathBuf::from(out))
}

fn resolve_var(name: &str, context: &str) -> Result<String, Error> {
    match name {
        "HOME" => Ok(home_dir()?.to_string_lossy().into_owned()),
        "ARTI_RPC_RUNTIME_DIR" => Ok(runtime_dir().to_string_lossy().into_owned()),
        other => Err(Error::new(
            Status::BadConnectPointPath,
            format!("unrecognized path variable ${other} in {context:?}"),
        )),
    }
}

fn home_dir() -> Result<PathBuf, Error> {
    dirs::home_dir().ok_or_else(|| {
        Error::new(
            Status::BadConnectPointPath,
            "could not determine the user's home directory".to_string(),
        )
    })
}

fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
}

/// Reads a platform path list (`:` on Unix, `;` on Windows) from an
/// environment variable, returning an empty vec if it is unset.
pub fn read_path_list_env(var: &str) -> Vec<PathBuf> {
    std::env::var_os(var)
        .map(|v| std::env::split_paths(&v).collect())
        .unwrap_or_default()
}

/// Whether `path` looks like it needs variable/`~` expansion.
pub fn looks_expandable(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.starts_with('~') || s.contains('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_variable() {
        let err = expand_path("$NOT_A_REAL_VAR/foo").unwrap_err();
        assert_eq!(err.status(), Status::BadConnectPointPath);
    }

    #[test]
    fn expands_home_prefix() {
        let p = expand_path("~/rpc/connect.d").unwrap();
        assert!(p.to_string_lossy().ends_with("/rpc/connect.d"));
    }
}
