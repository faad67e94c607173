//! Locating the PICT executable.
//!
//! Resolution order: an explicit path from the caller, then the
//! `PAIRCERT_PICT` environment variable, then a `pict` binary on `PATH`.
//! Resolution happens once, before the first attempt; the resolved path is
//! immutable afterwards and handed into the runner.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment override for the generator binary path.
pub const PICT_ENV_VAR: &str = "PAIRCERT_PICT";

#[cfg(windows)]
const PICT_BINARY_NAME: &str = "pict.exe";
#[cfg(not(windows))]
const PICT_BINARY_NAME: &str = "pict";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("generator binary not found at `{0}`")]
    NotFound(String),
    #[error(
        "no `pict` executable found on PATH; install PICT or point PAIRCERT_PICT at the binary"
    )]
    NotOnPath,
}

/// Resolve the generator binary, preferring `explicit` when given.
pub fn resolve_pict(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return check_candidate(path)
            .ok_or_else(|| LocateError::NotFound(path.display().to_string()));
    }
    if let Some(raw) = env::var_os(PICT_ENV_VAR) {
        let path = PathBuf::from(&raw);
        return check_candidate(&path)
            .ok_or_else(|| LocateError::NotFound(path.display().to_string()));
    }
    search_path().ok_or(LocateError::NotOnPath)
}

fn check_candidate(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

fn search_path() -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(PICT_BINARY_NAME))
        .find(|candidate| candidate.is_file())
}
