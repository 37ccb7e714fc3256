//! Executable discovery.
//!
//! Resolves a program name to a path the way a shell would: a name containing a
//! path separator is checked as-is, a bare name is looked up in each `PATH`
//! directory in order and the first executable match wins.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

/// Environment variable holding the executable search path
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Separator between entries of [`SEARCH_PATH_VAR`]
#[cfg(windows)]
pub const SEARCH_PATH_SEPARATOR: char = ';';
/// Separator between entries of [`SEARCH_PATH_VAR`]
#[cfg(not(windows))]
pub const SEARCH_PATH_SEPARATOR: char = ':';

/// Resolves `name_or_path` against the process `PATH`.
///
/// Returns `None` when no executable matches. That is not an error here: the
/// caller decides how to report the missing program.
#[must_use]
pub fn resolve(name_or_path: &str) -> Option<PathBuf> {
    let search_path = std::env::var_os(SEARCH_PATH_VAR);
    resolve_in(name_or_path, search_path.as_deref())
}

/// Resolves `name_or_path` against an explicit search path.
///
/// * If `name_or_path` contains a path separator, only that exact path is
///   checked and it is returned unchanged if executable
/// * Otherwise every entry of `search_path` is tried in order, with
///   surrounding `"` characters stripped, and the first executable
///   `entry/name_or_path` is returned
#[must_use]
pub fn resolve_in(name_or_path: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name_or_path.is_empty() {
        return None;
    }

    if has_path_separator(name_or_path) {
        let path = PathBuf::from(name_or_path);
        return if is_executable(&path) {
            log::debug!("Resolved '{name_or_path}' as a direct path");
            Some(path)
        } else {
            log::debug!("Direct path '{name_or_path}' is not an executable file");
            None
        };
    }

    let Some(search_path) = search_path else {
        log::debug!("No {SEARCH_PATH_VAR} set, cannot resolve '{name_or_path}'");
        return None;
    };
    for dir in search_path_dirs(search_path) {
        let candidate = dir.join(name_or_path);
        log::trace!("Checking candidate {}", candidate.display());

        if is_executable(&candidate) {
            log::debug!("Resolved '{name_or_path}' to {}", candidate.display());
            return Some(candidate);
        }
    }

    log::debug!("'{name_or_path}' not found in {SEARCH_PATH_VAR}");
    None
}

/// Splits a search path into its directories, stripping surrounding quotes.
///
/// Empty entries are dropped so that a stray separator never turns into a
/// lookup relative to the current directory. On unix the split works on the
/// raw bytes, so directories that aren't valid UTF-8 are kept intact.
pub fn search_path_dirs(search_path: &OsStr) -> impl Iterator<Item = PathBuf> + '_ {
    split_search_path(search_path)
}

#[cfg(unix)]
fn split_search_path(search_path: &OsStr) -> impl Iterator<Item = PathBuf> + '_ {
    use std::os::unix::ffi::OsStrExt as _;

    search_path
        .as_bytes()
        .split(|&byte| char::from(byte) == SEARCH_PATH_SEPARATOR)
        .map(trim_quotes)
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(OsStr::from_bytes(dir)))
}

#[cfg(unix)]
fn trim_quotes(mut dir: &[u8]) -> &[u8] {
    while let [b'"', rest @ ..] = dir {
        dir = rest;
    }
    while let [rest @ .., b'"'] = dir {
        dir = rest;
    }
    dir
}

// TODO: split the wide encoding directly so non-Unicode entries survive on Windows
#[cfg(not(unix))]
fn split_search_path(search_path: &OsStr) -> impl Iterator<Item = PathBuf> + '_ {
    search_path
        .to_string_lossy()
        .split(SEARCH_PATH_SEPARATOR)
        .map(|dir| dir.trim_matches('"'))
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Whether `name` names a path rather than a bare program name
#[must_use]
pub fn has_path_separator(name: &str) -> bool {
    name.chars().any(std::path::is_separator)
}

/// An executable is an existing regular file (after following symlinks) that
/// the current user may execute.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file() && has_execute_permission(&metadata))
}

#[cfg(unix)]
fn has_execute_permission(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt as _;

    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
const fn has_execute_permission(_metadata: &fs::Metadata) -> bool {
    true
}
