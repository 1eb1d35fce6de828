// src/paths.rs

//! Path and argument helpers used when building tool command lines.
//!
//! The external tools usually run inside WSL while the paths come from the
//! Windows side, so commands need `C:\data\x.fna` turned into
//! `/mnt/c/data/x.fna`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static DRIVE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]):[\\/]").expect("drive prefix regex is valid"));

/// Translate `path` into the form WSL sees, without any quoting.
///
/// Paths with a Windows drive prefix are translated as-is; anything else is
/// made absolute against the current directory first.
pub fn wsl_path(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let raw = path.to_string_lossy().into_owned();

    let raw = if DRIVE_PREFIX.is_match(&raw) {
        raw
    } else {
        std::path::absolute(path)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or(raw)
    };

    DRIVE_PREFIX
        .replace(&raw, |caps: &regex::Captures<'_>| {
            format!("/mnt/{}/", caps[1].to_lowercase())
        })
        .replace('\\', "/")
}

/// [`wsl_path`], double-quoted when the result contains a space, ready to be
/// pasted into a shell command string.
pub fn to_linux_path(path: impl AsRef<Path>) -> String {
    quote_space(&wsl_path(path))
}

/// Wrap `s` in double quotes if it contains a space.
pub fn quote_space(s: &str) -> String {
    if s.contains(' ') {
        format!("\"{s}\"")
    } else {
        s.to_string()
    }
}

/// Make `name` usable as a single file name: `/` and spaces become `-`, and
/// leading/trailing dots are removed.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(['/', ' '], "-")
        .trim_matches('.')
        .to_string()
}
