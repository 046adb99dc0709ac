//! Write-then-rename file output.
//!
//! Every file the pipeline produces goes through here so an interrupted or
//! failed attempt never leaves a half-written final file behind.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling path used while `dest` is being written (`name.ext.part`).
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".part");
    dest.with_file_name(name)
}

/// Moves a fully written partial file into place.
///
/// The partial file is removed when the rename fails.
pub(crate) fn commit(partial: &Path, dest: &Path) -> io::Result<()> {
    fs::rename(partial, dest).inspect_err(|_| discard(partial))
}

/// Best-effort removal of a partial file.
pub(crate) fn discard(partial: &Path) {
    let _ = fs::remove_file(partial);
}

/// Writes `bytes` to `dest` through a partial file.
pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let partial = partial_path(dest);
    if let Err(error) = fs::write(&partial, bytes) {
        discard(&partial);
        return Err(error);
    }
    commit(&partial, dest)
}
