//! Cross-platform filesystem wrapper.
//!
//! On Unix we transparently re-export std::fs plus the handful of Unix-only
//! operations the archiver needs (permission bits, ownership, symlink
//! creation, privilege detection). On Windows the mode and ownership helpers
//! degrade to no-ops so that the rest of the crate can import
//! `crate::fsx::*` and keep identical call-sites across OSes.

use std::io;
use std::path::Path;

pub use std::fs::*;

#[cfg(unix)]
/// Set POSIX permission bits on Unix.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(windows)]
/// No-op on Windows: POSIX permission bits are not preserved.
pub fn set_unix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
/// Change ownership of `path` to the given numeric uid/gid.
pub fn set_owner(path: &Path, uid: u32, gid: u32) -> io::Result<()> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid))
}

#[cfg(windows)]
/// No-op on Windows: numeric ownership is a Unix concept.
pub fn set_owner(_path: &Path, _uid: u32, _gid: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
/// True when the process runs with root privileges, i.e. ownership
/// application should be attempted during extraction.
pub fn is_superuser() -> bool {
    // SAFETY: getuid has no failure modes and touches no memory.
    unsafe { libc::getuid() == 0 }
}

#[cfg(windows)]
pub fn is_superuser() -> bool {
    false
}

#[cfg(unix)]
/// Create a symbolic link at `link` pointing at the literal `target`.
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
/// Windows only supports file symlinks without special privileges; the
/// target kind is unknown for a dangling link, so file semantics are used.
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
