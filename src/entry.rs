//! # Entry Framing
//!
//! Maps filesystem metadata onto tar headers on the write side and classifies
//! decoded headers on the read side. Block framing itself (512-byte records,
//! checksums, end-of-archive markers) is delegated to the `tar` crate; this
//! module only decides what goes into a header.

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

use tar::{EntryType, Header};

/// Permission-bit mask applied to `st_mode` when recording an entry.
const MODE_MASK: u32 = 0o7777;

/// The four entry kinds the materializer knows how to reconstruct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Regular,
    Directory,
    Symlink,
    HardLink,
    /// Anything else in the tar zoo (fifos, devices, ...). Rejected.
    Unsupported,
}

pub(crate) fn classify(kind: EntryType) -> EntryKind {
    match kind {
        EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => EntryKind::Regular,
        EntryType::Directory => EntryKind::Directory,
        EntryType::Symlink => EntryKind::Symlink,
        EntryType::Link => EntryKind::HardLink,
        _ => EntryKind::Unsupported,
    }
}

/// True for the synthetic `.` / `./` root entry emitted when archiving a
/// directory's contents. Such an entry names the destination root itself and
/// must not be materialized.
pub(crate) fn is_root_name(name: &std::path::Path) -> bool {
    !name.as_os_str().is_empty() && name.components().all(|c| c == std::path::Component::CurDir)
}

pub(crate) fn file_header(meta: &Metadata) -> Header {
    let mut header = base_header(meta, EntryType::Regular);
    header.set_size(meta.len());
    header
}

pub(crate) fn dir_header(meta: &Metadata) -> Header {
    base_header(meta, EntryType::Directory)
}

pub(crate) fn symlink_header(meta: &Metadata) -> Header {
    base_header(meta, EntryType::Symlink)
}

pub(crate) fn hardlink_header(meta: &Metadata) -> Header {
    base_header(meta, EntryType::Link)
}

fn base_header(meta: &Metadata, kind: EntryType) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(0);
    header.set_mode(mode_bits(meta));
    header.set_mtime(mtime_secs(meta));
    let (uid, gid) = owner_ids(meta);
    header.set_uid(uid);
    header.set_gid(gid);
    header
}

#[cfg(unix)]
fn mode_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & MODE_MASK
}

#[cfg(not(unix))]
fn mode_bits(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn owner_ids(meta: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (meta.uid() as u64, meta.gid() as u64)
}

#[cfg(not(unix))]
fn owner_ids(_meta: &Metadata) -> (u64, u64) {
    (0, 0)
}

fn mtime_secs(meta: &Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
