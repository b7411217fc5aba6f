//! # Archive Creation
//!
//! The in-process tree walker: turns a source path into an ordered stream of
//! tar entries written through a [`tar::Builder`].
//!
//! Naming rules:
//! - a regular file is archived as a single entry carrying its base name;
//! - a directory named without a trailing separator becomes the archive's
//!   top-level entry (`<base>/`), with descendants under `<base>/...`;
//! - a directory named *with* a trailing separator is archived in contents
//!   mode: a synthetic `./` root entry followed by the children relative to
//!   the source, with no wrapping entry.
//!
//! Entries are emitted parent-first, siblings in lexical order. Symlinks are
//! recorded with their literal targets and never descended into. A regular
//! file sharing an inode with an earlier entry is recorded as a hard link to
//! that entry's name.

use std::collections::HashMap;
use std::fs::Metadata;
use std::io::{self, Write};
use std::path::{Component, Path, MAIN_SEPARATOR};

use tar::Builder;
use tracing::debug;
use walkdir::WalkDir;

use crate::entry;
use crate::fsx;
use crate::ArchiverError;

/// Archive the tree rooted at `src` into `dest` as a tar stream.
///
/// This is the in-process creation pipeline; [`crate::create`] selects
/// between it and a system `tar` subprocess. Any unreadable path aborts the
/// walk with the underlying I/O error; output already written to `dest` is
/// then undefined.
pub fn pack_tree<W: Write>(src: impl AsRef<Path>, dest: W) -> Result<(), ArchiverError> {
    let src = src.as_ref();
    let meta = fsx::metadata(src).map_err(|e| ArchiverError::io(e, src))?;

    let mut builder = Builder::new(dest);
    if meta.is_dir() {
        let contents = has_trailing_separator(src);
        debug!(path = %src.display(), contents_mode = contents, "packing directory");
        pack_dir(src, contents, &mut builder)?;
    } else {
        debug!(path = %src.display(), "packing single file");
        pack_file(src, &meta, &mut builder)?;
    }
    builder.finish()?;
    Ok(())
}

/// True when `path` was spelled with a trailing separator, selecting
/// contents mode for directory sources.
pub(crate) fn has_trailing_separator(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    raw.ends_with('/') || raw.ends_with(MAIN_SEPARATOR)
}

fn pack_file<W: Write>(
    src: &Path,
    meta: &Metadata,
    builder: &mut Builder<W>,
) -> Result<(), ArchiverError> {
    let name = src
        .file_name()
        .ok_or_else(|| ArchiverError::Format(format!("source path '{}' has no base name", src.display())))?;

    let mut header = entry::file_header(meta);
    let file = fsx::File::open(src).map_err(|e| ArchiverError::io(e, src))?;
    builder.append_data(&mut header, name, file)?;
    Ok(())
}

fn pack_dir<W: Write>(
    src: &Path,
    contents: bool,
    builder: &mut Builder<W>,
) -> Result<(), ArchiverError> {
    // Base name of the wrapping top-level entry; unused in contents mode.
    let base = if contents {
        String::new()
    } else {
        src.file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                ArchiverError::Format(format!("source path '{}' has no base name", src.display()))
            })?
    };

    // First-seen entry name per (device, inode), consulted to emit hard
    // links instead of duplicating content.
    let mut seen_inodes: HashMap<(u64, u64), String> = HashMap::new();

    for dirent in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let dirent = dirent?;
        let rel = dirent
            .path()
            .strip_prefix(src)
            .map_err(|_| ArchiverError::StripPrefix {
                prefix: src.to_path_buf(),
                path: dirent.path().to_path_buf(),
            })?;
        let meta = dirent.metadata()?;
        let is_dir = dirent.file_type().is_dir();

        let name = if rel.as_os_str().is_empty() {
            // The source directory itself: synthetic root in contents mode,
            // wrapping top-level entry otherwise.
            if contents {
                "./".to_string()
            } else {
                format!("{}/", base)
            }
        } else {
            let mut name = if contents {
                relative_name(rel)?
            } else {
                format!("{}/{}", base, relative_name(rel)?)
            };
            if is_dir {
                name.push('/');
            }
            name
        };

        append_path(builder, dirent.path(), &meta, &name, &mut seen_inodes)?;
    }
    Ok(())
}

/// Join the components of a relative path with forward slashes.
fn relative_name(rel: &Path) -> Result<String, ArchiverError> {
    let mut name = String::new();
    for component in rel.components() {
        let Component::Normal(part) = component else {
            return Err(ArchiverError::Format(format!(
                "unexpected path component in '{}'",
                rel.display()
            )));
        };
        let part = part.to_str().ok_or_else(|| {
            ArchiverError::Format(format!("non-UTF-8 path name '{}'", rel.display()))
        })?;
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(part);
    }
    Ok(name)
}

fn append_path<W: Write>(
    builder: &mut Builder<W>,
    path: &Path,
    meta: &Metadata,
    name: &str,
    seen_inodes: &mut HashMap<(u64, u64), String>,
) -> Result<(), ArchiverError> {
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        let target = fsx::read_link(path).map_err(|e| ArchiverError::io(e, path))?;
        let mut header = entry::symlink_header(meta);
        builder.append_link(&mut header, name, &target)?;
    } else if file_type.is_dir() {
        let mut header = entry::dir_header(meta);
        builder.append_data(&mut header, name, io::empty())?;
    } else if file_type.is_file() {
        if let Some(first_seen) = lookup_inode(meta, seen_inodes) {
            let mut header = entry::hardlink_header(meta);
            builder.append_link(&mut header, name, first_seen)?;
            return Ok(());
        }
        remember_inode(meta, name, seen_inodes);
        let mut header = entry::file_header(meta);
        let file = fsx::File::open(path).map_err(|e| ArchiverError::io(e, path))?;
        builder.append_data(&mut header, name, file)?;
    } else {
        return Err(ArchiverError::Format(format!(
            "unsupported file type at '{}'",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn lookup_inode(meta: &Metadata, seen: &HashMap<(u64, u64), String>) -> Option<String> {
    use std::os::unix::fs::MetadataExt;
    if meta.nlink() > 1 {
        seen.get(&(meta.dev(), meta.ino())).cloned()
    } else {
        None
    }
}

#[cfg(unix)]
fn remember_inode(meta: &Metadata, name: &str, seen: &mut HashMap<(u64, u64), String>) {
    use std::os::unix::fs::MetadataExt;
    if meta.nlink() > 1 {
        seen.insert((meta.dev(), meta.ino()), name.to_string());
    }
}

#[cfg(not(unix))]
fn lookup_inode(_meta: &Metadata, _seen: &HashMap<(u64, u64), String>) -> Option<String> {
    None
}

#[cfg(not(unix))]
fn remember_inode(_meta: &Metadata, _name: &str, _seen: &mut HashMap<(u64, u64), String>) {}
