//! # Archive Extraction
//!
//! The in-process materializer: consumes a tar entry stream and reconstructs
//! files, directories, symlinks and hard links under a destination root.
//!
//! Entries are materialized strictly in stream order, one pass, no
//! reordering. Missing parent directories are created on demand, so archives
//! whose directory entries were reordered or omitted still extract. A hard
//! link whose target has not been materialized yet fails with the underlying
//! I/O error. The first failing entry aborts the whole extraction; partially
//! written state is left behind for the caller to clean up.

use std::io::{self, Read};
use std::path::Path;

use tar::{Archive, Entry};
use tracing::debug;

use crate::entry::{self, EntryKind};
use crate::fsx;
use crate::ArchiverError;

/// Mode for parent directories the archive did not describe itself.
#[cfg(unix)]
const IMPLICIT_DIR_MODE: u32 = 0o755;

/// Materialize the tar stream `src` into the directory `dest`.
///
/// This is the in-process extraction pipeline; [`crate::extract`] selects
/// between it and a system `tar` subprocess. Whether to apply recorded
/// ownership is decided once per call, not per entry.
pub fn unpack_stream<R: Read>(src: R, dest: impl AsRef<Path>) -> Result<(), ArchiverError> {
    let dest = dest.as_ref();
    fsx::create_dir_all(dest).map_err(|e| ArchiverError::io(e, dest))?;

    let chown = fsx::is_superuser();
    debug!(dest = %dest.display(), chown, "unpacking stream");

    let mut archive = Archive::new(src);
    for next in archive.entries().map_err(format_error)? {
        let mut entry = next.map_err(format_error)?;
        if entry::is_root_name(&entry.path().map_err(format_error)?) {
            continue;
        }
        unpack_entry(&mut entry, dest, chown)?;
    }
    Ok(())
}

/// Materialize a single decoded entry under `dest`.
///
/// Permission bits are applied to directories and regular files; `uid`/`gid`
/// are additionally applied when `chown` is set, and a failure to do so is an
/// error. Hard links and symlinks get neither: the former share their
/// target's inode attributes, the latter have no independently meaningful
/// attributes on most platforms.
pub fn unpack_entry<R: Read>(
    entry: &mut Entry<'_, R>,
    dest: &Path,
    chown: bool,
) -> Result<(), ArchiverError> {
    let name = entry.path().map_err(format_error)?.into_owned();
    let target = dest.join(&name);

    let header = entry.header();
    let kind = entry::classify(header.entry_type());
    let mode = header.mode().map_err(format_error)?;
    let uid = header.uid().map_err(format_error)? as u32;
    let gid = header.gid().map_err(format_error)? as u32;

    create_parents(&target)?;

    match kind {
        EntryKind::HardLink => {
            let link_target = link_target(entry)?;
            fsx::hard_link(dest.join(&link_target), &target)
                .map_err(|e| ArchiverError::io(e, &target))?;
            // skip chmod/chown
            return Ok(());
        }

        EntryKind::Symlink => {
            let link_target = link_target(entry)?;
            fsx::symlink(&link_target, &target).map_err(|e| ArchiverError::io(e, &target))?;
            // skip chmod/chown
            return Ok(());
        }

        EntryKind::Directory => {
            fsx::create_dir_all(&target).map_err(|e| ArchiverError::io(e, &target))?;
        }

        EntryKind::Regular => {
            let mut file = fsx::File::create(&target).map_err(|e| ArchiverError::io(e, &target))?;
            io::copy(entry, &mut file).map_err(|e| ArchiverError::io(e, &target))?;
            drop(file);
        }

        EntryKind::Unsupported => {
            return Err(ArchiverError::Format(format!(
                "unsupported entry type {:?} for '{}'",
                entry.header().entry_type(),
                name.display()
            )));
        }
    }

    fsx::set_unix_permissions(&target, mode).map_err(|e| ArchiverError::io(e, &target))?;

    if chown {
        fsx::set_owner(&target, uid, gid).map_err(|e| ArchiverError::io(e, &target))?;
    }

    Ok(())
}

/// Create the parent directory chain of `path` with a permissive default
/// mode, tolerating archives with reordered or omitted directory entries.
fn create_parents(path: &Path) -> Result<(), ArchiverError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    let mut builder = fsx::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(IMPLICIT_DIR_MODE);
    }
    builder.create(parent).map_err(|e| ArchiverError::io(e, parent))
}

fn link_target<R: Read>(entry: &Entry<'_, R>) -> Result<std::path::PathBuf, ArchiverError> {
    Ok(entry
        .link_name()
        .map_err(format_error)?
        .ok_or_else(|| ArchiverError::Format("link entry without a target".to_string()))?
        .into_owned())
}

fn format_error(err: io::Error) -> ArchiverError {
    ArchiverError::Format(err.to_string())
}
