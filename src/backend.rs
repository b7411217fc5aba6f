//! # Backend Selection
//!
//! Per-call choice between streaming through a system `tar` subprocess and
//! running the in-process walker/materializer. The system binary is faster
//! and more format-tolerant, so it is preferred wherever it is discoverable
//! on `PATH`; its absence is only a fallback trigger, never an error.
//!
//! Both strategies are equivalent from the caller's point of view: same tree
//! semantics, same failure surfacing. Streams are not promised to be
//! byte-identical (GNU tar names contents-mode children `./x` where the
//! in-process walker emits `x`; extraction resolves both to the same path).

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{fsx, pack, unpack, ArchiverError};

/// The strategy used for one archive or extract call.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Stream through the system `tar` binary at the given path.
    System(PathBuf),
    /// Use the in-process walker and materializer.
    InProcess,
}

impl Backend {
    /// Resolve the strategy for the current platform and environment.
    /// Resolved once per call, not cached across calls.
    pub fn detect() -> Backend {
        #[cfg(unix)]
        {
            if let Ok(path) = which::which("tar") {
                debug!(tar = %path.display(), "using system tar");
                return Backend::System(path);
            }
        }
        Backend::InProcess
    }

    /// Archive `src` into `dest`; see [`crate::create`].
    pub fn create<W: Write>(&self, src: &Path, dest: W) -> Result<(), ArchiverError> {
        // Surface a missing source identically on both paths, before any
        // stream bytes are produced.
        fsx::metadata(src).map_err(|e| ArchiverError::io(e, src))?;

        match self {
            Backend::System(bin) => system_create(bin, src, dest),
            Backend::InProcess => pack::pack_tree(src, dest),
        }
    }

    /// Materialize the stream `src` under `dest`; see [`crate::extract`].
    pub fn extract<R: Read>(&self, src: R, dest: &Path) -> Result<(), ArchiverError> {
        fsx::create_dir_all(dest).map_err(|e| ArchiverError::io(e, dest))?;

        match self {
            Backend::System(bin) => system_extract(bin, src, dest),
            Backend::InProcess => unpack::unpack_stream(src, dest),
        }
    }
}

/// Split a source path into the directory `tar -C` should enter and the
/// member name to archive from there. Contents mode archives `.` from the
/// source itself.
fn chdir_and_member(src: &Path) -> Result<(PathBuf, OsString), ArchiverError> {
    let is_dir = fsx::metadata(src).map_err(|e| ArchiverError::io(e, src))?.is_dir();
    if is_dir && pack::has_trailing_separator(src) {
        return Ok((src.to_path_buf(), OsString::from(".")));
    }

    let member = src
        .file_name()
        .ok_or_else(|| ArchiverError::Format(format!("source path '{}' has no base name", src.display())))?
        .to_os_string();
    let dir = match src.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, member))
}

fn system_create<W: Write>(bin: &Path, src: &Path, mut dest: W) -> Result<(), ArchiverError> {
    let (dir, member) = chdir_and_member(src)?;

    let mut child = Command::new(bin)
        .arg("-cf")
        .arg("-")
        .arg("-C")
        .arg(&dir)
        .arg(&member)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ArchiverError::io(e, bin))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ArchiverError::Format("tar subprocess has no stdout".to_string()))?;
    let copied = io::copy(&mut stdout, &mut dest);
    drop(stdout);

    let output = child.wait_with_output().map_err(|e| ArchiverError::io(e, bin))?;
    // A failing destination writer is the copy error; a dying tar shows up
    // as an EOF on its stdout and is diagnosed by the exit status instead.
    copied?;
    if !output.status.success() {
        return Err(ArchiverError::Tool {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

fn system_extract<R: Read>(bin: &Path, mut src: R, dest: &Path) -> Result<(), ArchiverError> {
    let mut child = Command::new(bin)
        .arg("-xpf")
        .arg("-")
        .arg("-C")
        .arg(dest)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ArchiverError::io(e, bin))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ArchiverError::Format("tar subprocess has no stdin".to_string()))?;
    let copied = io::copy(&mut src, &mut stdin);
    drop(stdin);

    let output = child.wait_with_output().map_err(|e| ArchiverError::io(e, bin))?;
    // A tar that stops reading (error, or end-of-archive reached) breaks the
    // pipe; that is diagnosed by the exit status, not the copy. Any other
    // copy failure is a genuine source-read error.
    if let Err(e) = copied {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(e.into());
        }
    }
    if !output.status.success() {
        return Err(ArchiverError::Tool {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}
