//! # Treetar Core Library
//!
//! This crate serializes a filesystem subtree into a portable tar stream and
//! reconstructs a subtree from such a stream, preserving directory
//! hierarchy, file contents, symbolic links, hard links, permission bits
//! and, when the extracting process runs as root, ownership.
//!
//! ## Key Modules
//!
//! - [`pack`]: the in-process tree walker that emits tar entries.
//! - [`unpack`]: the in-process materializer that rebuilds a tree from a
//!   tar entry stream.
//! - [`backend`]: per-call selection between a system `tar` subprocess and
//!   the in-process pipelines.
//! - [`tgz`]: the same create/extract pair with gzip framing.
//!
//! ## Examples
//!
//! ```no_run
//! let mut buf = Vec::new();
//! // Trailing separator: archive the directory's contents, not the
//! // directory itself.
//! treetar::create("some/dir/", &mut buf)?;
//! treetar::extract(&buf[..], "restored")?;
//! # Ok::<(), treetar::ArchiverError>(())
//! ```

pub mod backend;
pub mod pack;
pub mod tgz;
pub mod unpack;

pub mod error;
pub use error::ArchiverError;

// Cross-platform filesystem wrapper
pub mod fsx;

// Tar header framing
mod entry;

use std::io::{Read, Write};
use std::path::Path;

use backend::Backend;

/// Archive the tree rooted at `src` into `dest` as a tar stream.
///
/// A regular file becomes a single top-level entry named by its base name. A
/// directory becomes the archive's top-level entry unless `src` carries a
/// trailing path separator, in which case its contents are archived at the
/// root. Prefers a system `tar` binary when one is on `PATH` and falls back
/// to the in-process walker.
pub fn create<W: Write>(src: impl AsRef<Path>, dest: W) -> Result<(), ArchiverError> {
    Backend::detect().create(src.as_ref(), dest)
}

/// Materialize the tar stream `src` into the directory `dest`, creating it
/// if needed.
///
/// Permission bits are always applied to files and directories; recorded
/// ownership is applied only when running as root. Prefers a system `tar`
/// binary when one is on `PATH` and falls back to the in-process
/// materializer.
pub fn extract<R: Read>(src: R, dest: impl AsRef<Path>) -> Result<(), ArchiverError> {
    Backend::detect().extract(src, dest.as_ref())
}
