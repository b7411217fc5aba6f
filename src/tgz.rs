//! # Gzip Framing
//!
//! The same create/extract pair as the crate root, wrapped in gzip so the
//! stream on the wire is a conventional `.tar.gz`. This is a pure pipe
//! transformation: all tree logic lives in the tar layer.

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::ArchiverError;

/// Archive the tree rooted at `src` into `dest` as a gzip-compressed tar
/// stream. See [`crate::create`] for path semantics.
pub fn create<W: Write>(src: impl AsRef<Path>, dest: W) -> Result<(), ArchiverError> {
    let mut encoder = GzEncoder::new(dest, Compression::default());
    crate::create(src, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}

/// Materialize the gzip-compressed tar stream `src` into the directory
/// `dest`. See [`crate::extract`].
pub fn extract<R: Read>(src: R, dest: impl AsRef<Path>) -> Result<(), ArchiverError> {
    crate::extract(GzDecoder::new(src), dest)
}
