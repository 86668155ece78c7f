//! Whole-file atomic replacement.
//!
//! A record file is rewritten by filling a temporary file in the same
//! directory and renaming it over the target once every byte is written.
//! Dropping an [`AtomicFile`] without committing removes the temporary file,
//! so an early return or `?` never leaves a half-written target behind.

use crate::error::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode applied to replaced record files.
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

pub struct AtomicFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl AtomicFile {
    pub fn new(path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempfile_in(&dir)?;
        Ok(Self {
            tmp,
            target: path.to_path_buf(),
        })
    }

    /// Flushes the temporary file and renames it over the target.
    pub fn commit(mut self) -> Result<()> {
        self.tmp.flush()?;
        self.tmp.as_file().sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            self.tmp
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(FILE_MODE))?;
        }
        self.tmp.persist(&self.target).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tmp.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.tmp.flush()
    }
}

/// Atomically replaces the contents of `path` with `data`.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut f = AtomicFile::new(path)?;
    f.write_all(data)?;
    f.commit()
}
