use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::lock::try_lock_exclusive;
use crate::mmap::MmapFile;
use crate::{Error, Result};

/// Size of the head file: a single big-endian chunk reference.
pub(crate) const QUEUE_HEAD_SIZE: usize = 2;

const FIRST_OFFSET: usize = 0;

/// The queue head file. Records the id of the first chunk in the chain;
/// `NULL_REF` when the queue has no chunks. Holding its exclusive lock is
/// what makes a queue single-opener.
pub(crate) struct Head {
    path: PathBuf,
    map: MmapFile,
    pub first: u16,
}

impl Head {
    pub fn open(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        if !try_lock_exclusive(&file)? {
            return Err(Error::AlreadyOpen);
        }
        file.set_len(QUEUE_HEAD_SIZE as u64)?;
        let map = MmapFile::map_sized(file, QUEUE_HEAD_SIZE)?;
        let first = codec::get_u16(map.as_slice(), FIRST_OFFSET);
        Ok(Self { path, map, first })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `first` and flushes. Callers order this before any unlink of
    /// the chunk the old value referenced.
    pub fn write_first(&mut self) -> Result<()> {
        codec::put_u16(self.map.as_mut_slice(), FIRST_OFFSET, self.first);
        self.map.flush()
    }

    /// Flushes and releases the lock. The file stays on disk.
    pub fn close(self) -> Result<()> {
        self.map.flush()
    }
}
