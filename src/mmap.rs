use std::fs::File;

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

/// A read/write mapping over the first `len` bytes of a file.
///
/// Owns the file handle, so any `flock` taken on it lives as long as the
/// mapping. `flush` is the durability barrier: it returns once preceding
/// stores to the mapped region have reached storage.
pub struct MmapFile {
    file: File,
    map: MmapMut,
    len: usize,
}

impl MmapFile {
    /// Maps `len` bytes, growing the file first if it is shorter.
    pub fn map_sized(file: File, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::Corrupt("mmap length must be non-zero"));
        }
        if (file.metadata()?.len() as usize) < len {
            file.set_len(len as u64)?;
        }
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        Ok(Self { file, map, len })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    pub fn range(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(Error::Corrupt("range overflow"))?;
        if end > self.len {
            return Err(Error::Corrupt("range out of bounds"));
        }
        Ok(&self.map[offset..end])
    }

    pub fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(Error::Corrupt("range overflow"))?;
        if end > self.len {
            return Err(Error::Corrupt("range out of bounds"));
        }
        Ok(&mut self.map[offset..end])
    }

    /// Sets the underlying file length without remapping. The mapping length
    /// is unchanged; callers only shrink files back to the mapped size.
    pub fn truncate(&self, len: usize) -> Result<()> {
        self.file.set_len(len as u64)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}
