use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::codec;
use crate::lock::try_lock_exclusive;
use crate::mmap::MmapFile;
use crate::{Error, Result};

/// Chunk file layout, all fields big-endian:
///
/// ```text
/// offset 0: head_ptr : u32   next byte to read
/// offset 4: tail_ptr : u32   next byte to write
/// offset 8: next     : u16   id of the following chunk, NULL_REF at the tail
/// offset 10..tail_ptr: entries, each a u16 length followed by that many bytes
/// ```
pub const CHUNK_HEADER_SIZE: usize = 10;
pub const ENTRY_HEADER_SIZE: usize = 2;

/// Reserved chunk reference meaning "none". Valid ids start at 1.
pub const NULL_REF: u16 = 0;
pub const MAX_ID: u16 = u16::MAX;

const HEAD_PTR_OFFSET: usize = 0;
const TAIL_PTR_OFFSET: usize = 4;
const NEXT_REF_OFFSET: usize = 8;

/// One fixed-size chunk file in the chain.
///
/// The header fields are cached here and written back through the mapping at
/// their fixed offsets. The mapping is dropped while a chunk sits in the
/// middle of the chain; `open` brings it back before any access.
pub(crate) struct Chunk {
    path: PathBuf,
    pub id: u16,
    chunk_size: usize,
    map: Option<MmapFile>,
    pub head_ptr: u32,
    pub tail_ptr: u32,
    pub next: u16,
}

impl Chunk {
    pub fn new(path: PathBuf, id: u16, chunk_size: usize) -> Self {
        Self {
            path,
            id,
            chunk_size,
            map: None,
            head_ptr: 0,
            tail_ptr: 0,
            next: NULL_REF,
        }
    }

    /// Opens, locks, and maps the chunk file. Idempotent: a mapped chunk is
    /// left untouched. The file grows to `chunk_size` if it is shorter.
    pub fn open(&mut self) -> Result<()> {
        if self.map.is_some() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)?;
        if !try_lock_exclusive(&file)? {
            return Err(Error::AlreadyOpen);
        }
        self.map = Some(MmapFile::map_sized(file, self.chunk_size)?);
        Ok(())
    }

    /// Opens the chunk and loads or resets its header.
    ///
    /// With `force_new` the file is truncated to `chunk_size` and the header
    /// reset to the empty state. Otherwise the header is read back; a header
    /// whose `head_ptr` falls inside the header region means the file was
    /// never initialized (created short or zeroed) and it is reset the same
    /// way. Pointers out of bounds fail with `CorruptChain`.
    pub fn init(&mut self, force_new: bool) -> Result<()> {
        self.open()?;
        if force_new {
            self.mapped()?.truncate(self.chunk_size)?;
            self.reset()?;
            self.force()?;
            return Ok(());
        }

        let (head_ptr, tail_ptr, next) = {
            let header = self.mapped()?.as_slice();
            (
                codec::get_u32(header, HEAD_PTR_OFFSET),
                codec::get_u32(header, TAIL_PTR_OFFSET),
                codec::get_u16(header, NEXT_REF_OFFSET),
            )
        };
        self.head_ptr = head_ptr;
        self.tail_ptr = tail_ptr;
        self.next = next;

        if self.head_ptr < CHUNK_HEADER_SIZE as u32 {
            self.reset()?;
            self.force()?;
        } else if self.tail_ptr as usize > self.chunk_size || self.head_ptr > self.tail_ptr {
            return Err(Error::CorruptChain("chunk pointers out of bounds"));
        }
        Ok(())
    }

    /// Resets the cached header to the empty state and writes it back.
    pub fn reset(&mut self) -> Result<()> {
        self.head_ptr = CHUNK_HEADER_SIZE as u32;
        self.tail_ptr = CHUNK_HEADER_SIZE as u32;
        self.next = NULL_REF;
        self.write_header()
    }

    /// Length prefix of the entry at `head_ptr`.
    pub fn peek_length(&self) -> Result<u16> {
        let map = self.mapped()?;
        Ok(codec::get_u16(map.range(self.head_ptr as usize, ENTRY_HEADER_SIZE)?, 0))
    }

    /// Copies `buf.len()` payload bytes of the head entry into `buf`.
    pub fn peek_into(&self, buf: &mut [u8]) -> Result<()> {
        let map = self.mapped()?;
        let src = map.range(self.head_ptr as usize + ENTRY_HEADER_SIZE, buf.len())?;
        buf.copy_from_slice(src);
        Ok(())
    }

    /// Writes one entry at `tail_ptr`. The caller has checked the fit and
    /// advances `tail_ptr` afterwards.
    pub fn append(&mut self, payload: &[u8]) -> Result<()> {
        let at = self.tail_ptr as usize;
        let map = self.mapped_mut()?;
        codec::put_u16(map.range_mut(at, ENTRY_HEADER_SIZE)?, 0, payload.len() as u16);
        map.range_mut(at + ENTRY_HEADER_SIZE, payload.len())?
            .copy_from_slice(payload);
        Ok(())
    }

    pub fn write_head_ptr(&mut self) -> Result<()> {
        let head_ptr = self.head_ptr;
        let map = self.mapped_mut()?;
        codec::put_u32(map.as_mut_slice(), HEAD_PTR_OFFSET, head_ptr);
        Ok(())
    }

    pub fn write_tail_ptr(&mut self) -> Result<()> {
        let tail_ptr = self.tail_ptr;
        let map = self.mapped_mut()?;
        codec::put_u32(map.as_mut_slice(), TAIL_PTR_OFFSET, tail_ptr);
        Ok(())
    }

    pub fn write_next_ref(&mut self) -> Result<()> {
        let next = self.next;
        let map = self.mapped_mut()?;
        codec::put_u16(map.as_mut_slice(), NEXT_REF_OFFSET, next);
        Ok(())
    }

    pub fn write_header(&mut self) -> Result<()> {
        self.write_head_ptr()?;
        self.write_tail_ptr()?;
        self.write_next_ref()
    }

    /// Durability barrier for preceding writes to the mapping.
    pub fn force(&self) -> Result<()> {
        self.mapped()?.flush()
    }

    /// Flushes and unmaps; the lock is released with the handle. The cached
    /// header fields survive so a closed chunk can still be inspected and
    /// reopened.
    pub fn close(&mut self) -> Result<()> {
        if let Some(map) = self.map.take() {
            map.flush()?;
        }
        Ok(())
    }

    /// Closes the chunk and unlinks its file.
    pub fn drop_file(mut self) -> Result<()> {
        self.close()?;
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    fn mapped(&self) -> Result<&MmapFile> {
        self.map.as_ref().ok_or(Error::Corrupt("chunk is not mapped"))
    }

    fn mapped_mut(&mut self) -> Result<&mut MmapFile> {
        self.map.as_mut().ok_or(Error::Corrupt("chunk is not mapped"))
    }
}
