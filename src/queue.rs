use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunk::{Chunk, CHUNK_HEADER_SIZE, ENTRY_HEADER_SIZE, MAX_ID, NULL_REF};
use crate::head::Head;
use crate::{Error, Result};

/// Chunk pointers are 32-bit offsets, so a chunk file cannot exceed this.
pub const MAX_CHUNK_SIZE: u64 = u32::MAX as u64;

/// A durable FIFO byte queue over a chain of fixed-size chunk files.
///
/// The head file at `path` records the first chunk id; each chunk records
/// the next. Enqueues land in the last chunk and allocate a new one on
/// overflow; dequeues advance the first chunk's head pointer and unlink the
/// chunk once it drains. Every successful mutation is flushed before it
/// returns, and `Head.first` is always persisted before the chunk it used
/// to reference is unlinked, so a crash at any point leaves a chain that
/// reopens to a consistent queue.
///
/// One `Queue` owns its files exclusively: a second open of the same path
/// fails with [`Error::AlreadyOpen`] until this one is closed.
pub struct Queue {
    head: Head,
    chunks: VecDeque<Chunk>,
    chunk_size: usize,
    cached_head_len: Option<u16>,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("path", &self.head.path())
            .field("chunk_size", &self.chunk_size)
            .field("num_chunks", &self.chunks.len())
            .finish()
    }
}

impl Queue {
    /// Opens the queue at `path`, creating it if it does not exist, and
    /// walks the chunk chain from the head file.
    pub fn open(path: impl AsRef<Path>, chunk_size: u64) -> Result<Self> {
        if chunk_size > MAX_CHUNK_SIZE
            || chunk_size <= (CHUNK_HEADER_SIZE + ENTRY_HEADER_SIZE) as u64
        {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        let chunk_size = chunk_size as usize;

        let head = Head::open(path.as_ref())?;
        let mut chunks = VecDeque::new();
        let mut visited = HashSet::new();
        let mut next = head.first;
        while next != NULL_REF {
            if !visited.insert(next) {
                return Err(Error::CorruptChain("cycle in chunk chain"));
            }
            let mut chunk = Chunk::new(chunk_path(head.path(), next)?, next, chunk_size);
            chunk.init(false)?;
            next = chunk.next;
            chunks.push_back(chunk);
        }
        log::debug!(
            "opened queue at {} with {} chunk(s)",
            head.path().display(),
            chunks.len()
        );

        Ok(Self {
            head,
            chunks,
            chunk_size,
            cached_head_len: None,
        })
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size as u64
    }

    /// Largest payload a single entry can carry.
    pub fn max_element_size(&self) -> u64 {
        (self.chunk_size - CHUNK_HEADER_SIZE - ENTRY_HEADER_SIZE) as u64
    }

    /// Number of chunks holding queued data; 0 for an empty queue even when
    /// a drained chunk file is still around for reuse.
    pub fn chunk_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.chunks.len()
        }
    }

    /// Never touches the disk: a queue is empty when it has no chunks, or a
    /// single chunk whose head pointer has caught up with its tail.
    pub fn is_empty(&self) -> bool {
        match self.chunks.len() {
            0 => true,
            1 => {
                let chunk = &self.chunks[0];
                chunk.head_ptr >= chunk.tail_ptr
            }
            _ => false,
        }
    }

    /// Length of the head entry, or `None` when empty. Use with
    /// [`Queue::peek_into`] to read without allocating.
    pub fn peek_length(&mut self) -> Result<Option<u16>> {
        if self.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.head_entry_len()?))
    }

    /// Copies the first `buf.len()` payload bytes of the head entry.
    /// Returns `false` when the queue is empty.
    pub fn peek_into(&mut self, buf: &mut [u8]) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        let front = self.front_mut()?;
        front.open()?;
        front.peek_into(buf)?;
        Ok(true)
    }

    /// Returns a copy of the head entry without removing it.
    pub fn peek(&mut self) -> Result<Option<Vec<u8>>> {
        if self.is_empty() {
            return Ok(None);
        }
        let len = self.head_entry_len()? as usize;
        let mut buf = vec![0u8; len];
        let front = self.front_mut()?;
        front.open()?;
        front.peek_into(&mut buf)?;
        Ok(Some(buf))
    }

    /// Removes the head entry. Returns `false` on an empty queue.
    ///
    /// A chunk that drains and is not the only one left is unlinked, but
    /// only after the head file points past it. The sole remaining chunk is
    /// reset in place instead and kept for reuse.
    pub fn dequeue(&mut self) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        let len = self.head_entry_len()?;
        self.cached_head_len = None;

        let sole = self.chunks.len() == 1;
        let front = self.front_mut()?;
        front.open()?;
        front.head_ptr += (ENTRY_HEADER_SIZE + len as usize) as u32;

        if front.head_ptr < front.tail_ptr {
            front.write_head_ptr()?;
            front.force()?;
        } else if sole {
            front.reset()?;
            front.force()?;
        } else {
            let depleted = self
                .chunks
                .pop_front()
                .ok_or(Error::Corrupt("chunk list is empty"))?;
            self.head.first = depleted.next;
            self.head.write_first()?;
            depleted.drop_file()?;
            self.front_mut()?.open()?;
        }
        Ok(true)
    }

    /// Appends one entry. Fails with [`Error::PayloadTooLarge`] when the
    /// payload cannot fit a chunk (or its u16 length prefix); the queue is
    /// unchanged in that case.
    pub fn enqueue(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() as u64 > self.max_element_size() || payload.len() > u16::MAX as usize {
            return Err(Error::PayloadTooLarge);
        }

        let mut newly_allocated = false;
        if self.chunks.is_empty() {
            let chunk = self.open_chunk(1, true)?;
            self.head.first = chunk.id;
            self.head.write_first()?;
            self.chunks.push_back(chunk);
            self.cached_head_len = Some(payload.len() as u16);
            newly_allocated = true;
        } else if self.head.first == NULL_REF {
            // clear() detached the chain but kept the reset front chunk;
            // relink it before new data lands in it.
            self.head.first = self.chunks[0].id;
            self.head.write_first()?;
        }

        let entry_len = ENTRY_HEADER_SIZE + payload.len();
        let last = self
            .chunks
            .back()
            .ok_or(Error::Corrupt("chunk list is empty"))?;
        if last.tail_ptr as u64 + entry_len as u64 > self.chunk_size as u64 {
            let next_id = next_chunk_id(last.id);
            let fresh = self.open_chunk(next_id, true)?;
            let full = self
                .chunks
                .back_mut()
                .ok_or(Error::Corrupt("chunk list is empty"))?;
            full.next = next_id;
            full.write_next_ref()?;
            full.close()?;
            self.chunks.push_back(fresh);
            newly_allocated = true;
        }

        let last = self
            .chunks
            .back_mut()
            .ok_or(Error::Corrupt("chunk list is empty"))?;
        last.append(payload)?;
        last.tail_ptr += entry_len as u32;
        if newly_allocated {
            last.write_header()?;
        } else {
            last.write_tail_ptr()?;
        }
        last.force()
    }

    /// Drops every queued entry. Returns `false` on an empty queue. The
    /// front chunk is reset in place; all others are unlinked.
    pub fn clear(&mut self) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        self.cached_head_len = None;
        self.head.first = NULL_REF;
        self.head.write_first()?;

        let front = self.front_mut()?;
        front.open()?;
        front.reset()?;
        front.force()?;
        for chunk in self.chunks.drain(1..) {
            chunk.drop_file()?;
        }
        Ok(true)
    }

    /// Flushes and releases everything. When the queue is empty the head
    /// file and any remaining chunk files are deleted from disk; otherwise
    /// they stay for the next open.
    pub fn close(mut self) -> Result<()> {
        let empty = self.is_empty();
        for chunk in &mut self.chunks {
            if let Err(err) = chunk.close() {
                log::warn!("failed to close chunk {}: {err}", chunk.id);
            }
        }

        let Queue {
            head, mut chunks, ..
        } = self;
        let head_path = head.path().to_path_buf();
        head.close()?;

        if empty {
            for chunk in chunks.drain(..) {
                if let Err(err) = chunk.drop_file() {
                    log::warn!("failed to unlink chunk file: {err}");
                }
            }
            match fs::remove_file(&head_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn head_entry_len(&mut self) -> Result<u16> {
        if let Some(len) = self.cached_head_len {
            return Ok(len);
        }
        let front = self.front_mut()?;
        front.open()?;
        let len = front.peek_length()?;
        self.cached_head_len = Some(len);
        Ok(len)
    }

    fn front_mut(&mut self) -> Result<&mut Chunk> {
        self.chunks
            .front_mut()
            .ok_or(Error::Corrupt("chunk list is empty"))
    }

    fn open_chunk(&self, id: u16, force_new: bool) -> Result<Chunk> {
        let mut chunk = Chunk::new(chunk_path(self.head.path(), id)?, id, self.chunk_size);
        chunk.init(force_new)?;
        Ok(chunk)
    }
}

/// Chunk `i` of a head file `<dir>/<name>` lives at `<dir>/<name>.<i>`.
fn chunk_path(head_path: &Path, id: u16) -> Result<PathBuf> {
    let mut name = head_path
        .file_name()
        .ok_or(Error::Corrupt("head path has no file name"))?
        .to_os_string();
    name.push(format!(".{}", id % MAX_ID));
    Ok(head_path.with_file_name(name))
}

fn next_chunk_id(id: u16) -> u16 {
    let next = (u32::from(id) + 1) % u32::from(MAX_ID);
    if next == 0 {
        1
    } else {
        next as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_wrap_around_skipping_null() {
        assert_eq!(next_chunk_id(1), 2);
        assert_eq!(next_chunk_id(MAX_ID - 2), MAX_ID - 1);
        assert_eq!(next_chunk_id(MAX_ID - 1), 1);
    }

    #[test]
    fn chunk_paths_extend_the_head_name() {
        let path = chunk_path(Path::new("/var/spool/outbox"), 12).expect("path");
        assert_eq!(path, Path::new("/var/spool/outbox.12"));
    }
}
