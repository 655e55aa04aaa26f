//! Durable single-process FIFO byte queue backed by a chain of fixed-size
//! chunk files.
//!
//! A queue lives at a head file path. The two-byte head file names the first
//! chunk; each chunk file carries a head pointer, a tail pointer, and the id
//! of the next chunk, followed by length-prefixed byte entries. Enqueues
//! append to the last chunk and roll over into a fresh one when it fills;
//! dequeues advance the first chunk's head pointer and unlink the chunk once
//! it drains. All header fields are big-endian and every successful mutation
//! is flushed before returning, so the queue survives process restarts.
//!
//! Access is exclusive: the head file is whole-file locked while open, and a
//! concurrent open fails with [`Error::AlreadyOpen`]. [`Queue`] itself is
//! single-threaded; [`PollableQueue`] wraps it for multi-threaded producers
//! and consumers that want to wait for data with a timeout.

mod chunk;
mod codec;
mod error;
mod head;
mod lock;
mod mmap;
mod pollable;
mod queue;

pub use chunk::{CHUNK_HEADER_SIZE, ENTRY_HEADER_SIZE, MAX_ID, NULL_REF};
pub use error::{Error, Result};
pub use pollable::{PollableQueue, PredicateError};
pub use queue::{Queue, MAX_CHUNK_SIZE};
