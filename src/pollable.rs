use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::queue::Queue;
use crate::{Error, Result};

/// Errors a `dequeue_if` predicate may raise.
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

/// Blocking front for a [`Queue`]: a guard serializing all access plus a
/// "non-empty" signal so consumers can wait for data with a timeout.
///
/// The signal is edge-triggered at enqueue time; waits re-check emptiness
/// after every wake-up, so spurious wake-ups are harmless.
pub struct PollableQueue {
    queue: Mutex<Queue>,
    non_empty: Condvar,
}

impl PollableQueue {
    pub fn open(path: impl AsRef<Path>, chunk_size: u64) -> Result<Self> {
        Ok(Self::new(Queue::open(path, chunk_size)?))
    }

    pub fn new(queue: Queue) -> Self {
        Self {
            queue: Mutex::new(queue),
            non_empty: Condvar::new(),
        }
    }

    pub fn enqueue(&self, payload: &[u8]) -> Result<()> {
        let mut queue = self.guard()?;
        queue.enqueue(payload)?;
        self.non_empty.notify_one();
        Ok(())
    }

    /// Waits up to `timeout` for the queue to become non-empty. Returns
    /// whether it is.
    pub fn poll(&self, timeout: Duration) -> Result<bool> {
        let queue = self.guard()?;
        let (_queue, ready) = self.wait_non_empty(queue, timeout)?;
        Ok(ready)
    }

    pub fn peek(&self) -> Result<Option<Vec<u8>>> {
        self.guard()?.peek()
    }

    pub fn peek_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let queue = self.guard()?;
        let (mut queue, ready) = self.wait_non_empty(queue, timeout)?;
        if ready {
            queue.peek()
        } else {
            Ok(None)
        }
    }

    pub fn dequeue(&self) -> Result<bool> {
        self.guard()?.dequeue()
    }

    /// Waits up to `timeout` for an element and removes it.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let queue = self.guard()?;
        let (mut queue, ready) = self.wait_non_empty(queue, timeout)?;
        if !ready {
            return Ok(None);
        }
        let elem = queue.peek()?;
        if elem.is_some() {
            queue.dequeue()?;
        }
        Ok(elem)
    }

    /// Like [`PollableQueue::dequeue_timeout`], but the element is only
    /// removed when `predicate` returns `Ok(true)`. On `Ok(false)` or a
    /// predicate error the element stays at the head of the queue.
    pub fn dequeue_if<F>(&self, timeout: Duration, predicate: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce(&[u8]) -> std::result::Result<bool, PredicateError>,
    {
        let queue = self.guard()?;
        let (mut queue, ready) = self.wait_non_empty(queue, timeout)?;
        if !ready {
            return Ok(None);
        }
        let elem = match queue.peek()? {
            Some(elem) => elem,
            None => return Ok(None),
        };
        match predicate(&elem) {
            Ok(true) => {
                queue.dequeue()?;
                Ok(Some(elem))
            }
            Ok(false) => Ok(None),
            Err(err) => Err(Error::Predicate(err)),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.guard()?.is_empty())
    }

    pub fn clear(&self) -> Result<bool> {
        self.guard()?.clear()
    }

    pub fn close(self) -> Result<()> {
        self.queue
            .into_inner()
            .map_err(|_| Error::Corrupt("queue mutex poisoned"))?
            .close()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Queue>> {
        self.queue
            .lock()
            .map_err(|_| Error::Corrupt("queue mutex poisoned"))
    }

    fn wait_non_empty<'a>(
        &self,
        mut queue: MutexGuard<'a, Queue>,
        timeout: Duration,
    ) -> Result<(MutexGuard<'a, Queue>, bool)> {
        let deadline = Instant::now() + timeout;
        while queue.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            queue = self
                .non_empty
                .wait_timeout(queue, deadline - now)
                .map_err(|_| Error::Corrupt("queue mutex poisoned"))?
                .0;
        }
        let ready = !queue.is_empty();
        Ok((queue, ready))
    }
}
