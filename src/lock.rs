use std::fs::File;
use std::os::unix::io::AsRawFd;

use crate::{Error, Result};

/// Attempts a non-blocking exclusive whole-file lock.
///
/// Returns `Ok(false)` when any other handle, in this process or another,
/// already holds the lock.
pub(crate) fn try_lock_exclusive(file: &File) -> Result<bool> {
    let res = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if res == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        return Ok(false);
    }
    Err(Error::Io(err))
}
