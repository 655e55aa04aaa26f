use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Another live queue holds the exclusive lock on the head file.
    AlreadyOpen,
    InvalidChunkSize(u64),
    PayloadTooLarge,
    /// The on-disk chain is unusable: a cycle, or a referenced chunk whose
    /// header violates the pointer bounds.
    CorruptChain(&'static str),
    Corrupt(&'static str),
    /// A `dequeue_if` predicate failed; the element was retained.
    Predicate(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::AlreadyOpen => write!(f, "queue is already open"),
            Error::InvalidChunkSize(size) => write!(f, "invalid chunk size: {size}"),
            Error::PayloadTooLarge => write!(f, "payload too large"),
            Error::CorruptChain(msg) => write!(f, "corrupt chunk chain: {msg}"),
            Error::Corrupt(msg) => write!(f, "corrupt state: {msg}"),
            Error::Predicate(err) => write!(f, "dequeue predicate failed: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Predicate(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
