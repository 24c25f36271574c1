use std::io;

/// Error type returned on failed descriptor reads.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("short read: got {got} of {expected} bytes")]
    /// The stream ended before the whole buffer could be filled.
    Short {
        /// How many bytes the caller asked for.
        expected: usize,
        /// How many bytes arrived before end-of-stream.
        got: usize,
    },

    #[error("{0}")]
    /// An IO error occurred.
    Io(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Error type returned on failed descriptor writes.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("write returned zero bytes")]
    /// The descriptor accepted zero bytes without reporting an error,
    /// so retrying would spin forever.
    Zero,

    #[error("{0}")]
    /// An IO error occurred.
    Io(io::Error),
}

impl From<io::Error> for WriteError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Error type returned on failed readiness waits.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("wait timed out")]
    /// The deadline passed without any descriptor becoming ready.
    Timeout,

    #[error("invalid descriptor in poll set")]
    /// The kernel flagged a descriptor in the set as not open.
    BadDescriptor,

    #[error("{0}")]
    /// An IO error occurred.
    Io(io::Error),
}

impl From<WaitError> for io::Error {
    fn from(value: WaitError) -> Self {
        match value {
            WaitError::Io(e) => e,
            WaitError::Timeout => io::Error::new(io::ErrorKind::TimedOut, value),
            WaitError::BadDescriptor => {
                io::Error::new(io::ErrorKind::InvalidInput, value)
            }
        }
    }
}
