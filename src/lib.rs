//! Building blocks for moving bytes through Unix descriptors without
//! losing them to the usual syscall noise.
//!
//! Two halves meet in the vectored write path:
//!
//! * [`gather`] assembles records out of scattered byte spans (caller
//!   memory alongside small formatted `field=value` buffers) and
//!   tracks partial transfer progress with a cursor.
//! * [`io`] carries the retrying read and write loops, readiness waits
//!   with honest timeouts, and a sparse file writer.
//!
//! Failures stay recoverable throughout: an allocation problem while
//! growing a gather list and an expired readiness wait are ordinary
//! errors to handle, never aborts.

pub mod error;
pub mod gather;
pub mod io;

pub use error::{GatherError, ReadError, WaitError, WriteError};
pub use gather::{total_len, GatherCursor, GatherList, Segment};
pub use io::poll::{fd_wait_for_event, poll_fds, PollFd, PollFlags};
pub use io::{
    flush_fd, loop_read, loop_read_exact, loop_write, loop_write_vectored,
    pipe_eof, sparse_write,
};
