//! Descriptor IO that survives the usual syscall noise.
//!
//! Plain `read` and `write` may move fewer bytes than asked, get
//! interrupted by a signal, or report that a non-blocking descriptor
//! has nothing to offer right now. The loops here absorb all three so
//! call sites state their intent once:
//!
//! * [`loop_read`] keeps reading until the buffer is full or the stream
//!   ends, and returns the byte count. Bytes already read always win:
//!   an error after partial progress is swallowed in favor of the
//!   count, and surfaces on the next call instead.
//! * [`loop_read_exact`] is the all-or-error flavor; a stream that ends
//!   early is a [`ReadError::Short`].
//! * [`loop_write`] and [`loop_write_vectored`] retry until everything
//!   is out; there is no partial success to report, only `Ok` or an
//!   error.
//!
//! Each loop takes a `do_poll` flag. When set, a would-block result
//! parks the caller in a readiness wait and the loop resumes once the
//! descriptor opens up; when clear, would-block surfaces like any other
//! error (subject to the partial-progress rule above).

pub mod poll;
pub mod sparse;

pub use sparse::sparse_write;

use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::libc;
use nix::sys::uio::writev;
use nix::unistd;

use crate::error::{ReadError, WaitError, WriteError};
use crate::gather::GatherList;
use crate::io::poll::{fd_wait_for_event, PollFlags};

/// How much to read per round when draining a descriptor.
const DRAIN_CHUNK: usize = 2048;

/// Reads until `buf` is full or the stream ends, returning how many
/// bytes arrived.
///
/// Signal interruptions are retried. A would-block result either waits
/// for readability (`do_poll`) or ends the loop. Once any bytes have
/// been read, errors no longer abort the call: the partial count is
/// returned and the error is left for the next read to report.
///
/// An empty `buf` still issues one read, so a broken descriptor is
/// reported rather than masked.
pub fn loop_read(
    fd: impl AsFd,
    buf: &mut [u8],
    do_poll: bool,
) -> Result<usize, ReadError> {
    let fd = fd.as_fd();
    let mut total = 0;

    loop {
        match unistd::read(fd.as_raw_fd(), &mut buf[total..]) {
            // end of stream
            Ok(0) => return Ok(total),
            Ok(n) => {
                total += n;
                if total == buf.len() {
                    return Ok(total);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) if do_poll => {
                log::trace!("read would block, waiting for readability");
                // a wait error surfaces through the next read instead
                let _ = fd_wait_for_event(fd, PollFlags::POLLIN, None);
            }
            Err(_) if total > 0 => return Ok(total),
            Err(e) => {
                return Err(ReadError::Io(io::Error::from_raw_os_error(
                    e as i32,
                )))
            }
        }
    }
}

/// Reads exactly `buf.len()` bytes or fails.
///
/// A stream that ends beforehand comes back as [`ReadError::Short`]
/// with both counts, so the caller can tell truncation from a plain IO
/// error.
pub fn loop_read_exact(
    fd: impl AsFd,
    buf: &mut [u8],
    do_poll: bool,
) -> Result<(), ReadError> {
    let n = loop_read(fd, buf, do_poll)?;
    if n != buf.len() {
        return Err(ReadError::Short {
            expected: buf.len(),
            got: n,
        });
    }
    Ok(())
}

/// Writes all of `buf` or fails; partial progress is never reported.
///
/// Signal interruptions are retried and would-block either waits for
/// writability (`do_poll`) or surfaces as an error. A descriptor that
/// accepts zero bytes without an error would make the loop spin, so
/// that is cut short as [`WriteError::Zero`].
///
/// An empty `buf` still issues one write to validate the descriptor.
pub fn loop_write(
    fd: impl AsFd,
    buf: &[u8],
    do_poll: bool,
) -> Result<(), WriteError> {
    let fd = fd.as_fd();
    let mut written = 0;

    loop {
        match unistd::write(fd.as_raw_fd(), &buf[written..]) {
            Ok(0) if written < buf.len() => return Err(WriteError::Zero),
            Ok(n) => {
                written += n;
                if written >= buf.len() {
                    return Ok(());
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) if do_poll => {
                log::trace!("write would block, waiting for writability");
                let _ = fd_wait_for_event(fd, PollFlags::POLLOUT, None);
            }
            Err(e) => {
                return Err(WriteError::Io(io::Error::from_raw_os_error(
                    e as i32,
                )))
            }
        }
    }
}

/// Writes out a whole [`GatherList`] with vectored system calls,
/// resuming after partial transfers until every byte is on its way.
///
/// A consumption cursor tracks progress, so the list itself is left
/// untouched and can be written again afterwards. Each round hands the
/// kernel at most its per-call array limit; longer lists simply take
/// additional rounds. An empty list succeeds without touching the
/// descriptor.
pub fn loop_write_vectored(
    fd: impl AsFd,
    list: &GatherList<'_>,
    do_poll: bool,
) -> Result<(), WriteError> {
    let fd = fd.as_fd();
    let mut cursor = list.cursor();

    while !cursor.is_done() {
        let mut bufs = cursor.as_io_slices();
        // UIO_MAXIOV is the kernel's cap on entries per call
        bufs.truncate(libc::UIO_MAXIOV as usize);
        match writev(fd, &bufs) {
            Ok(0) => return Err(WriteError::Zero),
            Ok(n) => {
                log::trace!("vectored write moved {} bytes", n);
                cursor.advance(n);
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) if do_poll => {
                log::trace!("write would block, waiting for writability");
                let _ = fd_wait_for_event(fd, PollFlags::POLLOUT, None);
            }
            Err(e) => {
                return Err(WriteError::Io(io::Error::from_raw_os_error(
                    e as i32,
                )))
            }
        }
    }

    Ok(())
}

/// Discards whatever is already buffered on `fd` and returns how many
/// bytes were thrown away.
///
/// Each round first probes readiness with a zero timeout, so the call
/// never blocks on a quiet descriptor: once nothing more is pending it
/// returns. End-of-stream and a would-block race both end the drain
/// quietly as well.
pub fn flush_fd(fd: impl AsFd) -> Result<usize, ReadError> {
    let fd = fd.as_fd();
    let mut buf = [0u8; DRAIN_CHUNK];
    let mut count = 0;

    loop {
        match fd_wait_for_event(fd, PollFlags::POLLIN, Some(Duration::ZERO)) {
            // readable, drain a chunk below
            Ok(_) => {}
            Err(WaitError::Timeout) => return Ok(count),
            Err(e) => return Err(ReadError::Io(e.into())),
        }

        match unistd::read(fd.as_raw_fd(), &mut buf) {
            Ok(0) => return Ok(count),
            Ok(n) => count += n,
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) => return Ok(count),
            Err(e) => {
                return Err(ReadError::Io(io::Error::from_raw_os_error(
                    e as i32,
                )))
            }
        }
    }
}

/// Tells whether the peer of a pipe-like descriptor has hung up,
/// without consuming any buffered data.
///
/// Hangup is reported even while unread bytes are still buffered, so a
/// `true` here means "no more will ever arrive", not "nothing left to
/// read". A quiet descriptor with a live peer reports `false`.
pub fn pipe_eof(fd: impl AsFd) -> Result<bool, WaitError> {
    match fd_wait_for_event(fd, PollFlags::POLLIN, Some(Duration::ZERO)) {
        Ok(revents) => Ok(revents.contains(PollFlags::POLLHUP)),
        Err(WaitError::Timeout) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::{FromRawFd, OwnedFd};
    use std::thread;

    use nix::fcntl::{fcntl, FcntlArg, OFlag};
    use nix::unistd::pipe;

    use super::*;

    /// Owned ends of a fresh pipe, so the descriptors close on drop.
    fn pipe_pair() -> (OwnedFd, OwnedFd) {
        let (rx, tx) = pipe().unwrap();
        unsafe { (OwnedFd::from_raw_fd(rx), OwnedFd::from_raw_fd(tx)) }
    }

    #[test]
    fn write_then_read_round_trip() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, b"hello gather", false).unwrap();

        let mut buf = [0u8; 12];
        loop_read_exact(&rx, &mut buf, false).unwrap();
        assert_eq!(&buf, b"hello gather");
    }

    #[test]
    fn partial_bytes_at_eof_are_returned() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, b"abc", false).unwrap();
        drop(tx);

        let mut buf = [0u8; 8];
        assert_eq!(loop_read(&rx, &mut buf, false).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn short_stream_fails_exact_read() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, b"abc", false).unwrap();
        drop(tx);

        let mut buf = [0u8; 8];
        let err = loop_read_exact(&rx, &mut buf, false).unwrap_err();
        assert!(matches!(err, ReadError::Short { expected: 8, got: 3 }));
    }

    #[test]
    fn partial_bytes_win_over_would_block() {
        let (rx, tx) = pipe_pair();
        fcntl(rx.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();
        loop_write(&tx, b"abc", false).unwrap();

        // 3 buffered bytes, then the pipe runs dry: the count wins
        let mut buf = [0u8; 8];
        assert_eq!(loop_read(&rx, &mut buf, false).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn nonblocking_read_without_poll_surfaces_would_block() {
        let (rx, _tx) = pipe_pair();
        fcntl(rx.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();

        let mut buf = [0u8; 4];
        match loop_read(&rx, &mut buf, false) {
            Err(ReadError::Io(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::WouldBlock)
            }
            other => panic!("expected would-block, got {:?}", other),
        }
    }

    #[test]
    fn polling_read_waits_for_late_writer() {
        let (rx, tx) = pipe_pair();
        fcntl(rx.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            loop_write(&tx, b"late", false).unwrap();
        });

        let mut buf = [0u8; 4];
        loop_read_exact(&rx, &mut buf, true).unwrap();
        assert_eq!(&buf, b"late");
        writer.join().unwrap();
    }

    #[test]
    fn empty_read_buffer_returns_zero() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, b"pending", false).unwrap();

        let mut empty: [u8; 0] = [];
        assert_eq!(loop_read(&rx, &mut empty, false).unwrap(), 0);

        // nothing was consumed by the empty read
        let mut buf = [0u8; 7];
        loop_read_exact(&rx, &mut buf, false).unwrap();
        assert_eq!(&buf, b"pending");
    }

    #[test]
    fn empty_write_validates_descriptor() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, &[], false).unwrap();
        drop(tx);

        // nothing was written
        let mut buf = [0u8; 1];
        assert_eq!(loop_read(&rx, &mut buf, false).unwrap(), 0);
    }

    #[test]
    fn vectored_write_preserves_segment_order() {
        let (rx, tx) = pipe_pair();

        let mut list = GatherList::new();
        list.push_owned(b"head".to_vec()).unwrap();
        list.push(b" and ").unwrap();
        list.push_string_field("TAIL", "end").unwrap();

        loop_write_vectored(&tx, &list, false).unwrap();

        let mut buf = vec![0u8; list.total_size()];
        loop_read_exact(&rx, &mut buf, false).unwrap();
        assert_eq!(buf, b"head and TAIL=end".to_vec());
    }

    #[test]
    fn vectored_write_survives_partial_progress() {
        let (rx, tx) = pipe_pair();
        // a non-blocking writer can only land a pipe buffer's worth per
        // round, so the cursor has to resume mid-list several times
        fcntl(tx.as_raw_fd(), FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).unwrap();

        let chunk = vec![0x5au8; 48 * 1024];
        let mut list = GatherList::new();
        list.push(&chunk).unwrap();
        list.push(&chunk).unwrap();
        list.push(&chunk).unwrap();
        let total = list.total_size();

        let reader = thread::spawn(move || {
            let mut drained = vec![0u8; 3 * 48 * 1024];
            loop_read_exact(&rx, &mut drained, false).unwrap();
            drained
        });

        loop_write_vectored(&tx, &list, true).unwrap();

        let drained = reader.join().unwrap();
        assert_eq!(drained.len(), total);
        assert!(drained.iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn vectored_write_chunks_an_oversized_slice_array() {
        let (rx, tx) = pipe_pair();

        // more segments than one call may carry: later rounds take the rest
        let data: Vec<u8> = (0..2000).map(|i| (i % 251) as u8).collect();
        let mut list = GatherList::new();
        for byte in data.chunks(1) {
            list.push(byte).unwrap();
        }

        loop_write_vectored(&tx, &list, false).unwrap();
        drop(tx);

        let mut buf = vec![0u8; data.len()];
        loop_read_exact(&rx, &mut buf, false).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn vectored_write_of_empty_list_is_noop() {
        let (_rx, tx) = pipe_pair();
        let list = GatherList::new();
        loop_write_vectored(&tx, &list, false).unwrap();
    }

    #[test]
    fn flush_discards_buffered_bytes() {
        let (rx, tx) = pipe_pair();
        loop_write(&tx, &[7u8; 5000], false).unwrap();

        assert_eq!(flush_fd(&rx).unwrap(), 5000);

        // drained: a zero-timeout wait reports nothing left
        let err =
            fd_wait_for_event(&rx, PollFlags::POLLIN, Some(Duration::ZERO))
                .unwrap_err();
        assert!(matches!(err, WaitError::Timeout));
    }

    #[test]
    fn flush_of_quiet_pipe_is_zero() {
        let (rx, _tx) = pipe_pair();
        assert_eq!(flush_fd(&rx).unwrap(), 0);
    }

    #[test]
    fn pipe_eof_tracks_the_writer() {
        let (rx, tx) = pipe_pair();
        assert!(!pipe_eof(&rx).unwrap());

        loop_write(&tx, b"x", false).unwrap();
        // data pending but the writer is still around
        assert!(!pipe_eof(&rx).unwrap());

        drop(tx);
        // hangup shows up even while data is still buffered
        assert!(pipe_eof(&rx).unwrap());

        // and the check consumed nothing
        let mut buf = [0u8; 1];
        assert_eq!(loop_read(&rx, &mut buf, false).unwrap(), 1);
        assert_eq!(buf[0], b'x');
    }
}
