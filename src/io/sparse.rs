//! Sparse file writing: zero runs become holes instead of data blocks.

use std::os::fd::{AsFd, AsRawFd};

use nix::libc;
use nix::unistd::{lseek, Whence};

use crate::error::WriteError;
use crate::io::loop_write;

/// Writes `data` at the descriptor's current position, seeking over
/// zero runs so the filesystem can leave holes there.
///
/// The buffer is scanned in windows of `run_length` bytes; a window
/// that is entirely zero is skipped by seeking, anything else is
/// written verbatim. Returns the number of logical bytes the write
/// covers, which is always `data.len()`: skipped windows still count,
/// they just occupy no disk blocks.
///
/// When the buffer ends in a zero run the file's size is *not* extended
/// past the last written byte, since seeking beyond the end does not
/// grow a file by itself. Callers that need the full logical size on
/// disk truncate the file up to it afterwards.
///
/// # Panics
///
/// Panics if `run_length` is zero, as the scan could never make
/// progress.
pub fn sparse_write(
    fd: impl AsFd,
    data: &[u8],
    run_length: usize,
) -> Result<usize, WriteError> {
    assert!(run_length > 0, "sparse write needs a non-zero run length");

    let fd = fd.as_fd();
    // start of the scan window and of the pending unwritten bytes
    let mut scan = 0;
    let mut pending = 0;

    while scan < data.len() {
        let window = run_length.min(data.len() - scan);
        if data[scan..scan + window].iter().all(|&b| b == 0) {
            if scan > pending {
                loop_write(fd, &data[pending..scan], false)?;
            }
            log::trace!("seeking over {} zero bytes", window);
            lseek(fd.as_raw_fd(), window as libc::off_t, Whence::SeekCur)
                .map_err(|e| {
                    WriteError::Io(std::io::Error::from_raw_os_error(e as i32))
                })?;
            scan += window;
            pending = scan;
        } else {
            scan += window;
        }
    }

    if data.len() > pending {
        loop_write(fd, &data[pending..], false)?;
    }

    Ok(data.len())
}
