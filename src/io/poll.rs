//! Readiness waits with explicit timeout handling.
//!
//! Timeouts are plain [`Duration`]s wrapped in an [`Option`]: `None`
//! blocks until an event or an error, `Some(Duration::ZERO)` probes
//! without blocking, anything else waits at most roughly that long. An
//! expired wait comes back as [`WaitError::Timeout`] instead of a zero
//! count, so a call site cannot mistake it for readiness.

use std::io;
use std::os::fd::AsFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::libc;
pub use nix::poll::{PollFd, PollFlags};

use crate::error::WaitError;

/// Polls `fds` until one of the requested events fires or the timeout
/// expires, returning how many descriptors have events pending.
///
/// A signal interruption restarts the wait with the full timeout, so
/// the total time spent may exceed the requested bound; timeouts here
/// are best-effort, not deadlines. An empty set returns zero
/// immediately, whatever the timeout says.
pub fn poll_fds(
    fds: &mut [PollFd<'_>],
    timeout: Option<Duration>,
) -> Result<usize, WaitError> {
    if fds.is_empty() {
        return Ok(0);
    }

    let millis = timeout_millis(timeout);
    let ready = loop {
        match nix::poll::poll(fds, millis) {
            Ok(n) => break n,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(WaitError::Io(io::Error::from_raw_os_error(
                    e as i32,
                )))
            }
        }
    };

    if ready == 0 {
        return Err(WaitError::Timeout);
    }

    // The kernel reports a closed descriptor per entry instead of
    // failing the call; surface it as an error so it cannot be mistaken
    // for readiness.
    let invalid = fds.iter().any(|fd| {
        fd.revents()
            .unwrap_or(PollFlags::empty())
            .contains(PollFlags::POLLNVAL)
    });
    if invalid {
        return Err(WaitError::BadDescriptor);
    }

    Ok(ready as usize)
}

/// Waits for `events` on a single descriptor and returns the events
/// that actually fired, which may include hangup or error conditions
/// beyond the requested set.
pub fn fd_wait_for_event(
    fd: impl AsFd,
    events: PollFlags,
    timeout: Option<Duration>,
) -> Result<PollFlags, WaitError> {
    let fd = fd.as_fd();
    let mut fds = [PollFd::new(&fd, events)];
    poll_fds(&mut fds, timeout)?;
    Ok(fds[0].revents().unwrap_or(PollFlags::empty()))
}

/// Converts the wait bound to poll's millisecond argument. `None` maps
/// to the kernel's "block forever"; sub-millisecond remainders round up
/// so that a short positive timeout stays an actual wait instead of a
/// busy probe.
fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(t) => {
            let mut millis = t.as_millis();
            if t.subsec_nanos() % 1_000_000 != 0 {
                millis += 1;
            }
            millis.min(libc::c_int::MAX as u128) as libc::c_int
        }
    }
}
