//! Assembles a structured log record out of borrowed and owned pieces,
//! sends it through a pipe with a single vectored write, and reads it
//! back on the other end.
//!
//! Run with `RUST_LOG=trace` to watch the transfer loop work.

use std::os::fd::{FromRawFd, OwnedFd};

use anyhow::Result;
use gather_io::{loop_read_exact, loop_write_vectored, GatherList};
use nix::unistd::pipe;

fn main() -> Result<()> {
    env_logger::init();

    let payload = b"a device appeared while we were not looking";

    let mut record = GatherList::new();
    record.push_string_field("MESSAGE", "device plugged in")?;
    record.push(b"\n")?;
    record.push_string_field_owned("DEVICE", String::from("/dev/sdb1"))?;
    record.push(b"\n")?;
    record.push_string_field("PRIORITY", "6")?;
    record.push(b"\n")?;
    record.push(payload)?;
    record.push(b"\n")?;

    println!(
        "record: {} segments, {} bytes",
        record.len(),
        record.total_size()
    );

    let (rx, tx) = pipe()?;
    // take ownership so the descriptors close on drop
    let (rx, tx) =
        unsafe { (OwnedFd::from_raw_fd(rx), OwnedFd::from_raw_fd(tx)) };
    loop_write_vectored(&tx, &record, false)?;

    let mut incoming = vec![0u8; record.total_size()];
    loop_read_exact(&rx, &mut incoming, false)?;

    println!("--- received ---");
    print!("{}", String::from_utf8_lossy(&incoming));

    Ok(())
}
