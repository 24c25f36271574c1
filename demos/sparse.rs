//! Writes a buffer that is mostly zeros into a temporary file, letting
//! the zero runs become holes, then compares logical size against the
//! blocks actually allocated.

use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::MetadataExt;

use anyhow::Result;
use gather_io::sparse_write;

fn main() -> Result<()> {
    env_logger::init();

    // four 64 KiB stripes, each carrying 16 real bytes up front
    let mut payload = vec![0u8; 256 * 1024];
    for (i, stripe) in payload.chunks_mut(64 * 1024).enumerate() {
        stripe[..16].fill(i as u8 + 1);
    }

    let mut file = tempfile::tempfile()?;
    let written = sparse_write(&file, &payload, 4096)?;

    // the trailing hole needs an explicit truncate to show up in the size
    file.set_len(written as u64)?;

    let meta = file.metadata()?;
    println!("logical size:     {} bytes", meta.len());
    println!("allocated on disk: {} bytes", meta.blocks() * 512);

    let mut back = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut back)?;
    assert_eq!(back, payload);
    println!("contents verified");

    Ok(())
}
