//! Set of module Error
pub mod gather;
pub mod io;

pub use gather::GatherError;
pub use io::{ReadError, WaitError, WriteError};
