use std::collections::TryReserveError;

pub type Result<T, E = GatherError> = std::result::Result<T, E>;

/// Error type returned on failed gather list growth.
///
/// This error is non-fatal: a list whose growth failed keeps every
/// segment appended by earlier calls and remains fully usable, so
/// callers may recover from it (by shedding load, say) instead of
/// aborting.
#[derive(Debug, thiserror::Error)]
pub enum GatherError {
    #[error("{0}")]
    /// The descriptor array or a formatted field buffer could not be
    /// grown to the required capacity.
    Alloc(TryReserveError),
}

impl From<TryReserveError> for GatherError {
    fn from(value: TryReserveError) -> Self {
        Self::Alloc(value)
    }
}
