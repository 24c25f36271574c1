use crate::error::gather::Result;

/// One entry of a gather list: a contiguous run of bytes that is either
/// borrowed from the caller or owned by the list holding it.
///
/// The two flavors exist so one list can mix spans of long-lived caller
/// memory with small formatted buffers (field strings, length prefixes)
/// without forcing a copy of the large spans. Zero-length segments are
/// legal; they occupy a slot but contribute nothing to a transfer.
#[derive(Debug)]
pub enum Segment<'a> {
  /// A span of caller memory. The borrow checker keeps the backing
  /// buffer alive and unmoved for as long as the segment exists.
  Borrowed(&'a [u8]),
  /// A buffer the segment owns and releases when dropped.
  Owned(Vec<u8>),
}

impl<'a> Segment<'a> {
  /// Builds an owned segment holding exactly `field=value`.
  ///
  /// The buffer is sized up front with a fallible reservation, so a
  /// failed allocation comes back as an error instead of aborting the
  /// process.
  pub fn string_field(field: &str, value: &str) -> Result<Self> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(field.len() + 1 + value.len())?;
    buf.extend_from_slice(field.as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value.as_bytes());
    Ok(Segment::Owned(buf))
  }

  /// Returns the bytes the segment currently refers to.
  #[inline]
  pub fn as_slice(&self) -> &[u8] {
    match self {
      Segment::Borrowed(span) => span,
      Segment::Owned(buf) => buf,
    }
  }

  /// Byte length of the segment.
  #[inline]
  pub fn len(&self) -> usize {
    self.as_slice().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Duplicates the segment without tying the copy to `self`'s storage:
  /// borrowed spans are re-borrowed from their backing buffer, owned
  /// buffers are copied byte for byte through a fallible reservation.
  pub(crate) fn try_duplicate(&self) -> Result<Segment<'a>> {
    match self {
      Segment::Borrowed(span) => Ok(Segment::Borrowed(*span)),
      Segment::Owned(buf) => {
        let mut copy = Vec::new();
        copy.try_reserve_exact(buf.len())?;
        copy.extend_from_slice(buf);
        Ok(Segment::Owned(copy))
      }
    }
  }
}
