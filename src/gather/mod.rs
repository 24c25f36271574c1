//! This module provides a growable collection of byte spans for
//! assembling records out of pieces that live in different places, and
//! for handing those pieces to vectored IO without copying them into
//! one buffer first.
//!
//! # Building a list
//!
//! A [`GatherList`] is an ordered sequence of [`Segment`]s. Segments
//! either borrow caller memory or own a small formatted buffer, and a
//! single list freely mixes both:
//!
//! ```text
//! +--------------------+----------------+--------------------+
//! | borrowed: payload  | owned: "LEN=3" | borrowed: trailer  |
//! +--------------------+----------------+--------------------+
//!          |                                      |
//!     caller's buffer                        caller's buffer
//! ```
//!
//! Every growth step reserves storage fallibly: when the process is
//! under memory pressure the append reports an error and the list stays
//! exactly as it was, which matters to callers assembling diagnostic
//! records at the worst possible time.
//!
//! # Consuming a list
//!
//! Transfers go through a [`GatherCursor`], which borrows the list and
//! tracks how many bytes the kernel has accepted so far. The list
//! itself is never modified by a transfer, so it can be sent again or
//! to several destinations.

pub mod cursor;
pub mod segment;

pub use cursor::{total_len, GatherCursor};
pub use segment::Segment;

use std::io::IoSlice;

use crate::error::gather::Result;

/// An ordered, growable collection of byte spans acting as one logical
/// buffer for vectored IO.
///
/// Dropping the list releases its owned buffers; borrowed spans are
/// left to their real owners.
#[derive(Debug, Default)]
pub struct GatherList<'a> {
  segments: Vec<Segment<'a>>,
}

impl<'a> GatherList<'a> {
  /// Creates an empty list. No storage is reserved until the first
  /// append.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of segments currently held, zero-length ones included.
  pub fn len(&self) -> usize {
    self.segments.len()
  }

  /// True when the list holds no segments at all.
  ///
  /// This counts segments, not bytes: a list holding only zero-length
  /// segments is not empty.
  pub fn is_empty(&self) -> bool {
    self.segments.is_empty()
  }

  /// Sum of the byte lengths of all segments.
  pub fn total_size(&self) -> usize {
    self.segments.iter().map(Segment::len).sum()
  }

  /// Appends a span of caller memory without copying it.
  ///
  /// Only the reference is stored, so the backing buffer must outlive
  /// the list; the borrow checker enforces exactly that.
  pub fn push(&mut self, data: &'a [u8]) -> Result<()> {
    self.segments.try_reserve(1)?;
    self.segments.push(Segment::Borrowed(data));
    Ok(())
  }

  /// Appends a buffer the list takes ownership of.
  ///
  /// The buffer is released by [`GatherList::clear`] or when the list
  /// drops. If the append itself fails the buffer is dropped here, so
  /// its storage is reclaimed either way.
  pub fn push_owned(&mut self, data: Vec<u8>) -> Result<()> {
    self.segments.try_reserve(1)?;
    self.segments.push(Segment::Owned(data));
    Ok(())
  }

  /// Formats `field=value` into a fresh owned buffer and appends it.
  pub fn push_string_field(&mut self, field: &str, value: &str) -> Result<()> {
    let segment = Segment::string_field(field, value)?;
    self.segments.try_reserve(1)?;
    self.segments.push(segment);
    Ok(())
  }

  /// Like [`GatherList::push_string_field`], but consumes the value.
  ///
  /// The value's storage is released when this returns, no matter the
  /// outcome; the list keeps its own formatted copy instead.
  pub fn push_string_field_owned(
    &mut self,
    field: &str,
    value: String,
  ) -> Result<()> {
    self.push_string_field(field, &value)
  }

  /// Appends duplicates of all of `other`'s segments, in order.
  ///
  /// Owned buffers are copied, so the two lists never share storage and
  /// each can be dropped independently. On failure `self` is rolled
  /// back to exactly its previous segment sequence; `other` is never
  /// touched either way.
  pub fn append_from(&mut self, other: &GatherList<'a>) -> Result<()> {
    let len_before = self.segments.len();
    let appended = self.append_all(other);
    if appended.is_err() {
      // drop the partial tail, releasing any owned copies made so far
      self.segments.truncate(len_before);
    }
    appended
  }

  fn append_all(&mut self, other: &GatherList<'a>) -> Result<()> {
    self.segments.try_reserve(other.segments.len())?;
    for segment in &other.segments {
      self.segments.push(segment.try_duplicate()?);
    }
    Ok(())
  }

  /// Drops all segments, releasing every owned buffer. Borrowed spans
  /// are left untouched in their backing storage.
  ///
  /// The list stays usable for further appends; clearing an already
  /// empty list is a no-op.
  pub fn clear(&mut self) {
    self.segments.clear();
  }

  /// Re-points borrowed spans from one backing buffer into another.
  ///
  /// Every borrowed segment lying inside `old` is replaced by the span
  /// at the same offset inside `new`; segments pointing elsewhere and
  /// owned buffers are left alone. `new` must be at least as long as
  /// `old` and hold the same bytes at the rebased offsets, typically
  /// because it was copied from `old` beforehand.
  ///
  /// This keeps a list valid across an arena hand-over: build the list
  /// against a scratch buffer, copy the scratch bytes into longer-lived
  /// storage, then rebase the list onto that storage. Only the stored
  /// reference values are examined, never the memory behind them.
  pub fn rebase(&mut self, old: &'a [u8], new: &'a [u8]) {
    debug_assert!(new.len() >= old.len());

    let old_start = old.as_ptr() as usize;
    let old_end = old_start + old.len();

    for segment in &mut self.segments {
      if let Segment::Borrowed(span) = segment {
        let span_start = span.as_ptr() as usize;
        let contained = span_start >= old_start
          && span_start < old_end
          && span_start + span.len() <= old_end;
        if contained {
          let offset = span_start - old_start;
          *span = &new[offset..offset + span.len()];
        }
      }
    }
  }

  /// Iterates over the byte spans of all segments, in order.
  pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
    self.segments.iter().map(|segment| segment.as_slice())
  }

  /// Borrows every segment as an [`IoSlice`] for direct use with
  /// vectored system calls.
  ///
  /// Zero-length segments are kept so the array maps one-to-one onto
  /// the segment sequence; transfer loops that must not hand empty
  /// entries to the kernel go through [`GatherList::cursor`] instead.
  pub fn as_io_slices(&self) -> Vec<IoSlice<'_>> {
    self
      .segments
      .iter()
      .map(|segment| IoSlice::new(segment.as_slice()))
      .collect()
  }

  /// Starts a consumption cursor for driving partial vectored
  /// transfers. The cursor borrows the list, so segments cannot be
  /// added or cleared while a transfer is in flight.
  pub fn cursor(&self) -> GatherCursor<'_, 'a> {
    GatherCursor::new(self)
  }
}
