//! Consumption cursor for partial vectored transfers.
//!
//! Vectored system calls report how many bytes they actually moved, and
//! that count routinely covers only part of the gather array. The
//! cursor turns such a count into a position inside the list without
//! modifying any segment:
//!
//! ```text
//! segments:  | 5 bytes      | 0 | 7 bytes          |
//!                  ^
//!                  seg 0, offset 2
//!
//!            advance(5)
//!
//! segments:  | 5 bytes      | 0 | 7 bytes          |
//!                                    ^
//!                                    seg 2, offset 2
//! ```
//!
//! Zero-length segments are hopped over, both when advancing and when
//! producing the slice array for the next call, since the kernel counts
//! array entries against its per-call limit even when they carry no
//! bytes. Because only the cursor moves, the same list can be written
//! out again, or to several destinations, each with its own cursor.

use std::io::IoSlice;

use super::GatherList;

/// Sum of the byte lengths of a gather array.
pub fn total_len(bufs: &[IoSlice<'_>]) -> usize {
  bufs.iter().map(|buf| buf.len()).sum()
}

/// Tracks how many bytes of a [`GatherList`] a transfer has consumed.
///
/// The cursor holds a shared borrow of the list and only ever moves
/// forward: [`GatherCursor::as_io_slices`] yields the spans still to
/// send, and once the kernel reports a byte count,
/// [`GatherCursor::advance`] moves past them.
#[derive(Debug)]
pub struct GatherCursor<'l, 'a> {
  list: &'l GatherList<'a>,
  /// Index of the first segment not fully consumed.
  seg: usize,
  /// Bytes already consumed of that segment.
  offset: usize,
}

impl<'l, 'a> GatherCursor<'l, 'a> {
  pub(super) fn new(list: &'l GatherList<'a>) -> Self {
    let mut cursor = GatherCursor {
      list,
      seg: 0,
      offset: 0,
    };
    cursor.skip_consumed();
    cursor
  }

  /// Bytes not yet consumed.
  pub fn remaining(&self) -> usize {
    let tail: usize = self.list.segments[self.seg..]
      .iter()
      .map(|segment| segment.len())
      .sum();
    tail - self.offset
  }

  /// True once every byte of the list has been consumed. A list with
  /// nothing to transfer (no segments, or only zero-length ones) is
  /// done from the start.
  pub fn is_done(&self) -> bool {
    self.seg == self.list.segments.len()
  }

  /// Moves the cursor forward by `n` transferred bytes and returns
  /// whether the whole list is now consumed.
  ///
  /// # Panics
  ///
  /// Panics if `n` exceeds [`GatherCursor::remaining`]: a transfer that
  /// claims more bytes than it was handed is a caller bug, not a
  /// condition to limp through.
  pub fn advance(&mut self, n: usize) -> bool {
    assert!(
      n <= self.remaining(),
      "cannot advance gather cursor past the remaining bytes"
    );

    let mut left = n;
    while left > 0 {
      let in_segment = self.list.segments[self.seg].len() - self.offset;
      if in_segment == 0 {
        // fully consumed or zero-length, move past it
        self.seg += 1;
        self.offset = 0;
        continue;
      }
      let step = in_segment.min(left);
      self.offset += step;
      left -= step;
    }

    self.skip_consumed();
    self.is_done()
  }

  /// Borrows the spans still to transfer as an [`IoSlice`] array ready
  /// for a vectored system call.
  ///
  /// The first span is trimmed by the in-segment offset, and
  /// zero-length spans are left out entirely, so the array holds
  /// exactly the bytes the kernel should see next.
  pub fn as_io_slices(&self) -> Vec<IoSlice<'_>> {
    let mut slices =
      Vec::with_capacity(self.list.segments.len() - self.seg);
    for (i, segment) in self.list.segments[self.seg..].iter().enumerate() {
      let span = segment.as_slice();
      let span = if i == 0 { &span[self.offset..] } else { span };
      if !span.is_empty() {
        slices.push(IoSlice::new(span));
      }
    }
    slices
  }

  /// Restores the invariant that `seg` names a segment with bytes left,
  /// or points one past the end, by skipping everything the offset has
  /// fully covered along with zero-length segments.
  fn skip_consumed(&mut self) {
    while self.seg < self.list.segments.len() {
      let len = self.list.segments[self.seg].len();
      if self.offset < len {
        break;
      }
      self.offset -= len;
      self.seg += 1;
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn flatten(cursor: &GatherCursor<'_, '_>) -> Vec<u8> {
    cursor
      .as_io_slices()
      .iter()
      .flat_map(|slice| slice.to_vec())
      .collect()
  }

  #[test]
  fn should_sum_io_slice_lengths() {
    let small = [0u8; 3];
    let large = [0u8; 9];
    let bufs =
      [IoSlice::new(&small), IoSlice::new(&[]), IoSlice::new(&large)];
    assert_eq!(total_len(&bufs), 12);
    assert_eq!(total_len(&[]), 0);
  }

  /// Consuming exactly the first segment lands the cursor past the
  /// zero-length filler, on the head of the last segment.
  ///
  /// | 5 bytes | 0 | 7 bytes |
  #[test]
  fn should_skip_zero_length_segments() {
    let head = [1u8; 5];
    let hole: [u8; 0] = [];
    let tail = [2u8; 7];
    let mut list = GatherList::new();
    list.push(&head).unwrap();
    list.push(&hole).unwrap();
    list.push(&tail).unwrap();

    let mut cursor = list.cursor();
    assert_eq!(cursor.remaining(), 12);

    assert!(!cursor.advance(5));
    assert_eq!(cursor.remaining(), 7);
    assert_eq!(flatten(&cursor), vec![2u8; 7]);

    assert!(cursor.advance(7));
    assert_eq!(cursor.remaining(), 0);
    assert!(cursor.as_io_slices().is_empty());
  }

  #[test]
  fn should_trim_partially_consumed_segment() {
    let data = *b"0123456789";
    let mut list = GatherList::new();
    list.push(&data[..4]).unwrap();
    list.push(&data[4..]).unwrap();

    let mut cursor = list.cursor();
    assert!(!cursor.advance(2));
    assert_eq!(cursor.remaining(), 8);

    let slices = cursor.as_io_slices();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].to_vec(), b"23".to_vec());
    assert_eq!(slices[1].to_vec(), b"456789".to_vec());
  }

  /// Stepwise advances must agree with skipping the same number of
  /// bytes in the flattened contents.
  ///
  /// | 3 bytes | 3 bytes | 3 bytes |
  ///     2 -------> 3 ------> 4
  #[test]
  fn should_advance_across_segment_boundaries() {
    let blocks = [*b"abc", *b"def", *b"ghi"];
    let mut list = GatherList::new();
    for block in &blocks {
      list.push(block).unwrap();
    }
    let flat: Vec<u8> = blocks.iter().flatten().copied().collect();

    let mut cursor = list.cursor();
    let mut consumed = 0;
    for step in [2usize, 3, 4] {
      let done = cursor.advance(step);
      consumed += step;
      assert_eq!(done, consumed == flat.len());
      assert_eq!(flatten(&cursor), flat[consumed..].to_vec());
    }
    assert!(cursor.is_done());
  }

  #[test]
  fn should_be_done_on_empty_list() {
    let list = GatherList::new();
    let mut cursor = list.cursor();
    assert!(cursor.is_done());
    assert_eq!(cursor.remaining(), 0);
    // advancing by nothing is allowed and reports completion
    assert!(cursor.advance(0));
  }

  #[test]
  fn should_be_done_on_only_zero_length_segments() {
    let hole: [u8; 0] = [];
    let mut list = GatherList::new();
    list.push(&hole).unwrap();
    list.push(&hole).unwrap();

    let cursor = list.cursor();
    assert!(cursor.is_done());
    assert_eq!(cursor.remaining(), 0);
    assert!(cursor.as_io_slices().is_empty());
  }

  #[test]
  fn should_keep_position_on_zero_advance() {
    let data = [9u8; 6];
    let mut list = GatherList::new();
    list.push(&data).unwrap();

    let mut cursor = list.cursor();
    assert!(!cursor.advance(0));
    assert_eq!(cursor.remaining(), 6);
  }

  #[test]
  #[should_panic]
  fn should_panic_advancing_past_end() {
    let data = [7u8; 4];
    let mut list = GatherList::new();
    list.push(&data).unwrap();

    let mut cursor = list.cursor();
    cursor.advance(5);
  }
}
