//! Mark-anchored text regions.
//!
//! A [`TextRegion`] is a set of disjoint character ranges over a [`MarkBuffer`]. Each
//! maximal covered span is a [`Subregion`] whose two endpoints are buffer marks, so the
//! region follows the text as it is edited:
//!
//! - the start mark has [`Gravity::Left`]: text inserted exactly at the start ends up
//!   inside the subregion, text inserted before it does not;
//! - the end mark has [`Gravity::Right`]: text inserted exactly at the end extends the
//!   subregion.
//!
//! After every [`TextRegion::add`], [`TextRegion::subtract`] and [`TextRegion::normalize`]
//! the subregions are sorted, non-empty, and neither overlap nor touch (touching spans are
//! coalesced). Buffer edits made in between can temporarily collapse or join subregions;
//! the next mutating call cleans that up.
//!
//! The region does not hold on to its buffer. Every operation that needs positions takes
//! the buffer as an argument, and the region only remembers the buffer's [`BufferId`].
//!
//! All ranges are half-open `[start, end)` character offsets. Reversed arguments are
//! swapped, and offsets past the end of the buffer are clamped to it.

use crate::buffer::{BufferId, Gravity, MarkBuffer, MarkId};
use crate::error::RegionError;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

/// One maximal covered span of a region.
///
/// Owns its two marks; they are released when the subregion leaves the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subregion {
    start: MarkId,
    end: MarkId,
}

impl Subregion {
    fn create<B: MarkBuffer + ?Sized>(buffer: &mut B, start: usize, end: usize) -> Self {
        Self {
            start: buffer.create_mark(start, Gravity::Left),
            end: buffer.create_mark(end, Gravity::Right),
        }
    }

    /// Mark anchoring the start of the span.
    pub fn start_mark(&self) -> MarkId {
        self.start
    }

    /// Mark anchoring the (exclusive) end of the span.
    pub fn end_mark(&self) -> MarkId {
        self.end
    }
}

/// Opaque position in a region's subregion list.
///
/// A cursor is only valid until the next structural change of the region it came from;
/// afterwards every cursor operation fails with [`RegionError::StaleCursor`]. It is
/// forward-only: request a new one to start over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionCursor {
    region: u64,
    stamp: u64,
    index: usize,
}

impl RegionCursor {
    /// Index of the subregion the cursor points at (equal to the count at the end).
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A dynamic set of disjoint, mark-anchored subregions of one buffer.
#[derive(Debug)]
pub struct TextRegion {
    id: u64,
    buffer: BufferId,
    subregions: Vec<Subregion>,
    /// Bumped on every structural change; cursors compare against it.
    stamp: u64,
    /// Buffer revision the subregion list was last validated against.
    synced_revision: u64,
}

impl TextRegion {
    /// Create an empty region bound to `buffer`.
    pub fn new<B: MarkBuffer + ?Sized>(buffer: &B) -> Self {
        Self {
            id: NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed),
            buffer: buffer.buffer_id(),
            subregions: Vec::new(),
            stamp: 0,
            synced_revision: buffer.revision(),
        }
    }

    /// Identity of the buffer this region is bound to.
    pub fn buffer_id(&self) -> BufferId {
        self.buffer
    }

    /// Number of subregions. O(1).
    ///
    /// Reflects the list as of the last mutating call; see [`TextRegion::normalize`].
    pub fn subregion_count(&self) -> usize {
        self.subregions.len()
    }

    /// Returns `true` if the region covers nothing.
    pub fn is_empty(&self) -> bool {
        self.subregions.is_empty()
    }

    /// Subregion records in order.
    pub fn subregion_marks(&self) -> &[Subregion] {
        &self.subregions
    }

    /// Ensure `[start, end)` is covered, coalescing with every subregion it overlaps or
    /// touches.
    ///
    /// Existing marks are reused where possible: a merge keeps the first subregion's start
    /// mark and the last one's end mark, releasing everything in between. Only a range that
    /// touches nothing allocates a new mark pair. Empty ranges are ignored.
    pub fn add<B: MarkBuffer + ?Sized>(&mut self, buffer: &mut B, start: usize, end: usize) {
        let (start, end) = self.clamp(buffer, start, end);
        tracing::trace!(region = self.id, start, end, "region add");
        if start == end {
            return;
        }
        self.normalize(buffer);

        let spans = self.spans(buffer);
        // Touching counts: the run starts at the first span ending at or after `start`
        // and ends after the last span starting at or before `end`.
        let first = spans.partition_point(|&(_, e)| e < start);
        let last = spans.partition_point(|&(s, _)| s <= end);

        if first >= last {
            let sr = Subregion::create(buffer, start, end);
            self.subregions.insert(first, sr);
        } else {
            if last - first > 1 {
                let tail = self.subregions.remove(last - 1);
                for sr in self.subregions.drain(first + 1..last - 1) {
                    release(buffer, sr);
                }
                let survivor = &mut self.subregions[first];
                delete_mark(buffer, survivor.end);
                delete_mark(buffer, tail.start);
                survivor.end = tail.end;
                tracing::debug!(region = self.id, merged = last - first, "subregions merged");
            }

            let survivor = self.subregions[first];
            if start < spans[first].0 {
                move_mark(buffer, survivor.start, start);
            }
            if end > spans[last - 1].1 {
                move_mark(buffer, survivor.end, end);
            }
        }

        self.stamp += 1;
    }

    /// Remove `[start, end)` from the region.
    ///
    /// Subregions inside the range are deleted, subregions overlapping one side are
    /// truncated by moving a single mark, and a subregion strictly containing the range is
    /// split in two, which allocates exactly one new mark pair.
    pub fn subtract<B: MarkBuffer + ?Sized>(&mut self, buffer: &mut B, start: usize, end: usize) {
        let (start, end) = self.clamp(buffer, start, end);
        tracing::trace!(region = self.id, start, end, "region subtract");
        if start == end {
            return;
        }
        self.normalize(buffer);

        let spans = self.spans(buffer);
        let first = spans.partition_point(|&(_, e)| e <= start);
        let last = spans.partition_point(|&(s, _)| s < end);
        if first >= last {
            return;
        }

        let head_survives = spans[first].0 < start;
        let tail_survives = end < spans[last - 1].1;

        if last - first == 1 && head_survives && tail_survives {
            let old_end = self.subregions[first].end;
            let tail = Subregion {
                start: buffer.create_mark(end, Gravity::Left),
                end: old_end,
            };
            self.subregions[first].end = buffer.create_mark(start, Gravity::Right);
            self.subregions.insert(first + 1, tail);
            self.stamp += 1;
            tracing::debug!(region = self.id, start, end, "subregion split");
            return;
        }

        if head_survives {
            move_mark(buffer, self.subregions[first].end, start);
        }
        if tail_survives {
            move_mark(buffer, self.subregions[last - 1].start, end);
        }

        let drop_from = if head_survives { first + 1 } else { first };
        let drop_to = if tail_survives { last - 1 } else { last };
        for sr in self.subregions.drain(drop_from..drop_to) {
            release(buffer, sr);
        }

        self.stamp += 1;
        self.prune_empty(buffer);
    }

    /// A new region covering exactly the part of this one inside `[start, end)`.
    ///
    /// The result owns fresh marks in the same buffer. Returns `None` if the overlap is
    /// empty.
    pub fn intersect<B: MarkBuffer + ?Sized>(
        &mut self,
        buffer: &mut B,
        start: usize,
        end: usize,
    ) -> Option<TextRegion> {
        let (start, end) = self.clamp(buffer, start, end);
        if start == end {
            return None;
        }
        self.normalize(buffer);

        let spans = self.spans(buffer);
        let first = spans.partition_point(|&(_, e)| e <= start);
        let last = spans.partition_point(|&(s, _)| s < end);
        if first >= last {
            return None;
        }

        let mut out = TextRegion::new(&*buffer);
        for &(s, e) in &spans[first..last] {
            let sr = Subregion::create(buffer, s.max(start), e.min(end));
            out.subregions.push(sr);
        }
        tracing::trace!(
            region = self.id,
            start,
            end,
            count = out.subregions.len(),
            "region intersect"
        );
        Some(out)
    }

    /// Start and end offsets of the `index`-th subregion, resolved from the live marks.
    pub fn nth_subregion<B: MarkBuffer + ?Sized>(
        &self,
        buffer: &B,
        index: usize,
    ) -> Option<(usize, usize)> {
        self.check_buffer(buffer);
        let sr = self.subregions.get(index)?;
        Some(bounds(buffer, sr))
    }

    /// Returns `true` if `offset` lies inside some subregion.
    pub fn contains_offset<B: MarkBuffer + ?Sized>(&self, buffer: &B, offset: usize) -> bool {
        self.check_buffer(buffer);
        let idx = self
            .subregions
            .partition_point(|sr| mark_offset(buffer, sr.end) <= offset);
        self.subregions
            .get(idx)
            .is_some_and(|sr| mark_offset(buffer, sr.start) <= offset)
    }

    /// Iterate over `(start, end)` pairs in order.
    ///
    /// The iterator borrows the region, so the region cannot change while it is alive.
    pub fn subregions<'a, B: MarkBuffer + ?Sized>(&'a self, buffer: &'a B) -> Subregions<'a, B> {
        self.check_buffer(buffer);
        Subregions {
            region: self,
            buffer,
            index: 0,
        }
    }

    /// Cursor positioned at subregion `start_index`, or at the end if out of range.
    pub fn cursor(&self, start_index: usize) -> RegionCursor {
        RegionCursor {
            region: self.id,
            stamp: self.stamp,
            index: start_index.min(self.subregions.len()),
        }
    }

    /// Whether the cursor is past the last subregion.
    pub fn cursor_is_end(&self, cursor: &RegionCursor) -> Result<bool, RegionError> {
        self.check_cursor(cursor)?;
        Ok(cursor.index >= self.subregions.len())
    }

    /// Advance the cursor. Returns whether it now points at a subregion.
    ///
    /// A cursor already at the end stays there.
    pub fn cursor_next(&self, cursor: &mut RegionCursor) -> Result<bool, RegionError> {
        self.check_cursor(cursor)?;
        if cursor.index < self.subregions.len() {
            cursor.index += 1;
        }
        Ok(cursor.index < self.subregions.len())
    }

    /// Offsets of the subregion under the cursor.
    pub fn cursor_subregion<B: MarkBuffer + ?Sized>(
        &self,
        buffer: &B,
        cursor: &RegionCursor,
    ) -> Result<(usize, usize), RegionError> {
        self.check_cursor(cursor)?;
        self.check_buffer(buffer);
        let sr = self.subregions.get(cursor.index).ok_or(RegionError::AtEnd)?;
        Ok(bounds(buffer, sr))
    }

    /// Revalidate the list against buffer edits made since the last mutating call.
    ///
    /// Drops subregions whose text was deleted entirely and coalesces subregions that now
    /// touch or overlap. Cheap when the buffer has not changed. Returns `true` if the list
    /// changed, which invalidates outstanding cursors.
    pub fn normalize<B: MarkBuffer + ?Sized>(&mut self, buffer: &mut B) -> bool {
        self.check_buffer(buffer);
        let revision = buffer.revision();
        if revision == self.synced_revision {
            return false;
        }
        self.synced_revision = revision;

        let mut changed = false;
        let mut kept: Vec<Subregion> = Vec::with_capacity(self.subregions.len());
        let mut kept_end = 0usize;
        for sr in std::mem::take(&mut self.subregions) {
            let (start, end) = bounds(buffer, &sr);
            if start >= end {
                release(buffer, sr);
                changed = true;
                continue;
            }
            if let Some(prev) = kept.last_mut().filter(|_| start <= kept_end) {
                if end > kept_end {
                    delete_mark(buffer, prev.end);
                    delete_mark(buffer, sr.start);
                    prev.end = sr.end;
                    kept_end = end;
                } else {
                    release(buffer, sr);
                }
                changed = true;
                continue;
            }
            kept.push(sr);
            kept_end = end;
        }
        self.subregions = kept;

        if changed {
            self.stamp += 1;
            tracing::debug!(
                region = self.id,
                revision,
                count = self.subregions.len(),
                "region normalized after buffer edits"
            );
        }
        changed
    }

    /// Release the region.
    ///
    /// With `delete_marks` every mark is removed from the buffer first. Pass `false` only
    /// when the buffer itself is being torn down and its marks no longer matter.
    pub fn destroy<B: MarkBuffer + ?Sized>(self, buffer: &mut B, delete_marks: bool) {
        if !delete_marks {
            return;
        }
        self.check_buffer(buffer);
        for sr in self.subregions {
            release(buffer, sr);
        }
    }

    /// Human-readable dump, e.g. `"Subregions: 0-10 20-30"`.
    pub fn debug_string<B: MarkBuffer + ?Sized>(&self, buffer: &B) -> String {
        let mut out = String::from("Subregions:");
        for (start, end) in self.subregions(buffer) {
            out.push_str(&format!(" {start}-{end}"));
        }
        out
    }

    /// Emit [`TextRegion::debug_string`] as a `tracing` debug event.
    pub fn debug_print<B: MarkBuffer + ?Sized>(&self, buffer: &B) {
        tracing::debug!(region = self.id, "{}", self.debug_string(buffer));
    }

    fn spans<B: MarkBuffer + ?Sized>(&self, buffer: &B) -> Vec<(usize, usize)> {
        self.subregions.iter().map(|sr| bounds(buffer, sr)).collect()
    }

    fn clamp<B: MarkBuffer + ?Sized>(&self, buffer: &B, a: usize, b: usize) -> (usize, usize) {
        self.check_buffer(buffer);
        let len = buffer.char_count();
        let (a, b) = (a.min(len), b.min(len));
        if a <= b { (a, b) } else { (b, a) }
    }

    fn prune_empty<B: MarkBuffer + ?Sized>(&mut self, buffer: &mut B) {
        let before = self.subregions.len();
        let mut empty = Vec::new();
        self.subregions.retain(|sr| {
            let (start, end) = bounds(&*buffer, sr);
            if start == end {
                empty.push(*sr);
                false
            } else {
                true
            }
        });
        for sr in empty {
            release(buffer, sr);
        }
        if self.subregions.len() != before {
            self.stamp += 1;
        }
    }

    fn check_buffer<B: MarkBuffer + ?Sized>(&self, buffer: &B) {
        debug_assert_eq!(
            self.buffer,
            buffer.buffer_id(),
            "text region used with a buffer it was not created for"
        );
    }

    fn check_cursor(&self, cursor: &RegionCursor) -> Result<(), RegionError> {
        if cursor.region != self.id {
            return Err(RegionError::ForeignCursor);
        }
        if cursor.stamp != self.stamp {
            return Err(RegionError::StaleCursor {
                cursor_stamp: cursor.stamp,
                region_stamp: self.stamp,
            });
        }
        Ok(())
    }
}

/// Iterator over a region's `(start, end)` offsets, see [`TextRegion::subregions`].
#[derive(Debug)]
pub struct Subregions<'a, B: MarkBuffer + ?Sized> {
    region: &'a TextRegion,
    buffer: &'a B,
    index: usize,
}

impl<B: MarkBuffer + ?Sized> Iterator for Subregions<'_, B> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let sr = self.region.subregions.get(self.index)?;
        self.index += 1;
        Some(bounds(self.buffer, sr))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.region.subregions.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<B: MarkBuffer + ?Sized> ExactSizeIterator for Subregions<'_, B> {}

// A region's marks are only ever touched through the region, so a buffer that no longer
// knows one of them means the bookkeeping is broken.

fn mark_offset<B: MarkBuffer + ?Sized>(buffer: &B, mark: MarkId) -> usize {
    buffer
        .mark_offset(mark)
        .unwrap_or_else(|| panic!("text region mark {mark:?} is unknown to its buffer"))
}

fn bounds<B: MarkBuffer + ?Sized>(buffer: &B, sr: &Subregion) -> (usize, usize) {
    (mark_offset(buffer, sr.start), mark_offset(buffer, sr.end))
}

fn move_mark<B: MarkBuffer + ?Sized>(buffer: &mut B, mark: MarkId, offset: usize) {
    if !buffer.move_mark(mark, offset) {
        panic!("text region mark {mark:?} is unknown to its buffer");
    }
}

fn delete_mark<B: MarkBuffer + ?Sized>(buffer: &mut B, mark: MarkId) {
    if !buffer.delete_mark(mark) {
        panic!("text region mark {mark:?} is unknown to its buffer");
    }
}

fn release<B: MarkBuffer + ?Sized>(buffer: &mut B, sr: Subregion) {
    delete_mark(buffer, sr.start);
    delete_mark(buffer, sr.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;

    fn buffer_of_len(len: usize) -> TextBuffer {
        TextBuffer::from_text(&"x".repeat(len))
    }

    fn collect(region: &TextRegion, buffer: &TextBuffer) -> Vec<(usize, usize)> {
        region.subregions(buffer).collect()
    }

    #[test]
    fn test_add_into_empty_region() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        assert!(region.is_empty());

        region.add(&mut buffer, 0, 10);

        assert_eq!(region.subregion_count(), 1);
        assert_eq!(region.nth_subregion(&buffer, 0), Some((0, 10)));
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_add_keeps_sorted_order() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 20, 25);
        region.add(&mut buffer, 0, 5);
        region.add(&mut buffer, 10, 15);
        region.add(&mut buffer, 30, 35);

        assert_eq!(
            collect(&region, &buffer),
            vec![(0, 5), (10, 15), (20, 25), (30, 35)]
        );
    }

    #[test]
    fn test_add_reversed_and_empty_ranges() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 10, 3);
        region.add(&mut buffer, 20, 20);

        assert_eq!(collect(&region, &buffer), vec![(3, 10)]);
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_add_clamps_to_buffer_length() {
        let mut buffer = buffer_of_len(10);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 5, 100);
        region.add(&mut buffer, 50, 60);

        assert_eq!(collect(&region, &buffer), vec![(5, 10)]);
    }

    #[test]
    fn test_add_merge_reuses_outer_marks() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        region.add(&mut buffer, 10, 15);
        region.add(&mut buffer, 20, 25);
        let first_start = region.subregion_marks()[0].start_mark();
        let last_end = region.subregion_marks()[2].end_mark();

        region.add(&mut buffer, 3, 22);

        assert_eq!(collect(&region, &buffer), vec![(0, 25)]);
        assert_eq!(region.subregion_marks()[0].start_mark(), first_start);
        assert_eq!(region.subregion_marks()[0].end_mark(), last_end);
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_add_extends_existing_subregion() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 10, 20);
        region.add(&mut buffer, 5, 12);
        region.add(&mut buffer, 18, 30);
        region.add(&mut buffer, 12, 14);

        assert_eq!(collect(&region, &buffer), vec![(5, 30)]);
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_subtract_prefix_and_suffix_move_marks() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 10, 20);
        let marks = region.subregion_marks()[0];

        region.subtract(&mut buffer, 5, 12);
        region.subtract(&mut buffer, 18, 25);

        assert_eq!(collect(&region, &buffer), vec![(12, 18)]);
        assert_eq!(region.subregion_marks()[0], marks);
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_subtract_split_allocates_one_pair() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 10);
        let original = region.subregion_marks()[0];

        region.subtract(&mut buffer, 3, 6);

        assert_eq!(collect(&region, &buffer), vec![(0, 3), (6, 10)]);
        assert_eq!(buffer.mark_count(), 4);
        assert_eq!(region.subregion_marks()[0].start_mark(), original.start_mark());
        assert_eq!(region.subregion_marks()[1].end_mark(), original.end_mark());
        let [head, tail] = region.subregion_marks() else {
            panic!("expected two subregions");
        };
        assert_eq!(buffer.mark_gravity(head.end_mark()), Some(Gravity::Right));
        assert_eq!(buffer.mark_gravity(tail.start_mark()), Some(Gravity::Left));
    }

    #[test]
    fn test_subtract_across_several_subregions() {
        let mut buffer = buffer_of_len(50);
        let mut region = TextRegion::new(&buffer);
        for start in [0, 10, 20, 30, 40] {
            region.add(&mut buffer, start, start + 5);
        }

        region.subtract(&mut buffer, 12, 33);

        assert_eq!(
            collect(&region, &buffer),
            vec![(0, 5), (10, 12), (33, 35), (40, 45)]
        );
        assert_eq!(buffer.mark_count(), 8);
    }

    #[test]
    fn test_subtract_exact_and_touching_ranges() {
        let mut buffer = buffer_of_len(40);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 10, 20);

        // Ranges that only touch the subregion remove nothing.
        region.subtract(&mut buffer, 0, 10);
        region.subtract(&mut buffer, 20, 30);
        assert_eq!(collect(&region, &buffer), vec![(10, 20)]);

        region.subtract(&mut buffer, 10, 20);
        assert!(region.is_empty());
        assert_eq!(buffer.mark_count(), 0);
    }

    #[test]
    fn test_subtract_on_empty_region_is_noop() {
        let mut buffer = buffer_of_len(10);
        let mut region = TextRegion::new(&buffer);
        let cursor = region.cursor(0);
        region.subtract(&mut buffer, 0, 10);
        assert!(region.is_empty());
        assert_eq!(region.cursor_is_end(&cursor), Ok(true));
    }

    #[test]
    fn test_intersect() {
        let mut buffer = buffer_of_len(50);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 10);
        region.add(&mut buffer, 20, 30);
        region.add(&mut buffer, 40, 50);

        let inner = region.intersect(&mut buffer, 5, 45).unwrap();
        assert_eq!(collect(&inner, &buffer), vec![(5, 10), (20, 30), (40, 45)]);
        assert_eq!(buffer.mark_count(), 12);

        let single = region.intersect(&mut buffer, 22, 28).unwrap();
        assert_eq!(collect(&single, &buffer), vec![(22, 28)]);

        assert!(region.intersect(&mut buffer, 10, 20).is_none());
        assert!(region.intersect(&mut buffer, 25, 25).is_none());

        // Source is untouched.
        assert_eq!(collect(&region, &buffer), vec![(0, 10), (20, 30), (40, 50)]);
    }

    #[test]
    fn test_nth_subregion_out_of_bounds() {
        let mut buffer = buffer_of_len(10);
        let mut region = TextRegion::new(&buffer);
        assert_eq!(region.nth_subregion(&buffer, 0), None);
        region.add(&mut buffer, 1, 2);
        assert_eq!(region.nth_subregion(&buffer, 1), None);
    }

    #[test]
    fn test_contains_offset() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 5, 10);
        region.add(&mut buffer, 20, 25);

        assert!(!region.contains_offset(&buffer, 4));
        assert!(region.contains_offset(&buffer, 5));
        assert!(region.contains_offset(&buffer, 9));
        assert!(!region.contains_offset(&buffer, 10));
        assert!(region.contains_offset(&buffer, 24));
        assert!(!region.contains_offset(&buffer, 25));
    }

    #[test]
    fn test_cursor_walk() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        region.add(&mut buffer, 10, 15);

        let mut cursor = region.cursor(0);
        assert_eq!(region.cursor_is_end(&cursor), Ok(false));
        assert_eq!(region.cursor_subregion(&buffer, &cursor), Ok((0, 5)));
        assert_eq!(region.cursor_next(&mut cursor), Ok(true));
        assert_eq!(region.cursor_subregion(&buffer, &cursor), Ok((10, 15)));
        assert_eq!(region.cursor_next(&mut cursor), Ok(false));
        assert_eq!(region.cursor_is_end(&cursor), Ok(true));
        assert_eq!(region.cursor_subregion(&buffer, &cursor), Err(RegionError::AtEnd));
        assert_eq!(region.cursor_next(&mut cursor), Ok(false));

        let late = region.cursor(7);
        assert_eq!(late.index(), 2);
        assert_eq!(region.cursor_is_end(&late), Ok(true));
    }

    #[test]
    fn test_cursor_is_invalidated_by_mutation() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        let mut cursor = region.cursor(0);

        region.add(&mut buffer, 10, 15);

        assert!(matches!(
            region.cursor_is_end(&cursor),
            Err(RegionError::StaleCursor { .. })
        ));
        assert!(matches!(
            region.cursor_next(&mut cursor),
            Err(RegionError::StaleCursor { .. })
        ));

        let other = TextRegion::new(&buffer);
        assert_eq!(other.cursor_is_end(&region.cursor(0)), Err(RegionError::ForeignCursor));
    }

    #[test]
    fn test_noop_calls_keep_cursors_valid() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        let cursor = region.cursor(0);

        region.add(&mut buffer, 3, 3);
        region.subtract(&mut buffer, 20, 25);

        assert_eq!(region.cursor_is_end(&cursor), Ok(false));
    }

    #[test]
    fn test_normalize_after_buffer_edits() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        region.add(&mut buffer, 10, 15);
        region.add(&mut buffer, 20, 25);

        // Delete the whole middle subregion and the gap on both sides.
        buffer.delete(5..20);
        assert_eq!(region.subregion_count(), 3);

        assert!(region.normalize(&mut buffer));
        assert_eq!(collect(&region, &buffer), vec![(0, 10)]);
        assert_eq!(buffer.mark_count(), 2);
        assert!(!region.normalize(&mut buffer));
    }

    #[test]
    fn test_destroy_releases_marks() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        region.add(&mut buffer, 0, 5);
        region.add(&mut buffer, 10, 15);
        region.destroy(&mut buffer, true);
        assert_eq!(buffer.mark_count(), 0);

        let mut kept = TextRegion::new(&buffer);
        kept.add(&mut buffer, 0, 5);
        kept.destroy(&mut buffer, false);
        assert_eq!(buffer.mark_count(), 2);
    }

    #[test]
    fn test_debug_string() {
        let mut buffer = buffer_of_len(30);
        let mut region = TextRegion::new(&buffer);
        assert_eq!(region.debug_string(&buffer), "Subregions:");
        region.add(&mut buffer, 0, 10);
        region.add(&mut buffer, 20, 30);
        assert_eq!(region.debug_string(&buffer), "Subregions: 0-10 20-30");
        region.debug_print(&buffer);
    }
}
