//! Editable text buffer with position marks.
//!
//! A mark is a buffer-owned handle to a character offset that follows the text as it is
//! edited. Regions never look inside the buffer; they only create, query, move and delete
//! marks through the [`MarkBuffer`] trait, so the buffer is the sole owner of mark storage
//! and a region is just a holder of [`MarkId`]s.
//!
//! [`TextBuffer`] is the in-memory implementation: a [`ropey::Rope`] for the characters and
//! a generational arena for the marks.

use ropey::Rope;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Which side of an insertion a mark ends up on.
///
/// Only matters when text is inserted exactly at the mark's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gravity {
    /// The mark stays before the inserted text.
    Left,
    /// The mark moves after the inserted text.
    Right,
}

/// Handle to a mark owned by a buffer.
///
/// The generation makes handles to deleted marks detectable even after their slot has
/// been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkId {
    index: u32,
    generation: u32,
}

impl MarkId {
    /// Arena slot of this mark.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the mark was created.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// The mark-management surface a [`crate::TextRegion`] needs from its buffer.
///
/// Offsets are character offsets; implementations clamp out-of-range offsets to the
/// buffer length.
pub trait MarkBuffer {
    /// Identity of this buffer.
    fn buffer_id(&self) -> BufferId;

    /// Counter bumped on every text mutation.
    fn revision(&self) -> u64;

    /// Length of the buffer in characters.
    fn char_count(&self) -> usize;

    /// Create a mark at `offset`.
    fn create_mark(&mut self, offset: usize, gravity: Gravity) -> MarkId;

    /// Current offset of a mark, or `None` if the mark does not exist.
    fn mark_offset(&self, mark: MarkId) -> Option<usize>;

    /// Move an existing mark. Returns `false` if the mark does not exist.
    fn move_mark(&mut self, mark: MarkId, offset: usize) -> bool;

    /// Delete a mark. Returns `false` if the mark does not exist.
    fn delete_mark(&mut self, mark: MarkId) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    offset: usize,
    gravity: Gravity,
}

#[derive(Debug, Clone)]
struct MarkSlot {
    generation: u32,
    mark: Option<Mark>,
}

/// Rope-backed text buffer with a mark arena.
#[derive(Debug)]
pub struct TextBuffer {
    id: BufferId,
    rope: Rope,
    slots: Vec<MarkSlot>,
    free: Vec<u32>,
    live_marks: usize,
    revision: u64,
    modified: bool,
}

impl TextBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a buffer holding `text` verbatim (line endings are not normalized).
    pub fn from_text(text: &str) -> Self {
        Self {
            id: BufferId::next(),
            rope: Rope::from_str(text),
            slots: Vec::new(),
            free: Vec::new(),
            live_marks: 0,
            revision: 0,
            modified: false,
        }
    }

    /// Identity of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Underlying rope.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Full buffer contents.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text in `range` (character offsets, clamped to the buffer).
    pub fn slice(&self, range: Range<usize>) -> String {
        let (start, end) = self.clamp_range(range.start, range.end);
        self.rope.slice(start..end).to_string()
    }

    /// Number of characters.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Number of lines (N line breaks => N+1 lines).
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// Contents of a line without its terminator.
    pub fn line(&self, line_index: usize) -> Option<String> {
        if line_index >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line_index).to_string();
        let terminator_len = crate::line_ending::trailing_terminator(&text).len();
        text.truncate(text.len() - terminator_len);
        Some(text)
    }

    /// Character offset of the first character of a line (clamped to the last line).
    pub fn line_to_char(&self, line_index: usize) -> usize {
        let line_index = line_index.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_char(line_index)
    }

    /// Line containing a character offset (clamped to the buffer).
    pub fn char_to_line(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.char_count()))
    }

    /// Insert `text` at a character offset, moving marks according to their gravity.
    pub fn insert(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.char_count());
        let len = text.chars().count();
        if len == 0 {
            return;
        }

        self.rope.insert(offset, text);
        for mark in self.slots.iter_mut().filter_map(|slot| slot.mark.as_mut()) {
            if mark.offset > offset || (mark.offset == offset && mark.gravity == Gravity::Right) {
                mark.offset += len;
            }
        }
        self.touch();
        tracing::trace!(offset, len, revision = self.revision, "buffer insert");
    }

    /// Delete the characters in `range`; marks inside it collapse to its start.
    ///
    /// Reversed ranges are accepted.
    pub fn delete(&mut self, range: Range<usize>) {
        let (start, end) = self.clamp_range(range.start, range.end);
        if start == end {
            return;
        }

        self.rope.remove(start..end);
        let len = end - start;
        for mark in self.slots.iter_mut().filter_map(|slot| slot.mark.as_mut()) {
            if mark.offset >= end {
                mark.offset -= len;
            } else if mark.offset > start {
                mark.offset = start;
            }
        }
        self.touch();
        tracing::trace!(start, end, revision = self.revision, "buffer delete");
    }

    /// Replace the whole contents. Every mark collapses to offset 0.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        for mark in self.slots.iter_mut().filter_map(|slot| slot.mark.as_mut()) {
            mark.offset = 0;
        }
        self.touch();
    }

    /// Whether the buffer was edited since the flag was last cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set or clear the modified flag.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Number of live marks.
    pub fn mark_count(&self) -> usize {
        self.live_marks
    }

    /// Gravity of a live mark.
    pub fn mark_gravity(&self, mark: MarkId) -> Option<Gravity> {
        self.slot(mark).map(|m| m.gravity)
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.modified = true;
    }

    fn clamp_range(&self, a: usize, b: usize) -> (usize, usize) {
        let len = self.char_count();
        let (a, b) = (a.min(len), b.min(len));
        if a <= b { (a, b) } else { (b, a) }
    }

    fn slot(&self, mark: MarkId) -> Option<&Mark> {
        self.slots
            .get(mark.index as usize)
            .filter(|slot| slot.generation == mark.generation)
            .and_then(|slot| slot.mark.as_ref())
    }

    fn slot_mut(&mut self, mark: MarkId) -> Option<&mut Mark> {
        self.slots
            .get_mut(mark.index as usize)
            .filter(|slot| slot.generation == mark.generation)
            .and_then(|slot| slot.mark.as_mut())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkBuffer for TextBuffer {
    fn buffer_id(&self) -> BufferId {
        self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    fn create_mark(&mut self, offset: usize, gravity: Gravity) -> MarkId {
        let mark = Mark {
            offset: offset.min(self.char_count()),
            gravity,
        };
        self.live_marks += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.mark = Some(mark);
            return MarkId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("mark arena exhausted");
        });
        self.slots.push(MarkSlot {
            generation: 0,
            mark: Some(mark),
        });
        MarkId {
            index,
            generation: 0,
        }
    }

    fn mark_offset(&self, mark: MarkId) -> Option<usize> {
        self.slot(mark).map(|m| m.offset)
    }

    fn move_mark(&mut self, mark: MarkId, offset: usize) -> bool {
        let offset = offset.min(self.char_count());
        match self.slot_mut(mark) {
            Some(m) => {
                m.offset = offset;
                true
            }
            None => false,
        }
    }

    fn delete_mark(&mut self, mark: MarkId) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(mark.index as usize)
            .filter(|slot| slot.generation == mark.generation && slot.mark.is_some())
        else {
            return false;
        };

        slot.mark = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(mark.index);
        self.live_marks -= 1;
        true
    }
}
