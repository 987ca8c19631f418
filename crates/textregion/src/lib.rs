#![warn(missing_docs)]
//! textregion - Mark-Anchored Text Regions for Headless Editors
//!
//! # Overview
//!
//! `textregion` tracks which spans of an editable document need attention (text to
//! re-highlight, re-scan, re-check) while the document keeps changing underneath. A
//! [`TextRegion`] is a set of disjoint ranges whose endpoints are buffer marks, so the
//! ranges move with the text instead of going stale as offsets.
//!
//! # Core Features
//!
//! - **Coalescing Region Set**: `add` merges overlapping and touching spans, `subtract`
//!   truncates and splits, `intersect` clips into a new region
//! - **Gravity-Aware Marks**: start marks stay left of insertions, end marks move right,
//!   so growth at either boundary stays inside the region
//! - **Cursor Invalidation**: cursors carry a modification stamp and report staleness
//!   instead of reading freed state
//! - **Document Streams**: chunked loading with encoding guessing and newline detection,
//!   and saving with newline conversion
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document Streams (load / save bytes)       │  ← I/O adapters
//! ├─────────────────────────────────────────────┤
//! │  TextRegion (add / subtract / intersect)    │  ← Region engine
//! ├─────────────────────────────────────────────┤
//! │  MarkBuffer (create / query / move / drop)  │  ← Mark contract
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer (Rope + mark arena)             │  ← Text storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use textregion::{TextBuffer, TextRegion};
//!
//! let mut buffer = TextBuffer::from_text("fn main() {\n    println!(\"hi\");\n}\n");
//! let mut dirty = TextRegion::new(&buffer);
//!
//! dirty.add(&mut buffer, 0, 10);
//! dirty.add(&mut buffer, 20, 30);
//! dirty.add(&mut buffer, 10, 20);
//! assert_eq!(dirty.subregion_count(), 1);
//! assert_eq!(dirty.nth_subregion(&buffer, 0), Some((0, 30)));
//!
//! // Typing at the end of the span grows it.
//! buffer.insert(30, "xx");
//! assert_eq!(dirty.nth_subregion(&buffer, 0), Some((0, 32)));
//!
//! dirty.subtract(&mut buffer, 5, 10);
//! let spans: Vec<_> = dirty.subregions(&buffer).collect();
//! assert_eq!(spans, vec![(0, 5), (10, 32)]);
//!
//! dirty.destroy(&mut buffer, true);
//! assert_eq!(buffer.mark_count(), 0);
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - `MarkBuffer` contract and the rope-backed `TextBuffer`
//! - [`region`] - `TextRegion`, its cursor and iterator
//! - [`line_ending`] - newline conventions
//! - [`stream`] - document output/input streams
//! - [`error`] - error types
//!
//! # Threading
//!
//! Everything is synchronous and unsynchronized. A region and its buffer must be used from
//! one thread at a time; wrap both in the same lock if they are shared.

pub mod buffer;
pub mod error;
pub mod line_ending;
pub mod region;
pub mod stream;

pub use encoding_rs;

pub use buffer::{BufferId, Gravity, MarkBuffer, MarkId, TextBuffer};
pub use error::{RegionError, StreamError};
pub use line_ending::LineEnding;
pub use region::{RegionCursor, Subregion, Subregions, TextRegion};
pub use stream::{
    DocumentInputStream, DocumentOutputStream, InputStreamOptions, MIN_READ_SIZE,
    OutputStreamOptions,
};
