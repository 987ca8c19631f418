//! Error types.
//!
//! Ordinary negative results (an index past the end, an empty intersection) are reported as
//! `Option::None` by the APIs that produce them. The enums here cover contract violations
//! that are still recoverable for the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by [`crate::TextRegion`] cursor operations.
pub enum RegionError {
    #[error(
        "stale region cursor: created at stamp {cursor_stamp}, region is now at stamp {region_stamp}"
    )]
    /// The region was structurally modified after the cursor was obtained.
    StaleCursor {
        /// Modification stamp recorded when the cursor was created.
        cursor_stamp: u64,
        /// Current modification stamp of the region.
        region_stamp: u64,
    },

    #[error("cursor belongs to a different region")]
    /// The cursor was obtained from another region.
    ForeignCursor,

    #[error("cursor is at the end of the region")]
    /// The cursor does not point at a subregion.
    AtEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors produced by the document streams.
pub enum StreamError {
    #[error("invalid {encoding} sequence in input at byte {offset}")]
    /// A chunk contained bytes that can never be decoded in the stream's encoding.
    InvalidSequence {
        /// Name of the encoding the input was decoded with.
        encoding: &'static str,
        /// Byte offset of the invalid sequence, counted from the start of the stream.
        offset: usize,
    },

    #[error("incomplete {encoding} sequence at end of input ({pending} bytes pending)")]
    /// The stream was closed while a partial character was still buffered.
    IncompleteSequence {
        /// Name of the encoding the input was decoded with.
        encoding: &'static str,
        /// Number of bytes held back waiting for the rest of the character.
        pending: usize,
    },

    #[error("could not detect the encoding of the input ({candidates} candidates tried)")]
    /// None of the candidate encodings could decode the first chunk.
    EncodingNotDetected {
        /// Number of candidate encodings that were tried.
        candidates: usize,
    },

    #[error("stream failed on an earlier write")]
    /// A previous write failed; the stream accepts no more data.
    Failed,

    #[error("not enough space in destination: {available} bytes, at least {required} needed")]
    /// A read was issued with a destination buffer that cannot hold a full character.
    NoSpace {
        /// Size of the destination buffer.
        available: usize,
        /// Minimum accepted destination size.
        required: usize,
    },

    #[error("stream is closed")]
    /// The stream was already closed.
    Closed,
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match err {
            StreamError::InvalidSequence { .. }
            | StreamError::IncompleteSequence { .. }
            | StreamError::EncodingNotDetected { .. } => std::io::ErrorKind::InvalidData,
            StreamError::NoSpace { .. } => std::io::ErrorKind::InvalidInput,
            StreamError::Failed | StreamError::Closed => std::io::ErrorKind::BrokenPipe,
        };
        std::io::Error::new(kind, err)
    }
}
