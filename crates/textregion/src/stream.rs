//! Byte streams into and out of a [`TextBuffer`].
//!
//! [`DocumentOutputStream`] loads a document: bytes arrive in arbitrary chunks, are decoded
//! from a guessed encoding (`encoding_rs`) across chunk boundaries and appended to the
//! buffer. On close the single trailing line terminator is removed, since an editor shows
//! it as an extra empty line.
//!
//! [`DocumentInputStream`] saves a document: it walks the buffer line by line, rewrites
//! every terminator to the requested [`LineEnding`], and terminates non-empty documents
//! with one final newline (the one stripped on load).
//!
//! Both streams are synchronous wrappers around the buffer and perform no I/O themselves.

use crate::buffer::{Gravity, MarkBuffer, MarkId, TextBuffer};
use crate::error::StreamError;
use crate::line_ending::{LineEnding, is_line_break, line_at};
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use std::{fmt, io};

/// Smallest destination accepted by [`DocumentInputStream::read_into`].
pub const MIN_READ_SIZE: usize = 6;

/// Options for [`DocumentOutputStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputStreamOptions {
    /// Remove one trailing line terminator when the stream is closed.
    pub strip_trailing_newline: bool,
    /// Candidate encodings, tried in order on the first chunk. An empty list means UTF-8.
    pub encodings: Vec<&'static Encoding>,
    /// Replace malformed sequences with U+FFFD instead of failing the write.
    pub replace_invalid: bool,
}

impl Default for OutputStreamOptions {
    fn default() -> Self {
        Self {
            strip_trailing_newline: true,
            encodings: vec![UTF_8],
            replace_invalid: false,
        }
    }
}

/// Options for [`DocumentInputStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStreamOptions {
    /// Terminator written for every line break.
    pub line_ending: LineEnding,
    /// Append one terminator after the last line of a non-empty buffer.
    pub ensure_trailing_newline: bool,
}

impl Default for InputStreamOptions {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::default(),
            ensure_trailing_newline: true,
        }
    }
}

/// Writes encoded bytes into a buffer.
///
/// Creating the stream clears the buffer. The first non-empty chunk picks the encoding
/// from [`OutputStreamOptions::encodings`]; every chunk is then decoded incrementally, so a
/// character may be split across writes. Text is inserted at an internal mark, so edits
/// made to the buffer through other handles between writes do not scramble the order.
///
/// A failed write leaves the stream failed: later writes return [`StreamError::Failed`].
pub struct DocumentOutputStream<'a> {
    buffer: &'a mut TextBuffer,
    options: OutputStreamOptions,
    insert_mark: Option<MarkId>,
    /// Set once the encoding has been picked.
    decoder: Option<Decoder>,
    encoding: Option<&'static Encoding>,
    /// Bytes accepted so far, for error offsets.
    position: usize,
    fallbacks: usize,
    state: OutputState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputState {
    Open,
    Failed,
    Closed,
}

impl<'a> DocumentOutputStream<'a> {
    /// Create a stream with default options.
    pub fn new(buffer: &'a mut TextBuffer) -> Self {
        Self::with_options(buffer, OutputStreamOptions::default())
    }

    /// Create a stream with explicit options.
    pub fn with_options(buffer: &'a mut TextBuffer, options: OutputStreamOptions) -> Self {
        buffer.set_text("");
        buffer.set_modified(false);
        Self {
            buffer,
            options,
            insert_mark: None,
            decoder: None,
            encoding: None,
            position: 0,
            fallbacks: 0,
            state: OutputState::Open,
        }
    }

    /// Append a chunk of bytes.
    ///
    /// An incomplete character at the end of the chunk is held back until the next write.
    /// Returns the full chunk length on success.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        match self.state {
            OutputState::Closed => return Err(StreamError::Closed),
            OutputState::Failed => return Err(StreamError::Failed),
            OutputState::Open => {}
        }
        if data.is_empty() {
            return Ok(0);
        }

        let result = self.decode_chunk(data);
        if result.is_err() {
            self.state = OutputState::Failed;
        }
        result
    }

    /// Encoding the input is being decoded with.
    ///
    /// UTF-8 before anything has been written, `None` if no candidate could decode the
    /// first chunk.
    pub fn guessed_encoding(&self) -> Option<&'static Encoding> {
        match (self.encoding, self.state) {
            (Some(encoding), _) => Some(encoding),
            (None, OutputState::Failed) => None,
            (None, _) => Some(UTF_8),
        }
    }

    /// Number of malformed sequences replaced with U+FFFD.
    ///
    /// Always 0 unless [`OutputStreamOptions::replace_invalid`] is set.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    /// Newline convention of the text written so far, judged by its first line.
    pub fn detect_line_ending(&self) -> LineEnding {
        let (_, terminator) = line_at(self.buffer.rope(), 0);
        LineEnding::detect_in_text(terminator)
    }

    /// Finish loading.
    ///
    /// The first call flushes the decoder, strips the trailing terminator (per options),
    /// clears the buffer's modified flag and releases the insertion mark. Fails if a
    /// partial character is still pending.
    pub fn close(&mut self) -> Result<(), StreamError> {
        if self.state == OutputState::Closed {
            return Ok(());
        }

        let tail = match self.state {
            OutputState::Open => self.decode(&[], true),
            _ => Ok(String::new()),
        };
        if let Ok(text) = &tail {
            self.insert_text(text);
        }

        if let Some(mark) = self.insert_mark.take() {
            if self.options.strip_trailing_newline {
                strip_trailing_terminator(self.buffer);
            }
            self.buffer.delete_mark(mark);
        }
        self.buffer.set_modified(false);
        self.state = OutputState::Closed;
        tracing::debug!(
            chars = self.buffer.char_count(),
            encoding = self.encoding.map(Encoding::name),
            fallbacks = self.fallbacks,
            "document stream closed"
        );

        tail.map(|_| ())
    }

    fn decode_chunk(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        if self.decoder.is_none() {
            let encoding = self.guess_encoding(data)?;
            tracing::debug!(encoding = encoding.name(), "document stream encoding selected");
            self.encoding = Some(encoding);
            self.decoder = Some(encoding.new_decoder_without_bom_handling());
        }

        let text = self.decode(data, false)?;
        self.position += data.len();
        self.insert_text(&text);
        tracing::trace!(bytes = data.len(), decoded = text.len(), "document stream write");
        Ok(data.len())
    }

    /// Pick the first candidate that decodes `data` cleanly. A single candidate is used
    /// without trying it.
    fn guess_encoding(&self, data: &[u8]) -> Result<&'static Encoding, StreamError> {
        let fallback = [UTF_8];
        let candidates = if self.options.encodings.is_empty() {
            &fallback[..]
        } else {
            &self.options.encodings[..]
        };

        if let [only] = candidates {
            return Ok(*only);
        }
        for &encoding in candidates {
            tracing::trace!(encoding = encoding.name(), "trying candidate encoding");
            if decodes_cleanly(encoding, data) {
                return Ok(encoding);
            }
        }

        tracing::debug!(candidates = candidates.len(), "encoding detection failed");
        Err(StreamError::EncodingNotDetected {
            candidates: candidates.len(),
        })
    }

    fn decode(&mut self, data: &[u8], last: bool) -> Result<String, StreamError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(String::new());
        };
        let encoding = decoder.encoding().name();

        let mut text = String::with_capacity(utf8_capacity(decoder, data.len()));
        let mut consumed = 0;
        loop {
            let (result, read) =
                decoder.decode_to_string_without_replacement(&data[consumed..], &mut text, last);
            consumed += read;
            match result {
                DecoderResult::InputEmpty => return Ok(text),
                DecoderResult::OutputFull => {
                    text.reserve(utf8_capacity(decoder, data.len() - consumed));
                }
                DecoderResult::Malformed(bad, extra) => {
                    if self.options.replace_invalid {
                        text.push(char::REPLACEMENT_CHARACTER);
                        self.fallbacks += 1;
                        continue;
                    }
                    let bad = usize::from(bad);
                    if last && data.is_empty() {
                        return Err(StreamError::IncompleteSequence {
                            encoding,
                            pending: bad,
                        });
                    }
                    let offset = (self.position + consumed).saturating_sub(bad + usize::from(extra));
                    tracing::debug!(encoding, offset, "malformed input in document stream");
                    return Err(StreamError::InvalidSequence { encoding, offset });
                }
            }
        }
    }

    fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mark = match self.insert_mark {
            Some(mark) => mark,
            None => {
                let at = self.buffer.char_count();
                let mark = self.buffer.create_mark(at, Gravity::Right);
                self.insert_mark = Some(mark);
                mark
            }
        };
        let at = self
            .buffer
            .mark_offset(mark)
            .unwrap_or_else(|| self.buffer.char_count());
        self.buffer.insert(at, text);
    }
}

impl fmt::Debug for DocumentOutputStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOutputStream")
            .field("options", &self.options)
            .field("insert_mark", &self.insert_mark)
            .field("encoding", &self.encoding)
            .field("position", &self.position)
            .field("fallbacks", &self.fallbacks)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl io::Write for DocumentOutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_chunk(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for DocumentOutputStream<'_> {
    fn drop(&mut self) {
        if let Some(mark) = self.insert_mark.take() {
            self.buffer.delete_mark(mark);
        }
    }
}

fn utf8_capacity(decoder: &Decoder, byte_len: usize) -> usize {
    decoder
        .max_utf8_buffer_length_without_replacement(byte_len)
        .unwrap_or(byte_len.saturating_mul(3))
}

/// Whether `data` decodes without errors, a trailing partial character allowed.
fn decodes_cleanly(encoding: &'static Encoding, data: &[u8]) -> bool {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut scratch = String::with_capacity(utf8_capacity(&decoder, data.len()));
    let (result, _) = decoder.decode_to_string_without_replacement(data, &mut scratch, false);
    matches!(result, DecoderResult::InputEmpty)
}

fn strip_trailing_terminator(buffer: &mut TextBuffer) {
    let len = buffer.char_count();
    let rope = buffer.rope();
    let Some(last) = len.checked_sub(1).map(|idx| rope.char(idx)) else {
        return;
    };
    if !is_line_break(last) {
        return;
    }
    let start = if last == '\n' && len >= 2 && rope.char(len - 2) == '\r' {
        len - 2
    } else {
        len - 1
    };
    buffer.delete(start..len);
}

/// Reads a buffer back out as bytes.
#[derive(Debug)]
pub struct DocumentInputStream<'a> {
    buffer: &'a TextBuffer,
    options: InputStreamOptions,
    /// The last read stopped inside a line.
    split: bool,
    /// Characters consumed, terminators included.
    offset: usize,
    newline_added: bool,
    /// Bytes produced for a short `io::Read` destination that did not fit.
    spill: Vec<u8>,
    closed: bool,
}

impl<'a> DocumentInputStream<'a> {
    /// Create a stream writing `line_ending` terminators.
    pub fn new(buffer: &'a TextBuffer, line_ending: LineEnding) -> Self {
        Self::with_options(
            buffer,
            InputStreamOptions {
                line_ending,
                ..InputStreamOptions::default()
            },
        )
    }

    /// Create a stream with explicit options.
    pub fn with_options(buffer: &'a TextBuffer, options: InputStreamOptions) -> Self {
        Self {
            buffer,
            options,
            split: false,
            offset: 0,
            newline_added: false,
            spill: Vec::new(),
            closed: false,
        }
    }

    /// Size of the document in characters.
    pub fn total_size(&self) -> usize {
        self.buffer.char_count()
    }

    /// Characters consumed so far.
    pub fn tell(&self) -> usize {
        self.offset
    }

    /// Fill `out` with as many whole lines as fit, then a split line if needed.
    ///
    /// `out` must hold at least [`MIN_READ_SIZE`] bytes. Returns 0 at the end of the
    /// stream.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<usize, StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if out.len() < MIN_READ_SIZE {
            return Err(StreamError::NoSpace {
                available: out.len(),
                required: MIN_READ_SIZE,
            });
        }

        let mut read = 0;
        loop {
            let n = self.read_line(&mut out[read..]);
            read += n;
            if read == out.len() || n == 0 || self.split {
                break;
            }
        }

        if self.options.ensure_trailing_newline
            && !self.newline_added
            && self.at_end()
            && self.buffer.char_count() > 0
        {
            let newline = self.options.line_ending.as_str().as_bytes();
            if out.len() - read >= newline.len() {
                out[read..read + newline.len()].copy_from_slice(newline);
                read += newline.len();
                self.newline_added = true;
            }
        }

        tracing::trace!(read, offset = self.offset, "document stream read");
        Ok(read)
    }

    /// Stop reading. Later reads fail with [`StreamError::Closed`].
    pub fn close(&mut self) -> Result<(), StreamError> {
        self.newline_added = false;
        self.spill.clear();
        self.closed = true;
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.offset >= self.buffer.char_count()
    }

    fn read_line(&mut self, out: &mut [u8]) -> usize {
        if self.at_end() {
            return 0;
        }

        let (content, terminator) = line_at(self.buffer.rope(), self.offset);
        // Only the last line has no terminator, and it gets none written.
        let newline = if terminator.is_empty() {
            ""
        } else {
            self.options.line_ending.as_str()
        };
        let wanted = content.len() + newline.len();

        if wanted > out.len() {
            // Emit what fits, never splitting a character; the terminator goes out on a
            // later read.
            let mut cut = content.len().min(out.len());
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            out[..cut].copy_from_slice(&content.as_bytes()[..cut]);
            self.offset += content[..cut].chars().count();
            self.split = cut > 0;
            return cut;
        }

        out[..content.len()].copy_from_slice(content.as_bytes());
        out[content.len()..wanted].copy_from_slice(newline.as_bytes());
        self.offset += content.chars().count() + terminator.chars().count();
        self.split = false;
        wanted
    }
}

impl io::Read for DocumentInputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.spill.is_empty() {
            let n = self.spill.len().min(buf.len());
            buf[..n].copy_from_slice(&self.spill[..n]);
            self.spill.drain(..n);
            return Ok(n);
        }
        if buf.len() >= MIN_READ_SIZE {
            return Ok(self.read_into(buf)?);
        }

        let mut scratch = [0u8; MIN_READ_SIZE];
        let n = self.read_into(&mut scratch)?;
        let take = n.min(buf.len());
        buf[..take].copy_from_slice(&scratch[..take]);
        self.spill.extend_from_slice(&scratch[take..n]);
        Ok(take)
    }
}
