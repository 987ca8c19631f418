//! Line ending helpers.
//!
//! [`crate::TextBuffer`] stores text exactly as written, so a document may carry any of the
//! three classic newline conventions. The document streams use [`LineEnding`] to detect the
//! convention of loaded text and to rewrite terminators when the buffer is read back out.

use ropey::Rope;

/// A newline convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Classic Mac-style CR (`'\r'`).
    Cr,
    /// Windows-style CRLF (`"\r\n"`).
    CrLf,
}

impl LineEnding {
    /// The terminator sequence for this convention.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }

    /// Byte length of the terminator sequence.
    pub const fn len(self) -> usize {
        self.as_str().len()
    }

    /// Always `false`; present for symmetry with [`LineEnding::len`].
    pub const fn is_empty(self) -> bool {
        false
    }

    /// Detect the convention used by a source text.
    ///
    /// Policy: the terminator of the first line decides. Text without any `'\r'` / `'\n'`
    /// terminator reports the default ([`LineEnding::Lf`]).
    pub fn detect_in_text(text: &str) -> Self {
        match text.find(['\r', '\n']) {
            Some(idx) if text.as_bytes()[idx] == b'\r' => {
                if text.as_bytes().get(idx + 1) == Some(&b'\n') {
                    Self::CrLf
                } else {
                    Self::Cr
                }
            }
            _ => Self::Lf,
        }
    }
}

/// Returns `true` for characters that end a line on their own.
///
/// LF, CR and the paragraph separator (U+2029). Other Unicode separators such as form feed,
/// vertical tab, NEL and U+2028 are ordinary text. The buffer's rope is built with
/// `ropey`'s `cr_lines` feature so its line indexing agrees on LF, CR and CRLF.
pub fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2029}')
}

/// Returns the line terminator at the end of `line`, or `""` if it has none.
///
/// CRLF is treated as a single terminator.
pub fn trailing_terminator(line: &str) -> &str {
    if line.ends_with("\r\n") {
        return &line[line.len() - 2..];
    }
    match line.chars().next_back() {
        Some(ch) if is_line_break(ch) => &line[line.len() - ch.len_utf8()..],
        _ => "",
    }
}

/// Content of the line starting at char `offset` and the terminator that ends it.
///
/// The terminator is `""` for the last line. `offset` need not be at a line start; the
/// remainder of the line is returned.
pub(crate) fn line_at(rope: &Rope, offset: usize) -> (String, &'static str) {
    let mut content = String::new();
    let mut chars = rope.chars_at(offset.min(rope.len_chars())).peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => return (content, "\n"),
            '\u{2029}' => return (content, "\u{2029}"),
            '\r' if chars.peek() == Some(&'\n') => return (content, "\r\n"),
            '\r' => return (content, "\r"),
            _ => content.push(ch),
        }
    }
    (content, "")
}
