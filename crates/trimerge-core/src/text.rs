//! Line handling shared by the diff and merge layers.
//!
//! All positions in this crate are either line indices (0-based, half-open
//! ranges) or byte offsets into the base text. [`split_lines`] keeps line
//! terminators attached so that concatenating any run of lines reproduces
//! the exact source bytes.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Line terminator style of a text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    /// `\n`
    Unix,
    /// `\r\n`
    Windows,
    /// `\r`
    Mac,
}

impl LineEnding {
    /// The terminator string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "\n",
            Self::Windows => "\r\n",
            Self::Mac => "\r",
        }
    }

    /// Line ending of the platform this binary was built for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    /// Detect the line ending from the first terminator in `text`.
    ///
    /// Returns `None` for text without any line terminator.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let pos = bytes.iter().position(|&b| b == b'\n' || b == b'\r')?;
        if bytes[pos] == b'\n' {
            Some(Self::Unix)
        } else if bytes.get(pos + 1) == Some(&b'\n') {
            Some(Self::Windows)
        } else {
            Some(Self::Mac)
        }
    }

    /// Rewrite every `\r\n`, lone `\r` and lone `\n` in `text` to this ending.
    #[must_use]
    pub fn normalize(self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    out.push_str(self.as_str());
                }
                '\n' => out.push_str(self.as_str()),
                other => out.push(other),
            }
        }
        out
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Windows => write!(f, "windows"),
            Self::Mac => write!(f, "mac"),
        }
    }
}

/// Split `text` into lines, each keeping its terminator.
///
/// `\n`, `\r\n` and a lone `\r` all end a line. A trailing line without
/// terminator is included as-is. Empty text yields no lines.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    line_offsets(text)
        .windows(2)
        .map(|bounds| &text[bounds[0]..bounds[1]])
        .collect()
}

/// Byte offset of every line start in `text`, followed by `text.len()`.
///
/// The result always has `split_lines(text).len() + 1` entries, so the byte
/// range of line `i` is `offsets[i]..offsets[i + 1]`.
#[must_use]
pub fn line_offsets(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut offsets = Vec::with_capacity(text.len() / 32 + 2);
    offsets.push(0);
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' || (b == b'\r' && bytes.get(i + 1) != Some(&b'\n')) {
            offsets.push(i + 1);
        }
    }
    if offsets.last() != Some(&text.len()) {
        offsets.push(text.len());
    }
    offsets
}

/// `text` with every lone `\r` replaced by `\n`.
///
/// Byte offsets are unchanged, so line-based tools that only know `\n`
/// see the same lines as [`split_lines`].
#[must_use]
pub fn lone_cr_as_lf(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let is_lone_cr = |i: usize| bytes[i] == b'\r' && bytes.get(i + 1) != Some(&b'\n');
    if !(0..bytes.len()).any(is_lone_cr) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '\r' && chars.peek().map(|&(_, next)| next) != Some('\n') {
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
