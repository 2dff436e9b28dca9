//! Byte-stream to line framing.
//!
//! Serial reads arrive in arbitrary chunks. `LineFramer` carries the
//! unterminated tail of the previous chunk and emits only complete lines,
//! split on `\n`. Trailing `\r`/`\n` characters are stripped and invalid
//! UTF-8 is replaced with U+FFFD rather than rejected.

use memchr::memchr_iter;

/// Line terminator byte.
pub const LINE_TERMINATOR: u8 = b'\n';

/// What to do with a completed line that is empty after stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyLinePolicy {
    /// Emit empty lines; the console shows them as blank rows.
    #[default]
    Keep,
    /// Silently drop empty lines.
    Drop,
}

impl EmptyLinePolicy {
    pub fn from_keep(keep: bool) -> Self {
        if keep {
            Self::Keep
        } else {
            Self::Drop
        }
    }
}

/// Incremental newline framer.
#[derive(Debug, Default)]
pub struct LineFramer {
    remainder: Vec<u8>,
    policy: EmptyLinePolicy,
}

impl LineFramer {
    pub fn new(policy: EmptyLinePolicy) -> Self {
        Self {
            remainder: Vec::with_capacity(1024),
            policy,
        }
    }

    /// Append `bytes` and return every line completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.remainder.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        for end in memchr_iter(LINE_TERMINATOR, &self.remainder) {
            let text = decode_line(&self.remainder[start..end]);
            start = end + 1;
            if text.is_empty() && self.policy == EmptyLinePolicy::Drop {
                continue;
            }
            lines.push(text);
        }
        self.remainder.drain(..start);
        lines
    }

    /// The unterminated tail carried into the next `feed`.
    pub fn remainder(&self) -> &[u8] {
        &self.remainder
    }

    /// Discard the carried tail (after a reconnect).
    pub fn reset(&mut self) {
        self.remainder.clear();
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string()
}
