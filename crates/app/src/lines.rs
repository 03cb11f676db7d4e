//! Line splitting with carry-over.
//!
//! A read may end in the middle of a frame. The incomplete tail is kept
//! and completed by the next read instead of being dropped, up to
//! [`MAX_PARTIAL`] bytes.

/// Longest incomplete line kept between reads.
pub const MAX_PARTIAL: usize = 4 * 4096;

/// Splits received text on `\n`, keeping the partial last line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, without the
    /// `\n` terminator. Any `\r` before it is kept.
    ///
    /// An incomplete line growing past [`MAX_PARTIAL`] is discarded.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.partial.push_str(chunk);
        let lines = match self.partial.rfind('\n') {
            Some(last_newline) => {
                let rest = self.partial.split_off(last_newline + 1);
                let complete = std::mem::replace(&mut self.partial, rest);
                complete
                    .split_terminator('\n')
                    .map(str::to_string)
                    .collect()
            }
            None => Vec::new(),
        };
        if self.partial.len() > MAX_PARTIAL {
            tracing::warn!(bytes = self.partial.len(), "discarding unterminated input");
            self.partial.clear();
        }
        lines
    }

    /// Forget any partial line, e.g. after the link was lost.
    pub fn clear(&mut self) {
        self.partial.clear();
    }

    #[cfg(test)]
    fn pending(&self) -> &str {
        &self.partial
    }
}
