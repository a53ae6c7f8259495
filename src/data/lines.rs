//! Byte-chunk to line assembly.

/// Accumulates raw bytes and hands out complete, trimmed lines.
///
/// Bytes after the last newline stay pending until a later chunk completes
/// the line. Lines are decoded only once complete, so a multi-byte UTF-8
/// character split across two reads survives; invalid sequences become
/// U+FFFD instead of failing.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
    // Offset of the first unconsumed byte in `pending`.
    cursor: usize,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes read from the source.
    pub fn push(&mut self, chunk: &[u8]) {
        self.compact();
        self.pending.extend_from_slice(chunk);
    }

    /// Append `chunk` and iterate over every line it completed.
    pub fn feed<'a>(&'a mut self, chunk: &[u8]) -> Lines<'a> {
        self.push(chunk);
        self.lines()
    }

    /// Iterate over the complete lines currently buffered.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { assembler: self }
    }

    /// Pop the next complete line, trimmed of surrounding whitespace (including `\r`).
    pub fn next_line(&mut self) -> Option<String> {
        let rest = &self.pending[self.cursor..];
        let nl = rest.iter().position(|&b| b == b'\n')?;
        let line = String::from_utf8_lossy(&rest[..nl]).trim().to_string();
        self.cursor += nl + 1;
        Some(line)
    }

    /// Number of bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.cursor
    }

    /// Forget any partial line (used when a new connection starts).
    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor = 0;
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.pending.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

/// Iterator returned by [`LineAssembler::lines`] and [`LineAssembler::feed`].
pub struct Lines<'a> {
    assembler: &'a mut LineAssembler,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.assembler.next_line()
    }
}
