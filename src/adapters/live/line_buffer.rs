//! Splits a chunked byte stream into newline-terminated lines.

/// Accumulates bytes and yields complete lines.
///
/// Works on bytes so a multi-byte character split across two chunks is
/// reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    max_buffer_bytes: Option<usize>,
    overflowed_bytes: usize,
}

impl LineBuffer {
    /// Creates a buffer that keeps at most `max_buffer_bytes` of an
    /// unterminated line.
    #[must_use]
    pub fn new(max_buffer_bytes: Option<usize>) -> Self {
        Self { buffer: Vec::new(), max_buffer_bytes, overflowed_bytes: 0 }
    }

    /// Appends a chunk and returns every line it completed, without the
    /// terminator. Blank lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=idx).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }

        if let Some(max) = self.max_buffer_bytes {
            if self.buffer.len() > max {
                let excess = self.buffer.len() - max;
                self.buffer.drain(..excess);
                self.overflowed_bytes = self.overflowed_bytes.saturating_add(excess);
            }
        }
        lines
    }

    /// Bytes discarded since the last call.
    pub fn consume_overflowed_bytes(&mut self) -> usize {
        std::mem::take(&mut self.overflowed_bytes)
    }

    /// Takes the unterminated remainder.
    pub fn flush(&mut self) -> String {
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&rest).into_owned()
    }
}
