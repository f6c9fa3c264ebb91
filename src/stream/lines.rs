//! Line reassembly for chunked event-stream bodies
//!
//! Network reads do not respect line boundaries: a `data:` line can be split
//! across two chunks, and so can a multi-byte UTF-8 sequence. [`LineBuffer`]
//! keeps the unterminated tail in raw bytes and only decodes complete lines.

/// Accumulates raw body chunks and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed
    ///
    /// Lines are returned without the `\n` terminator; a trailing `\r` is
    /// stripped as well. Bytes after the last `\n` stay buffered.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatrelay::stream::LineBuffer;
    ///
    /// let mut buffer = LineBuffer::new();
    /// assert!(buffer.push(b"data: {\"con").is_empty());
    /// assert_eq!(buffer.push(b"tent\":\"x\"}\n\n"), vec!["data: {\"content\":\"x\"}", ""]);
    /// ```
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);

        lines
    }

    /// Take the unterminated remainder, if any
    ///
    /// Called once the body has ended so that a final line without a
    /// trailing newline is not lost.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    /// Whether bytes are waiting for a line terminator
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_lines_in_one_chunk() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"data: a\n\ndata: b\n\n");
        assert_eq!(lines, vec!["data: a", "", "data: b", ""]);
        assert!(!buffer.has_pending());
    }

    #[test]
    fn test_partial_line_carried_to_next_chunk() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(b"data: {\"content\": \"Hel").is_empty());
        assert!(buffer.has_pending());
        let lines = buffer.push(b"lo\"}\n");
        assert_eq!(lines, vec!["data: {\"content\": \"Hello\"}"]);
    }

    #[test]
    fn test_crlf_terminators_stripped() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.push(b"data: x\r\n\r\n"), vec!["data: x", ""]);
    }

    #[test]
    fn test_split_utf8_sequence_is_reassembled() {
        // "é" is 0xC3 0xA9; split it across two reads.
        let mut buffer = LineBuffer::new();
        assert!(buffer.push(&[b'c', b'a', b'f', 0xC3]).is_empty());
        let lines = buffer.push(&[0xA9, b'\n']);
        assert_eq!(lines, vec!["café"]);
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"data: {\"done\": true}");
        assert_eq!(buffer.finish().as_deref(), Some("data: {\"done\": true}"));
        assert!(buffer.finish().is_none());
    }
}
