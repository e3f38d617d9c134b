/// Splits a chunked byte stream into complete text lines.
///
/// Bytes are buffered raw and split on `\n` before UTF-8 decoding. A newline
/// byte never occurs inside a multi-byte UTF-8 sequence, so characters split
/// across chunk boundaries are reassembled before they are decoded.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line completed by it, in order.
    ///
    /// The trailing partial line stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
        }
        self.buf.drain(..start);
        lines
    }

    /// Returns the unterminated residual once the transport signals end of
    /// stream. Yields at most once.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let residual = std::mem::take(&mut self.buf);
        Some(decode_line(&residual))
    }

    /// Bytes currently held for an incomplete line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
