
use super::text_len;

/// Greedy line-accumulating chunker used when no grammar applies.
///
/// Lines are appended (with their newline) to a running buffer. When the next
/// line would push the buffer past `max_size`, the buffer is flushed first. A
/// single line longer than `max_size` still becomes its own chunk.
///
/// If nothing is produced, the original text is returned as the only chunk.
#[inline]
#[must_use]
pub fn chunk_lines(text: &str, max_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for line in text.split('\n') {
        let line_len = text_len(line);
        if buffer_len + line_len > max_size && !buffer.is_empty() {
            chunks.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }

        buffer.push_str(line);
        buffer.push('\n');
        buffer_len += line_len + 1;
    }

    if !buffer.trim().is_empty() {
        chunks.push(buffer);
    }

    if chunks.is_empty() {
        chunks.push(text.to_string());
    }

    chunks
}
