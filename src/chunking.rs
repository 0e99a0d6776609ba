//! Text chunking for document indexing.
//!
//! Splits extracted document text into overlapping character chunks sized for
//! embedding and retrieval.

/// Split text into chunks of roughly `chunk_size` characters with
/// `chunk_overlap` characters carried over between consecutive chunks.
///
/// Chunk boundaries are pulled back to the nearest whitespace so words are
/// never split. Overlap must be smaller than the chunk size.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    assert!(
        chunk_overlap < chunk_size,
        "chunk_overlap must be smaller than chunk_size"
    );

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        // Pull the boundary back to whitespace unless we're at the end.
        if end < chars.len() {
            let mut boundary = end;
            while boundary > start && !chars[boundary - 1].is_whitespace() {
                boundary -= 1;
            }
            if boundary > start {
                end = boundary;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        start = end.saturating_sub(chunk_overlap);
        // Guard against pathological overlap stalling progress.
        if start + chunk_size <= end {
            start = end;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("hello world", 100, 10);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("   ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunks_cover_text_with_overlap() {
        let text = "word ".repeat(200);
        let chunks = chunk_text(&text, 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }

        // First and last words must survive chunking.
        assert!(chunks.first().unwrap().starts_with("word"));
        assert!(chunks.last().unwrap().ends_with("word"));
    }

    #[test]
    fn test_no_word_splitting() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        let chunks = chunk_text(text, 20, 5);
        let words = [
            "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
            "juliet",
        ];
        for chunk in &chunks {
            for word in chunk.split_whitespace() {
                assert!(words.contains(&word), "split word in chunk: {}", chunk);
            }
        }
    }
}
