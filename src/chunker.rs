/// Split a document into size-bounded chunks.
///
/// Targets `target_chars` characters per chunk (measured in bytes, which is
/// equivalent for ASCII-heavy prose) and prefers breaking at whitespace or
/// sentence punctuation within the last 20% of a chunk so that words are not
/// cut mid-way. All slices occur at UTF-8 character boundaries.
pub fn split_text(text: &str, target_chars: usize) -> Vec<String> {
    if text.trim().is_empty() || target_chars == 0 {
        return Vec::new();
    }

    // Clamp a byte position to the nearest char boundary at or before it.
    let find_char_boundary = |byte_pos: usize| -> usize {
        if byte_pos >= text.len() {
            return text.len();
        }
        if text.is_char_boundary(byte_pos) {
            return byte_pos;
        }
        for i in (0..byte_pos).rev() {
            if text.is_char_boundary(i) {
                return i;
            }
        }
        0
    };

    let mut chunks = Vec::new();
    let mut start_byte = 0;

    while start_byte < text.len() {
        start_byte = find_char_boundary(start_byte);

        let end_byte = (start_byte + target_chars).min(text.len());
        let end_byte = find_char_boundary(end_byte);

        // Prefer a word/sentence boundary within the last 20% of the chunk
        let chunk_end_byte = if end_byte < text.len() {
            let search_start_byte = find_char_boundary(end_byte.saturating_sub(target_chars / 5));
            match text.get(search_start_byte..end_byte).and_then(|window| {
                window
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace() || *c == '.' || *c == '!' || *c == '?')
                    .map(|(offset, c)| search_start_byte + offset + c.len_utf8())
            }) {
                Some(boundary) => find_char_boundary(boundary.min(text.len())),
                None => end_byte,
            }
        } else {
            end_byte
        };

        if let Some(chunk) = text.get(start_byte..chunk_end_byte) {
            let trimmed = chunk.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
        }

        if chunk_end_byte >= text.len() || chunk_end_byte <= start_byte {
            break;
        }
        start_byte = chunk_end_byte;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 1000).is_empty());
        assert!(split_text("   \n\t  ", 1000).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("Gimpa is a university in Ghana.", 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Gimpa is a university in Ghana.");
    }

    #[test]
    fn test_long_text_bounded_chunks() {
        let text = "word ".repeat(1000); // 5000 chars
        let chunks = split_text(&text, 1000);
        assert!(chunks.len() >= 5);
        for chunk in &chunks {
            assert!(chunk.len() <= 1000, "chunk exceeds target: {} chars", chunk.len());
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_breaks_at_word_boundaries() {
        let text = "alpha beta gamma ".repeat(100);
        let chunks = split_text(&text, 100);
        for chunk in &chunks {
            // Every chunk should start and end on a complete word
            assert!(["alpha", "beta", "gamma"]
                .contains(&chunk.split_whitespace().last().unwrap()));
        }
    }

    #[test]
    fn test_no_content_lost() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(50);
        let chunks = split_text(&text, 200);
        let rejoined: String = chunks.join(" ");
        let original_words = text.split_whitespace().count();
        let rejoined_words = rejoined.split_whitespace().count();
        assert_eq!(original_words, rejoined_words);
    }

    #[test]
    fn test_multibyte_safe() {
        let text = "héllo wörld ünïcode ".repeat(100);
        let chunks = split_text(&text, 100);
        assert!(!chunks.is_empty());
        // Would panic on a mid-character slice before reaching the assert
        for chunk in &chunks {
            assert!(chunk.chars().count() > 0);
        }
    }

    #[test]
    fn test_unbreakable_run_falls_back_to_hard_split() {
        let text = "x".repeat(2500);
        let chunks = split_text(&text, 1000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
    }
}
