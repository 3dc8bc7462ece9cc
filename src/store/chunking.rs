//! Fixed-window chunking for retrieval ingestion.
//!
//! Documents are cut into overlapping character windows: the window advances by
//! `window - overlap` each step so neighboring chunks share a margin, keeping clause
//! boundaries visible to retrieval. A trailing partial window is kept when it carries
//! any non-whitespace content; blank windows are dropped outright, so no stored chunk
//! is ever empty.

/// Cut `text` into overlapping windows of `window` characters.
///
/// `overlap` must be strictly smaller than `window`; configuration clamps it before this
/// point. Returns an empty vector for all-whitespace input.
pub(crate) fn chunk_text(text: &str, window: usize, overlap: usize) -> Vec<String> {
    debug_assert!(window > 0);
    debug_assert!(overlap < window);

    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = window - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_window_count(len: usize, window: usize, overlap: usize) -> usize {
        // Number of window starts: ceil(len / (window - overlap)).
        let step = window - overlap;
        len.div_ceil(step)
    }

    #[test]
    fn dense_text_matches_window_count_law() {
        let text = "a".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), expected_window_count(2500, 1000, 200));
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks.last().expect("trailing chunk").len(), 2500 - 3 * 800);
    }

    #[test]
    fn adjacent_chunks_share_the_overlap() {
        let text: String = ('a'..='z').cycle().take(3000).collect();
        let chunks = chunk_text(&text, 1000, 200);
        for pair in chunks.windows(2) {
            let left_tail: String = pair[0].chars().skip(800).collect();
            let right_head: String = pair[1].chars().take(left_tail.chars().count()).collect();
            assert_eq!(left_tail, right_head);
        }
    }

    #[test]
    fn whitespace_only_input_produces_nothing() {
        assert!(chunk_text("   \n\t  ", 1000, 200).is_empty());
        assert!(chunk_text("", 1000, 200).is_empty());
    }

    #[test]
    fn blank_trailing_window_is_dropped() {
        let mut text = "x".repeat(800);
        text.push_str(&" ".repeat(400));
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 1);
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn short_document_yields_single_chunk() {
        let chunks = chunk_text("short document", 1000, 200);
        assert_eq!(chunks, vec!["short document".to_string()]);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(1500);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks[0].chars().count(), 1000);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == 'é'));
        }
    }
}
