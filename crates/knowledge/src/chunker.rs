//! Sentence-aware text chunking with configurable size and overlap.
//!
//! Offsets are counted in Unicode scalar values (`char`s), never bytes, so a
//! window can not split a multi-byte character.

/// Boundary tokens in priority order. The first token with any occurrence in
/// the window decides the cut, placed after its last occurrence.
pub const BOUNDARY_TOKENS: [&str; 5] = [". ", "! ", "? ", "\n\n", "\n"];

/// A chunk window over the source text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkWindow {
    /// First character of the window (inclusive)
    pub start: usize,
    /// End of the window (exclusive), clamped to the text length
    pub end: usize,
    /// Trimmed window text, never empty
    pub text: String,
}

/// Split `text` into overlapping windows, preferring sentence boundaries.
///
/// Windows whose trimmed text is empty are skipped, but the window positions
/// still advance so the emitted windows together with the skipped ones cover
/// the whole text. Chunking stops as soon as a window reaches the end of the
/// text.
///
/// Parameters outside `chunk_size > 0` and `overlap < chunk_size` still
/// terminate: every window has `end > start` and every next start is strictly
/// greater than the current one.
pub fn chunk_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkWindow> {
    // Byte offset of every char, plus the end of the text.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = offsets.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start.saturating_add(chunk_size);

        if end < len {
            let window = &text[offsets[start]..offsets[end]];
            if let Some(cut) = boundary_cut(window) {
                end = start + cut;
            }
        }

        if end <= start {
            end = start + 1;
        }

        let clamped = end.min(len);
        let trimmed = text[offsets[start]..offsets[clamped]].trim();
        if !trimmed.is_empty() {
            windows.push(ChunkWindow {
                start,
                end: clamped,
                text: trimmed.to_string(),
            });
        }

        if end >= len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { start + 1 };
    }

    tracing::trace!(
        "Chunked {} chars into {} windows (size: {}, overlap: {})",
        len,
        windows.len(),
        chunk_size,
        overlap
    );

    windows
}

/// Split `text` into overlapping chunk strings.
///
/// Convenience wrapper over [`chunk_windows`] that drops the offsets.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    chunk_windows(text, chunk_size, overlap)
        .into_iter()
        .map(|w| w.text)
        .collect()
}

/// Character length of the window prefix up to and including the winning
/// boundary token, if any token occurs.
fn boundary_cut(window: &str) -> Option<usize> {
    BOUNDARY_TOKENS.iter().find_map(|token| {
        window
            .rfind(token)
            .map(|pos| window[..pos].chars().count() + token.chars().count())
    })
}
