//! Separator-preferring text chunker with overlap.
//!
//! Splits extracted document text into chunks no larger than `size`
//! characters, cutting preferentially on paragraph breaks (`\n`), then
//! spaces, then sentence terminators (`.`). Adjacent chunks share up to
//! `overlap` characters of trailing context, snapped to the same separator
//! boundaries — the shared region is therefore approximate, never an exact
//! `overlap`-length substring.
//!
//! Output is a finite, eager `Vec`. Empty or whitespace-only input yields
//! an empty `Vec`.

/// Split preference: paragraph break, word boundary, sentence terminator.
const SEPARATORS: [char; 3] = ['\n', ' ', '.'];

/// Split `text` into overlapping chunks of at most `size` characters.
///
/// `overlap` must be smaller than `size`; configuration loading enforces
/// this before the pipeline runs.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < size);

    if text.trim().is_empty() {
        return Vec::new();
    }

    let pieces = split_recursive(text, size, &SEPARATORS);
    merge_pieces(&pieces, size, overlap)
}

/// Split `text` into pieces of at most `size` characters, preferring the
/// earliest separator in `seps` and recursing with the remaining ones for
/// oversized pieces. Falls back to hard character cuts when no separator
/// can bring a piece under the limit.
fn split_recursive<'a>(text: &'a str, size: usize, seps: &[char]) -> Vec<&'a str> {
    if text.len() <= size {
        return vec![text];
    }

    let Some((&sep, rest)) = seps.split_first() else {
        return hard_cut(text, size);
    };

    let mut pieces = Vec::new();
    for segment in split_inclusive_char(text, sep) {
        if segment.len() <= size {
            pieces.push(segment);
        } else {
            pieces.extend(split_recursive(segment, size, rest));
        }
    }
    pieces
}

/// Split on `sep`, keeping the separator attached to the preceding piece.
fn split_inclusive_char(text: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(sep) {
        let end = idx + sep.len_utf8();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Cut `text` into pieces of at most `size` bytes at char boundaries.
fn hard_cut(text: &str, size: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + size).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        pieces.push(&text[start..end]);
        start = end;
    }
    pieces
}

/// Accumulate pieces into chunks under `size`, carrying a trailing window
/// of at most `overlap` characters into the next chunk.
fn merge_pieces(pieces: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for &piece in pieces {
        if current_len + piece.len() > size && !current.is_empty() {
            push_chunk(&mut chunks, &current);
            // Drop leading pieces until the carried tail fits the overlap
            // budget and leaves room for the incoming piece.
            while current_len > overlap
                || (current_len + piece.len() > size && current_len > 0)
            {
                current_len -= current[0].len();
                current.remove(0);
            }
        }
        current.push(piece);
        current_len += piece.len();
    }

    if !current.is_empty() {
        push_chunk(&mut chunks, &current);
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<String>, pieces: &[&str]) {
    let joined = pieces.concat();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
