//! Fixed-size sequence chunker.
//!
//! Splits a sequence into [`Chunk`]s of exactly `chunk_size` characters
//! (the last one may be shorter). Concatenating the chunks in index order
//! reproduces the input exactly. An empty sequence produces no chunks.

use crate::models::Chunk;

/// Split `text` into contiguous chunks indexed from 0.
///
/// Sizes are counted in characters, so multi-byte input is never split
/// inside a code point.
pub fn split_into_chunks(sequence_id: &str, text: &str, chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be > 0");

    let mut chunks = Vec::new();
    let mut remaining = text;
    let mut chunk_index = 0usize;

    while !remaining.is_empty() {
        let split_at = byte_offset_of_char(remaining, chunk_size);
        let (piece, rest) = remaining.split_at(split_at);
        chunks.push(Chunk {
            sequence_id: sequence_id.to_string(),
            chunk_index,
            data: piece.to_string(),
        });
        chunk_index += 1;
        remaining = rest;
    }

    chunks
}

/// Reassemble chunk data in the given order.
pub fn concat_chunks<S: AsRef<str>>(chunks: &[S]) -> String {
    let total = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = String::with_capacity(total);
    for c in chunks {
        out.push_str(c.as_ref());
    }
    out
}

/// Length of `text` in characters.
pub fn char_len(text: &str) -> usize {
    if text.is_ascii() {
        text.len()
    } else {
        text.chars().count()
    }
}

/// Global starting offset of every chunk: the sum of the character lengths
/// of all preceding chunks.
pub fn chunk_offsets<S: AsRef<str>>(chunks: &[S]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut offset = 0usize;
    for c in chunks {
        offsets.push(offset);
        offset += char_len(c.as_ref());
    }
    offsets
}

/// Byte index of the `n`th character, or `text.len()` if shorter.
fn byte_offset_of_char(text: &str, n: usize) -> usize {
    if text.is_ascii() {
        return text.len().min(n);
    }
    text.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(split_into_chunks("seq", "", 4).is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = split_into_chunks("seq", "ACGTACGT", 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].data, "ACGT");
        assert_eq!(chunks[1].data, "ACGT");
    }

    #[test]
    fn test_short_last_chunk() {
        let chunks = split_into_chunks("seq", "ACGTACGTAA", 4);
        let data: Vec<&str> = chunks.iter().map(|c| c.data.as_str()).collect();
        assert_eq!(data, vec!["ACGT", "ACGT", "AA"]);
    }

    #[test]
    fn test_round_trip_and_sizes() {
        let text: String = (0..1037).map(|i| ['A', 'C', 'G', 'T'][i % 4]).collect();
        for size in [1, 3, 5, 64, 1037, 5000] {
            let chunks = split_into_chunks("seq", &text, size);
            let data: Vec<&str> = chunks.iter().map(|c| c.data.as_str()).collect();
            assert_eq!(concat_chunks(&data), text, "round trip failed for size {}", size);
            for c in &chunks[..chunks.len() - 1] {
                assert_eq!(c.data.len(), size);
            }
            assert!(!chunks.last().unwrap().data.is_empty());
        }
    }

    #[test]
    fn test_indices_contiguous() {
        let chunks = split_into_chunks("seq", &"N".repeat(100), 7);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.sequence_id, "seq");
        }
    }

    #[test]
    fn test_multibyte_split_on_char_boundary() {
        let text = "αβγδε";
        let chunks = split_into_chunks("seq", text, 2);
        let data: Vec<&str> = chunks.iter().map(|c| c.data.as_str()).collect();
        assert_eq!(data, vec!["αβ", "γδ", "ε"]);
        assert_eq!(concat_chunks(&data), text);
    }

    #[test]
    fn test_offsets_from_actual_lengths() {
        assert_eq!(chunk_offsets(&["AAAAA", "CCCCC", "GGG"]), vec![0, 5, 10]);
        assert_eq!(chunk_offsets(&["AA", "CCCC", "G"]), vec![0, 2, 6]);
        assert_eq!(chunk_offsets(&["αβ", "γ"]), vec![0, 2]);
        assert!(chunk_offsets::<&str>(&[]).is_empty());
    }
}
