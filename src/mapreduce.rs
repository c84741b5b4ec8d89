//! Map and reduce stages of a search job.
//!
//! - **Map**: [`ChunkMapper::map_chunk`] runs the pattern over one chunk and
//!   shifts every local match start by the chunk's global offset.
//! - **Reduce**: [`reduce`] groups the per-chunk match lists by matched text.
//!
//! Matches are leftmost-first and non-overlapping within a chunk. A match
//! that would span two chunks is not found, since each mapper only sees its
//! own chunk.

use regex::Regex;

use crate::error::{SearchError, SearchResult};
use crate::models::{AggregatedResult, MatchRecord};

/// Compile `pattern`, mapping syntax errors to [`SearchError::Pattern`].
pub fn compile_pattern(pattern: &str) -> SearchResult<Regex> {
    Regex::new(pattern).map_err(|e| SearchError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// One-shot map step: compile `pattern` and search `chunk`.
pub fn search_chunk(chunk: &str, pattern: &str, offset: usize) -> SearchResult<Vec<MatchRecord>> {
    let regex = compile_pattern(pattern)?;
    Ok(find_matches(chunk, &regex, offset))
}

/// Every match of `regex` in `chunk`, positioned at `offset + local start`.
///
/// Local starts are character offsets, matching how chunk offsets are counted.
pub fn find_matches(chunk: &str, regex: &Regex, offset: usize) -> Vec<MatchRecord> {
    let ascii = chunk.is_ascii();
    let mut last_byte = 0usize;
    let mut last_char = 0usize;

    regex
        .find_iter(chunk)
        .map(|m| {
            let local = if ascii {
                m.start()
            } else {
                last_char += chunk[last_byte..m.start()].chars().count();
                last_byte = m.start();
                last_char
            };
            MatchRecord::new(offset + local, m.as_str())
        })
        .collect()
}

/// The map-stage function run once per chunk.
///
/// Implementations must be pure with respect to the chunk: no chunk is ever
/// mutated during a search.
pub trait ChunkMapper: Send + Sync + 'static {
    fn map_chunk(
        &self,
        chunk: &str,
        regex: &Regex,
        offset: usize,
    ) -> anyhow::Result<Vec<MatchRecord>>;
}

/// Default mapper backed by [`find_matches`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexMapper;

impl ChunkMapper for RegexMapper {
    fn map_chunk(
        &self,
        chunk: &str,
        regex: &Regex,
        offset: usize,
    ) -> anyhow::Result<Vec<MatchRecord>> {
        Ok(find_matches(chunk, regex, offset))
    }
}

/// Combine mapper outputs, given in chunk-index order.
///
/// Because offsets come from the chunk index and each list is locally
/// ordered, appending per key keeps every position list ascending.
pub fn reduce<I>(per_chunk: I) -> AggregatedResult
where
    I: IntoIterator<Item = Vec<MatchRecord>>,
{
    let mut result = AggregatedResult::new();
    for matches in per_chunk {
        for record in matches {
            result.push(record);
        }
    }
    result
}
