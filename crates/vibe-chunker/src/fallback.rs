use std::path::Path;

use vibe_core::{ChunkKind, Language};

use crate::{Chunker, CodeChunk};

/// Emits a single `file` chunk holding the first `max_chars` characters of a
/// file no other chunker understands. No symbols are recorded.
#[derive(Debug)]
pub struct FallbackChunker {
    max_chars: usize,
}

impl FallbackChunker {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Chunker for FallbackChunker {
    fn chunk(&self, content: &str, file_path: &str) -> Vec<CodeChunk> {
        let path = Path::new(file_path);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string());
        let language = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| Language::from_extension(&e.to_ascii_lowercase()))
            .unwrap_or(Language::Unknown);
        let line_count = content.lines().count().max(1) as u32;

        vec![CodeChunk {
            file_path: file_path.to_string(),
            chunk_index: 0,
            content: truncate_chars(content, self.max_chars).to_string(),
            language,
            kind: ChunkKind::File,
            name: Some(name),
            parent_name: None,
            start_line: 1,
            end_line: line_count,
            symbols: Vec::new(),
        }]
    }
}

/// The longest prefix of `s` with at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_file_chunk_is_truncated() {
        let content = "x".repeat(5000) + "\nsecond line\nthird";
        let chunks = FallbackChunker::new(4000).chunk(&content, "scripts/build.rb");
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.kind, ChunkKind::File);
        assert_eq!(chunk.name.as_deref(), Some("build"));
        assert_eq!(chunk.content.chars().count(), 4000);
        assert_eq!((chunk.start_line, chunk.end_line), (1, 3));
        assert!(chunk.symbols.is_empty());
        assert_eq!(chunk.language, Language::Unknown);
    }

    #[test]
    fn empty_file_still_spans_one_line() {
        let chunks = FallbackChunker::new(4000).chunk("", "empty.txt");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 1));
        assert_eq!(chunks[0].content, "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("日本語", 5), "日本語");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
