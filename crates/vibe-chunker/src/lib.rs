//! Heuristic code chunking for vibe-sync.
//!
//! Splits source files into declaration-sized chunks without a real parser:
//! - [`BraceChunker`]: regex declarations + brace counting (TypeScript,
//!   JavaScript, Swift)
//! - [`IndentChunker`]: regex declarations + indentation (Python)
//! - [`FallbackChunker`]: one truncated whole-file chunk for everything else
//!
//! [`walker`] finds the files to chunk from glob patterns.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use vibe_chunker::{chunk_file, ChunkerOptions};
//!
//! let chunks = chunk_file(
//!     Path::new("src/math.ts"),
//!     "export function add(a: number, b: number) {\n  return a + b;\n}\n",
//!     &ChunkerOptions::default(),
//! );
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].name.as_deref(), Some("add"));
//! ```

pub mod brace;
pub mod fallback;
pub mod indent;
mod patterns;
mod resolve;
pub mod walker;

use std::path::Path;

use serde::{Deserialize, Serialize};
use vibe_core::{ChunkKind, Language, SyncConfig};

pub use brace::BraceChunker;
pub use fallback::{truncate_chars, FallbackChunker};
pub use indent::IndentChunker;

/// A chunk of source code extracted from one file.
///
/// # Examples
///
/// ```
/// use vibe_chunker::CodeChunk;
/// use vibe_core::{ChunkKind, Language};
///
/// let chunk = CodeChunk {
///     file_path: "app/models.py".into(),
///     chunk_index: 0,
///     content: "    def save(self):\n        pass".into(),
///     language: Language::Python,
///     kind: ChunkKind::Method,
///     name: Some("save".into()),
///     parent_name: Some("User".into()),
///     start_line: 4,
///     end_line: 5,
///     symbols: vec!["save".into()],
/// };
/// assert_eq!(chunk.line_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    /// Path relative to the project root, `/`-separated.
    pub file_path: String,
    /// Position of the chunk within its file.
    pub chunk_index: usize,
    /// Raw code content.
    pub content: String,
    pub language: Language,
    pub kind: ChunkKind,
    /// Declared name. `None` only for anonymous declarations.
    pub name: Option<String>,
    /// Enclosing class for methods.
    pub parent_name: Option<String>,
    /// First line of the chunk (1-indexed).
    pub start_line: u32,
    /// Last line of the chunk (1-indexed, inclusive).
    pub end_line: u32,
    /// Every declared name found inside the chunk, first occurrence first.
    pub symbols: Vec<String>,
}

impl CodeChunk {
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

/// Tunables shared by all chunkers.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerOptions {
    /// Maximum lines scanned forward for a closing brace.
    pub block_scan_lines: usize,
    /// Characters kept by whole-file fallback chunks.
    pub fallback_max_chars: usize,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ChunkerOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            block_scan_lines: config.block_scan_lines,
            fallback_max_chars: config.fallback_max_chars,
        }
    }
}

/// Splits the content of one file into chunks.
///
/// Implementations never fail: content they cannot make sense of simply
/// yields fewer chunks.
pub trait Chunker: Send + Sync {
    fn chunk(&self, content: &str, file_path: &str) -> Vec<CodeChunk>;
}

/// Pick the chunker for `path` by its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vibe_chunker::{chunker_for, ChunkerOptions};
///
/// let chunker = chunker_for(Path::new("notes.md"), &ChunkerOptions::default());
/// let chunks = chunker.chunk("# Notes\nsome text\n", "notes.md");
/// assert_eq!(chunks[0].kind.as_str(), "file");
/// ```
pub fn chunker_for(path: &Path, options: &ChunkerOptions) -> Box<dyn Chunker> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let language = Language::from_extension(&ext);
    match language {
        Language::TypeScript | Language::JavaScript => {
            Box::new(BraceChunker::typescript(language, options.block_scan_lines))
        }
        Language::Swift => Box::new(BraceChunker::swift(options.block_scan_lines)),
        Language::Python => Box::new(IndentChunker::new()),
        Language::Unknown => Box::new(FallbackChunker::new(options.fallback_max_chars)),
    }
}

/// Chunk one file with the chunker its extension selects.
pub fn chunk_file(path: &Path, content: &str, options: &ChunkerOptions) -> Vec<CodeChunk> {
    let file_path = path_key(path);
    let mut chunks = chunker_for(path, options).chunk(content, &file_path);
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }
    chunks
}

/// Render a relative path the way it is stored in the index.
pub fn path_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split content into lines the same way for every chunker.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Byte offset of the start of every line.
pub(crate) fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// 0-indexed line containing byte `offset`.
pub(crate) fn line_of(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&s| s <= offset).saturating_sub(1)
}

/// Leading whitespace width in characters.
pub(crate) fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

pub(crate) fn join_lines(lines: &[&str], start: usize, end: usize) -> String {
    lines[start..=end].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_from_offsets() {
        let content = "a\nbb\n\nccc";
        let starts = line_starts(content);
        assert_eq!(starts, vec![0, 2, 5, 6]);
        assert_eq!(line_of(&starts, 0), 0);
        assert_eq!(line_of(&starts, 3), 1);
        assert_eq!(line_of(&starts, 5), 2);
        assert_eq!(line_of(&starts, 8), 3);
    }

    #[test]
    fn chunk_indexes_follow_file_order() {
        let content = "function a() {\n}\n\nfunction b() {\n}\n";
        let chunks = chunk_file(Path::new("src/x.js"), content, &ChunkerOptions::default());
        let indexes: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(chunks[0].language, Language::JavaScript);
        assert_eq!(chunks[1].file_path, "src/x.js");
    }

    #[test]
    fn extension_is_case_insensitive() {
        let chunks = chunk_file(
            Path::new("Sources/App.SWIFT"),
            "struct App {\n}\n",
            &ChunkerOptions::default(),
        );
        assert_eq!(chunks[0].kind, ChunkKind::Struct);
    }

    #[test]
    fn path_key_uses_forward_slashes() {
        let path: std::path::PathBuf = ["src", "components", "Button.tsx"].iter().collect();
        assert_eq!(path_key(&path), "src/components/Button.tsx");
    }
}
