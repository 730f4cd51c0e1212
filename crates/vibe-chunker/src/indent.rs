//! Indentation-based chunker for Python.

use vibe_core::{ChunkKind, Language};

use crate::patterns::{extract_symbols, PYTHON_CLASS, PYTHON_DEF};
use crate::resolve::{resolve_overlaps, Candidate, Coverage};
use crate::{indent_width, join_lines, line_of, line_starts, split_lines, Chunker, CodeChunk};

/// Chunks Python source into classes, functions and methods.
///
/// A function indented inside a class becomes a `method` whose
/// `parent_name` is the innermost enclosing class.
///
/// # Examples
///
/// ```
/// use vibe_chunker::{Chunker, IndentChunker};
///
/// let src = "class Repo:\n    def save(self):\n        pass\n";
/// let chunks = IndentChunker::new().chunk(src, "repo.py");
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].parent_name.as_deref(), Some("Repo"));
/// ```
#[derive(Debug, Default)]
pub struct IndentChunker;

impl IndentChunker {
    pub fn new() -> Self {
        Self
    }
}

impl Chunker for IndentChunker {
    fn chunk(&self, content: &str, file_path: &str) -> Vec<CodeChunk> {
        let lines = split_lines(content);
        if lines.is_empty() {
            return Vec::new();
        }
        let starts = line_starts(content);

        let mut classes: Vec<Candidate> = Vec::new();
        for caps in PYTHON_CLASS.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let start = line_of(&starts, whole.start());
            if start >= lines.len() {
                continue;
            }
            classes.push(Candidate {
                kind: ChunkKind::Class,
                name: name.as_str().to_string(),
                start,
                end: find_indent_block_end(&lines, start),
                parent: None,
            });
        }

        let mut candidates = classes.clone();
        for caps in PYTHON_DEF.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let def_line = line_of(&starts, whole.start());
            if def_line >= lines.len() {
                continue;
            }
            let parent = enclosing_class(&lines, def_line, &classes);
            candidates.push(Candidate {
                kind: if parent.is_some() {
                    ChunkKind::Method
                } else {
                    ChunkKind::Function
                },
                name: name.as_str().to_string(),
                start: decorator_start(&lines, def_line),
                end: find_indent_block_end(&lines, def_line),
                parent,
            });
        }

        resolve_overlaps(candidates, lines.len(), Coverage::ClassesOnly)
            .into_iter()
            .map(|c| {
                let content = join_lines(&lines, c.start, c.end);
                let symbols = extract_symbols([&*PYTHON_CLASS, &*PYTHON_DEF], &content);
                CodeChunk {
                    file_path: file_path.to_string(),
                    chunk_index: 0,
                    content,
                    language: Language::Python,
                    kind: c.kind,
                    name: Some(c.name),
                    parent_name: c.parent,
                    start_line: c.start as u32 + 1,
                    end_line: c.end as u32 + 1,
                    symbols,
                }
            })
            .collect()
    }
}

fn is_code(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// The block opened on `start` runs until the first code line that is not
/// indented past it. Blank and comment lines never end a block, and trailing
/// blank lines are not part of it.
pub(crate) fn find_indent_block_end(lines: &[&str], start: usize) -> usize {
    let base = indent_width(lines[start]);
    let mut last = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_width(line);
        if is_code(line) && indent <= base {
            return last;
        }
        if indent > base {
            last = i;
        }
    }
    last
}

/// Include decorator lines directly above a `def`.
fn decorator_start(lines: &[&str], def_line: usize) -> usize {
    let indent = indent_width(lines[def_line]);
    let mut start = def_line;
    while start > 0 {
        let above = lines[start - 1];
        if above.trim_start().starts_with('@') && indent_width(above) == indent {
            start -= 1;
        } else {
            break;
        }
    }
    start
}

fn enclosing_class(lines: &[&str], def_line: usize, classes: &[Candidate]) -> Option<String> {
    let indent = indent_width(lines[def_line]);
    classes
        .iter()
        .filter(|c| c.start < def_line && def_line <= c.end && indent > indent_width(lines[c.start]))
        .max_by_key(|c| c.start)
        .map(|c| c.name.clone())
}
