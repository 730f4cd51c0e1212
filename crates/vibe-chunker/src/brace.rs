//! Brace-counting chunker for C-family syntax (TypeScript, JavaScript, Swift).

use vibe_core::Language;

use crate::patterns::{extract_symbols, DeclPattern, SWIFT, TYPESCRIPT};
use crate::resolve::{resolve_overlaps, Candidate, Coverage};
use crate::{indent_width, join_lines, line_of, line_starts, split_lines, Chunker, CodeChunk};

/// Lines kept after a declaration whose braces never balance.
const UNBALANCED_SPAN: usize = 50;

/// Leading characters that continue a declaration onto the next line.
const CONTINUATION: &[char] = &['{', ')', ']', '.', ':', '=', '|', '&', '>', '?', ','];

/// Chunks a file at every declaration a pattern recognizes, extending each
/// one to its matching closing brace.
///
/// # Examples
///
/// ```
/// use vibe_chunker::{BraceChunker, Chunker};
///
/// let chunker = BraceChunker::swift(2000);
/// let chunks = chunker.chunk("struct Point {\n    var x: Int\n}\n", "Point.swift");
/// assert_eq!(chunks.len(), 1);
/// assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
/// ```
pub struct BraceChunker {
    language: Language,
    patterns: &'static [DeclPattern],
    scan_lines: usize,
}

impl BraceChunker {
    /// Chunker for `.ts`, `.tsx`, `.js` and `.jsx` files.
    pub fn typescript(language: Language, scan_lines: usize) -> Self {
        Self {
            language,
            patterns: TYPESCRIPT.as_slice(),
            scan_lines,
        }
    }

    pub fn swift(scan_lines: usize) -> Self {
        Self {
            language: Language::Swift,
            patterns: SWIFT.as_slice(),
            scan_lines,
        }
    }
}

impl Chunker for BraceChunker {
    fn chunk(&self, content: &str, file_path: &str) -> Vec<CodeChunk> {
        let lines = split_lines(content);
        if lines.is_empty() {
            return Vec::new();
        }
        let starts = line_starts(content);

        let mut candidates = Vec::new();
        for pattern in self.patterns {
            for caps in pattern.regex.captures_iter(content) {
                let (Some(whole), Some(name)) = (caps.get(0), DeclPattern::name(&caps)) else {
                    continue;
                };
                let start = line_of(&starts, whole.start());
                if start >= lines.len() {
                    continue;
                }
                candidates.push(Candidate {
                    kind: pattern.kind,
                    name: name.to_string(),
                    start,
                    end: find_block_end(&lines, start, self.scan_lines),
                    parent: None,
                });
            }
        }

        resolve_overlaps(candidates, lines.len(), Coverage::EveryBlock)
            .into_iter()
            .map(|c| {
                let content = join_lines(&lines, c.start, c.end);
                let symbols = extract_symbols(self.patterns.iter().map(|p| &p.regex), &content);
                CodeChunk {
                    file_path: file_path.to_string(),
                    chunk_index: 0,
                    content,
                    language: self.language,
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

/// Find the 0-indexed last line of the block declared on `start`.
///
/// Counts `{` and `}` from the declaration line until they balance, skipping
/// braces inside comments and string or template literals. A
/// declaration that has not opened a brace yet ends on a line terminated by
/// `;`, or before the next line that is not indented past it and does not
/// continue it. Gives up after `scan_lines` lines and keeps
/// [`UNBALANCED_SPAN`] lines instead.
pub(crate) fn find_block_end(lines: &[&str], start: usize, scan_lines: usize) -> usize {
    let last = lines.len() - 1;
    let scan_end = last.min(start + scan_lines.saturating_sub(1));
    let base_indent = indent_width(lines[start]);
    let mut depth: i64 = 0;
    let mut opened = false;
    let mut scanner = BraceScanner::default();

    for (i, line) in lines.iter().enumerate().take(scan_end + 1).skip(start) {
        let trimmed = line.trim();
        if !opened
            && i > start
            && !trimmed.is_empty()
            && indent_width(line) <= base_indent
            && !trimmed.starts_with(CONTINUATION)
        {
            return last_non_blank(lines, start, i - 1);
        }

        let (delta, saw_open) = scanner.scan(line);
        depth += delta;
        opened |= saw_open;

        if opened && depth == 0 {
            return i;
        }
        if !opened && trimmed.ends_with(';') {
            return i;
        }
    }

    (start + UNBALANCED_SPAN).min(last)
}

/// Lexical state carried across lines: block comments and template
/// literals may span several.
#[derive(Default)]
struct BraceScanner {
    block_comment: bool,
    template: bool,
}

impl BraceScanner {
    /// Net brace depth change on `line`, and whether it opened any brace.
    fn scan(&mut self, line: &str) -> (i64, bool) {
        let mut delta = 0;
        let mut opened = false;
        // single- and double-quoted strings end with the line
        let mut quote: Option<char> = None;
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            if self.block_comment {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.block_comment = false;
                }
                continue;
            }
            if self.template {
                match ch {
                    '\\' => {
                        chars.next();
                    }
                    '`' => self.template = false,
                    _ => {}
                }
                continue;
            }
            if let Some(q) = quote {
                match ch {
                    '\\' => {
                        chars.next();
                    }
                    c if c == q => quote = None,
                    _ => {}
                }
                continue;
            }
            match ch {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.block_comment = true;
                }
                '"' | '\'' => quote = Some(ch),
                '`' => self.template = true,
                '{' => {
                    delta += 1;
                    opened = true;
                }
                '}' => delta -= 1,
                _ => {}
            }
        }
        (delta, opened)
    }
}

fn last_non_blank(lines: &[&str], start: usize, mut end: usize) -> usize {
    while end > start && lines[end].trim().is_empty() {
        end -= 1;
    }
    end
}
