//! Declaration patterns for the heuristic chunkers.
//!
//! Patterns are matched in multi-line mode against the whole file. For the
//! bracket languages the order of each list is the tie-break order when two
//! patterns start on the same line with the same extent, so the more specific
//! heuristics (hooks, components) come first.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use vibe_core::ChunkKind;

/// A regex that recognizes one kind of declaration and captures its name.
pub(crate) struct DeclPattern {
    pub kind: ChunkKind,
    pub regex: Regex,
}

impl DeclPattern {
    fn new(kind: ChunkKind, pattern: &str) -> Self {
        Self {
            kind,
            regex: Regex::new(pattern).expect("declaration pattern must compile"),
        }
    }

    /// The first capture group that participated in the match.
    pub fn name<'h>(caps: &Captures<'h>) -> Option<&'h str> {
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .find(|s| !s.is_empty())
    }
}

pub(crate) static TYPESCRIPT: LazyLock<Vec<DeclPattern>> = LazyLock::new(|| {
    vec![
        DeclPattern::new(
            ChunkKind::Hook,
            r"(?m)^(?:export[ \t]+)?(?:default[ \t]+)?(?:const|function)[ \t]+(use[A-Z]\w*)",
        ),
        DeclPattern::new(
            ChunkKind::Component,
            r"(?m)^(?:export[ \t]+)?(?:default[ \t]+)?function[ \t]+([A-Z]\w*)[ \t]*\(",
        ),
        DeclPattern::new(
            ChunkKind::Component,
            r"(?m)^(?:export[ \t]+)?const[ \t]+([A-Z]\w*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:React\.)?(?:memo|forwardRef)?[ \t]*\(?[ \t]*(?:async[ \t]*)?(?:\([^)]*\)|\w+)[ \t]*(?::[^=\n]+)?=>",
        ),
        DeclPattern::new(
            ChunkKind::Class,
            r"(?m)^(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+(\w+)",
        ),
        DeclPattern::new(
            ChunkKind::Interface,
            r"(?m)^(?:export[ \t]+)?(?:declare[ \t]+)?(?:interface|type)[ \t]+(\w+)",
        ),
        DeclPattern::new(
            ChunkKind::Function,
            r"(?m)^(?:export[ \t]+)?(?:async[ \t]+)?function\*?[ \t]+(\w+)",
        ),
        DeclPattern::new(
            ChunkKind::ArrowFunction,
            r"(?m)^(?:export[ \t]+)?(?:const|let|var)[ \t]+(\w+)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]*)?(?:\([^)]*\)|\w+)[ \t]*(?::[^=\n]+)?=>",
        ),
        DeclPattern::new(
            ChunkKind::ExportDefault,
            r"(?m)^export[ \t]+default[ \t]+(?:async[ \t]+)?(?:(?:function|class)\b[ \t]*\*?[ \t]*)?(\w+)?",
        ),
    ]
});

const SWIFT_ACCESS: &str = r"(?:@\w+[ \t]+)*(?:(?:public|private|internal|fileprivate|open|final)[ \t]+)*";

pub(crate) static SWIFT: LazyLock<Vec<DeclPattern>> = LazyLock::new(|| {
    vec![
        DeclPattern::new(
            ChunkKind::Struct,
            &format!(r"(?m)^{SWIFT_ACCESS}struct[ \t]+(\w+)"),
        ),
        DeclPattern::new(
            ChunkKind::Class,
            &format!(r"(?m)^{SWIFT_ACCESS}class[ \t]+(\w+)"),
        ),
        DeclPattern::new(
            ChunkKind::Protocol,
            &format!(r"(?m)^{SWIFT_ACCESS}protocol[ \t]+(\w+)"),
        ),
        DeclPattern::new(
            ChunkKind::Extension,
            &format!(r"(?m)^{SWIFT_ACCESS}extension[ \t]+(\w+)"),
        ),
        DeclPattern::new(
            ChunkKind::Enum,
            &format!(r"(?m)^{SWIFT_ACCESS}(?:indirect[ \t]+)?enum[ \t]+(\w+)"),
        ),
        DeclPattern::new(
            ChunkKind::Function,
            r"(?m)^[ \t]*(?:@\w+[ \t]+)*(?:(?:public|private|internal|fileprivate|open|static|class|override|final|mutating|nonisolated)[ \t]+)*func[ \t]+(\w+)",
        ),
        DeclPattern::new(
            ChunkKind::Property,
            r"(?m)^[ \t]*(?:@\w+[ \t]+)*(?:(?:public|private|internal|fileprivate|static|lazy|weak)[ \t]+)*(?:var|let)[ \t]+(\w+)[ \t]*:",
        ),
    ]
});

pub(crate) static PYTHON_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*class[ \t]+(\w+)").expect("class pattern must compile")
});

pub(crate) static PYTHON_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+(\w+)[ \t]*\(")
        .expect("def pattern must compile")
});

/// Every name any of `patterns` matches in `content`, first occurrence first.
pub(crate) fn extract_symbols<'a>(
    patterns: impl IntoIterator<Item = &'a Regex>,
    content: &str,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for regex in patterns {
        for caps in regex.captures_iter(content) {
            if let Some(name) = DeclPattern::name(&caps) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}
