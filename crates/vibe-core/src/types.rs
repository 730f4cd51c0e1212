use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source language detected from a file extension.
///
/// # Examples
///
/// ```
/// use vibe_core::Language;
///
/// assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
/// assert_eq!(Language::from_extension("py"), Language::Python);
/// assert_eq!(Language::from_extension("rb"), Language::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Swift,
    Python,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" => Language::JavaScript,
            "swift" => Language::Swift,
            "py" => Language::Python,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Swift => "swift",
            Language::Python => "python",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typescript" => Ok(Language::TypeScript),
            "javascript" => Ok(Language::JavaScript),
            "swift" => Ok(Language::Swift),
            "python" => Ok(Language::Python),
            "unknown" => Ok(Language::Unknown),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Kind of declaration a chunk was extracted from.
///
/// The `File` kind marks whole-file fallback chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    ArrowFunction,
    Class,
    Interface,
    Component,
    Hook,
    ExportDefault,
    Struct,
    Protocol,
    Extension,
    Enum,
    Property,
    Method,
    File,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::ArrowFunction => "arrow_function",
            ChunkKind::Class => "class",
            ChunkKind::Interface => "interface",
            ChunkKind::Component => "component",
            ChunkKind::Hook => "hook",
            ChunkKind::ExportDefault => "export_default",
            ChunkKind::Struct => "struct",
            ChunkKind::Protocol => "protocol",
            ChunkKind::Extension => "extension",
            ChunkKind::Enum => "enum",
            ChunkKind::Property => "property",
            ChunkKind::Method => "method",
            ChunkKind::File => "file",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "function" => ChunkKind::Function,
            "arrow_function" => ChunkKind::ArrowFunction,
            "class" => ChunkKind::Class,
            "interface" => ChunkKind::Interface,
            "component" => ChunkKind::Component,
            "hook" => ChunkKind::Hook,
            "export_default" => ChunkKind::ExportDefault,
            "struct" => ChunkKind::Struct,
            "protocol" => ChunkKind::Protocol,
            "extension" => ChunkKind::Extension,
            "enum" => ChunkKind::Enum,
            "property" => ChunkKind::Property,
            "method" => ChunkKind::Method,
            "file" => ChunkKind::File,
            other => return Err(format!("unknown chunk kind: {other}")),
        };
        Ok(kind)
    }
}

/// Classification of a registered UI component file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Component,
    Page,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Component => "component",
            ComponentKind::Page => "page",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a [`SearchResult`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Symbol,
    CodeChunk,
    Component,
}

/// Which search strategy produced a hit.
///
/// Serialized as the labels shown to users, e.g. `"symbol:exact"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "symbol:exact")]
    SymbolExact,
    #[serde(rename = "symbol:prefix")]
    SymbolPrefix,
    #[serde(rename = "symbol:contains")]
    SymbolContains,
    #[serde(rename = "symbol:case_insensitive")]
    SymbolCaseInsensitive,
    #[serde(rename = "fulltext")]
    FullText,
    #[serde(rename = "substring")]
    Substring,
    #[serde(rename = "component")]
    Component,
    #[serde(rename = "semantic")]
    Semantic,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::SymbolExact => "symbol:exact",
            MatchType::SymbolPrefix => "symbol:prefix",
            MatchType::SymbolContains => "symbol:contains",
            MatchType::SymbolCaseInsensitive => "symbol:case_insensitive",
            MatchType::FullText => "fulltext",
            MatchType::Substring => "substring",
            MatchType::Component => "component",
            MatchType::Semantic => "semantic",
        }
    }

    /// The ranking signal this match type feeds.
    pub fn signal(self) -> Signal {
        match self {
            MatchType::SymbolExact
            | MatchType::SymbolPrefix
            | MatchType::SymbolContains
            | MatchType::SymbolCaseInsensitive => Signal::Symbol,
            MatchType::FullText | MatchType::Substring | MatchType::Component => Signal::FullText,
            MatchType::Semantic => Signal::Semantic,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three independent ranking signals merged by hybrid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Semantic,
    Symbol,
    FullText,
}

/// Per-signal scores for one hybrid result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub semantic: f64,
    pub symbol: f64,
    pub fulltext: f64,
}

impl SignalScores {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Semantic => self.semantic,
            Signal::Symbol => self.symbol,
            Signal::FullText => self.fulltext,
        }
    }

    /// Keep the larger of the current and the new score for `signal`.
    pub fn raise(&mut self, signal: Signal, score: f64) {
        let slot = match signal {
            Signal::Semantic => &mut self.semantic,
            Signal::Symbol => &mut self.symbol,
            Signal::FullText => &mut self.fulltext,
        };
        if score > *slot {
            *slot = score;
        }
    }

    /// Number of signals with a non-zero score.
    pub fn matched(&self) -> usize {
        [self.semantic, self.symbol, self.fulltext]
            .iter()
            .filter(|s| **s > 0.0)
            .count()
    }
}

/// A single search hit returned by any of the search strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Symbol, code chunk or component.
    #[serde(rename = "type")]
    pub result_type: ResultType,
    /// Symbol or component name, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Project-relative file path.
    pub file_path: String,
    /// 1-indexed start line. Components have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// Chunk kind, symbol type or component type.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Short excerpt of the matched content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub score: f64,
    pub match_types: Vec<MatchType>,
    /// Per-signal scores, present on hybrid results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<SignalScores>,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use vibe_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension() {
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("jsx"), Language::JavaScript);
        assert_eq!(Language::from_extension("swift"), Language::Swift);
        assert_eq!(Language::from_extension("go"), Language::Unknown);
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
    }

    #[test]
    fn chunk_kind_round_trips_through_str() {
        for kind in [ChunkKind::ArrowFunction, ChunkKind::ExportDefault, ChunkKind::File] {
            assert_eq!(kind.as_str().parse::<ChunkKind>().unwrap(), kind);
        }
        assert!("module".parse::<ChunkKind>().is_err());
    }

    #[test]
    fn match_type_serializes_as_label() {
        let json = serde_json::to_string(&MatchType::SymbolPrefix).unwrap();
        assert_eq!(json, "\"symbol:prefix\"");
        assert_eq!(MatchType::Substring.signal(), Signal::FullText);
        assert_eq!(MatchType::SymbolCaseInsensitive.signal(), Signal::Symbol);
    }

    #[test]
    fn signal_scores_keep_maximum() {
        let mut scores = SignalScores::default();
        scores.raise(Signal::Symbol, 0.5);
        scores.raise(Signal::Symbol, 0.8);
        scores.raise(Signal::Symbol, 0.4);
        assert_eq!(scores.symbol, 0.8);
        assert_eq!(scores.matched(), 1);
        scores.raise(Signal::FullText, 1.0);
        assert_eq!(scores.matched(), 2);
    }

    #[test]
    fn search_result_serializes_camel_case() {
        let result = SearchResult {
            result_type: ResultType::CodeChunk,
            name: Some("useAuth".into()),
            file_path: "src/hooks/useAuth.ts".into(),
            line: Some(3),
            end_line: Some(12),
            kind: "hook".into(),
            parent: None,
            language: Some(Language::TypeScript),
            preview: None,
            score: 1.0,
            match_types: vec![MatchType::FullText],
            breakdown: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "code_chunk");
        assert_eq!(json["filePath"], "src/hooks/useAuth.ts");
        assert_eq!(json["endLine"], 12);
        assert_eq!(json["matchTypes"][0], "fulltext");
        assert!(json.get("parent").is_none());
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
