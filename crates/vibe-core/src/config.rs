use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VibeError;
use crate::types::ComponentKind;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Top-level configuration loaded from `.vibe-sync.toml`.
///
/// Every section is optional; missing fields fall back to defaults.
///
/// # Examples
///
/// ```
/// use vibe_core::VibeConfig;
///
/// let config = VibeConfig::default();
/// assert_eq!(config.embedding.model, "nomic-embed-text");
/// assert_eq!(config.search.weights.symbol, 0.35);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VibeConfig {
    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Ranking settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// File discovery and chunking settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

impl VibeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Io`] if the file cannot be read,
    /// [`VibeError::Toml`] if the content is not valid TOML, or
    /// [`VibeError::Config`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, VibeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use vibe_core::VibeConfig;
    ///
    /// let toml = r#"
    /// [search.weights]
    /// semantic = 0.5
    /// symbol = 0.3
    /// fulltext = 0.2
    /// "#;
    /// let config = VibeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.search.weights.semantic, 0.5);
    ///
    /// let bad = "[search.weights]\nsemantic = 0.9\n";
    /// assert!(VibeConfig::from_toml(bad).is_err());
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VibeError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`VibeError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), VibeError> {
        self.search.weights.validate()?;
        if self.search.default_limit == 0 {
            return Err(VibeError::Config("search.default_limit must be > 0".into()));
        }
        if self.sync.block_scan_lines == 0 {
            return Err(VibeError::Config("sync.block_scan_lines must be > 0".into()));
        }
        if self.embedding.max_chars == 0 {
            return Err(VibeError::Config("embedding.max_chars must be > 0".into()));
        }
        Ok(())
    }
}

/// Ollama embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Timeout for a single embedding request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for the availability probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Input text is truncated to this many characters before embedding.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    2
}

fn default_max_chars() -> usize {
    8000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            max_chars: default_max_chars(),
        }
    }
}

/// Hybrid ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub weights: SearchWeights,
    /// Result limit used when a caller does not pass one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

fn default_limit() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weights: SearchWeights::default(),
            default_limit: default_limit(),
        }
    }
}

/// Weights applied to each signal by hybrid search. Must sum to 1.0.
///
/// # Examples
///
/// ```
/// use vibe_core::SearchWeights;
///
/// assert!(SearchWeights::default().validate().is_ok());
/// let skewed = SearchWeights { semantic: 0.5, symbol: 0.5, fulltext: 0.5 };
/// assert!(skewed.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
    #[serde(default = "default_semantic_weight")]
    pub semantic: f64,
    #[serde(default = "default_symbol_weight")]
    pub symbol: f64,
    #[serde(default = "default_fulltext_weight")]
    pub fulltext: f64,
}

fn default_semantic_weight() -> f64 {
    0.4
}

fn default_symbol_weight() -> f64 {
    0.35
}

fn default_fulltext_weight() -> f64 {
    0.25
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            semantic: default_semantic_weight(),
            symbol: default_symbol_weight(),
            fulltext: default_fulltext_weight(),
        }
    }
}

impl SearchWeights {
    /// # Errors
    ///
    /// Returns [`VibeError::Config`] if a weight is negative or not finite,
    /// or if the weights do not sum to 1.0.
    pub fn validate(&self) -> Result<(), VibeError> {
        for (name, value) in [
            ("semantic", self.semantic),
            ("symbol", self.symbol),
            ("fulltext", self.fulltext),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(VibeError::Config(format!(
                    "search weight `{name}` must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = self.semantic + self.symbol + self.fulltext;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(VibeError::Config(format!(
                "search weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// A glob that registers matching files as components of a given kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPattern {
    pub pattern: String,
    pub kind: ComponentKind,
}

/// File discovery and chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Glob patterns, relative to the project root, of files to index.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    /// Glob patterns of files registered as components or pages.
    #[serde(default = "default_component_patterns")]
    pub component_patterns: Vec<ComponentPattern>,
    /// Directory names skipped wherever they appear in a path.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Characters of chunk content included in the embedding text.
    #[serde(default = "default_embed_chars")]
    pub embed_chars: usize,
    /// Characters kept by the whole-file fallback chunk.
    #[serde(default = "default_fallback_max_chars")]
    pub fallback_max_chars: usize,
    /// Maximum lines scanned forward when looking for a block end.
    #[serde(default = "default_block_scan_lines")]
    pub block_scan_lines: usize,
    /// Remove file index entries for files that no longer match.
    #[serde(default = "default_true")]
    pub prune_stale_files: bool,
}

fn default_patterns() -> Vec<String> {
    [
        "src/**/*.ts",
        "src/**/*.tsx",
        "src/**/*.js",
        "src/**/*.jsx",
        "app/**/*.ts",
        "app/**/*.tsx",
        "components/**/*.tsx",
        "lib/**/*.ts",
        "hooks/**/*.ts",
        "utils/**/*.ts",
        "**/*.swift",
        "**/*.py",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_component_patterns() -> Vec<ComponentPattern> {
    [
        ("src/components/**/*.tsx", ComponentKind::Component),
        ("src/pages/**/*.tsx", ComponentKind::Page),
        ("src/app/**/*.tsx", ComponentKind::Page),
        ("components/**/*.tsx", ComponentKind::Component),
    ]
    .into_iter()
    .map(|(pattern, kind)| ComponentPattern {
        pattern: pattern.into(),
        kind,
    })
    .collect()
}

fn default_exclude_dirs() -> Vec<String> {
    ["node_modules", ".git", "__pycache__", "dist", "build"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_embed_chars() -> usize {
    2000
}

fn default_fallback_max_chars() -> usize {
    4000
}

fn default_block_scan_lines() -> usize {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            component_patterns: default_component_patterns(),
            exclude_dirs: default_exclude_dirs(),
            embed_chars: default_embed_chars(),
            fallback_max_chars: default_fallback_max_chars(),
            block_scan_lines: default_block_scan_lines(),
            prune_stale_files: default_true(),
        }
    }
}
