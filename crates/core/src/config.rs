use crate::models::FileKind;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to build glob pattern: {0}")]
    GlobError(#[from] globset::Error),
    #[error("Failed to parse gitignore: {0}")]
    GitignoreError(#[from] ignore::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Dialect markers and parse limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Lines past this count are dropped before parsing
    pub max_lines: usize,
    /// Number of blocks a structured file must contain
    pub num_blocks: usize,
    pub preamble_marker: String,
    pub block_marker: String,
    pub sub_block_marker: String,
    /// Blocks without sub-blocks start folded
    pub fold_blocks: bool,
    pub fold_sub_blocks: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_lines: 100_000,
            num_blocks: 6,
            preamble_marker: "/*@".to_string(),
            block_marker: "//@block".to_string(),
            sub_block_marker: "//@sub".to_string(),
            fold_blocks: true,
            fold_sub_blocks: true,
        }
    }
}

impl ParseConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lines == 0 {
            return Err(ConfigError::Invalid("max_lines must be positive".into()));
        }
        if self.num_blocks == 0 {
            return Err(ConfigError::Invalid("num_blocks must be positive".into()));
        }
        for (key, marker) in [
            ("preamble_marker", &self.preamble_marker),
            ("block_marker", &self.block_marker),
            ("sub_block_marker", &self.sub_block_marker),
        ] {
            if marker.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }
        if self.block_marker.starts_with(&self.sub_block_marker)
            || self.sub_block_marker.starts_with(&self.block_marker)
        {
            return Err(ConfigError::Invalid(
                "block_marker and sub_block_marker must not prefix each other".into(),
            ));
        }
        Ok(())
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_num_blocks(mut self, num_blocks: usize) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    pub fn with_markers(
        mut self,
        preamble: impl Into<String>,
        block: impl Into<String>,
        sub_block: impl Into<String>,
    ) -> Self {
        self.preamble_marker = preamble.into();
        self.block_marker = block.into();
        self.sub_block_marker = sub_block.into();
        self
    }

    pub fn with_fold_blocks(mut self, fold: bool) -> Self {
        self.fold_blocks = fold;
        self
    }

    pub fn with_fold_sub_blocks(mut self, fold: bool) -> Self {
        self.fold_sub_blocks = fold;
        self
    }
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,
    /// Restrict to sources or headers
    pub kind_filter: Option<Vec<FileKind>>,
    /// Additional ignore patterns (glob style)
    pub ignore_patterns: Vec<String>,
    /// Custom ignore file path
    pub ignore_file: Option<PathBuf>,
    /// Number of threads (0 = auto)
    pub threads: usize,
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
    pub parse: ParseConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            kind_filter: None,
            ignore_patterns: vec![],
            ignore_file: None,
            threads: 0,
            max_file_size: 4 * 1024 * 1024,
            parse: ParseConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_kind_filter(mut self, kinds: Vec<FileKind>) -> Self {
        self.kind_filter = Some(kinds);
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_parse_config(mut self, parse: ParseConfig) -> Self {
        self.parse = parse;
        self
    }
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    gitignore: Option<Gitignore>,
    custom_globs: GlobSet,
    default_ignores: GlobSet,
}

impl IgnoreFilter {
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore_path = config
            .ignore_file
            .clone()
            .unwrap_or_else(|| config.root.join(".gitignore"));
        let gitignore = if gitignore_path.exists() {
            let mut builder = GitignoreBuilder::new(&config.root);
            if let Some(err) = builder.add(&gitignore_path) {
                return Err(err.into());
            }
            Some(builder.build()?)
        } else {
            None
        };

        let mut custom_builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            custom_builder.add(Glob::new(pattern)?);
        }
        let custom_globs = custom_builder.build()?;

        let mut default_builder = GlobSetBuilder::new();
        for pattern in [
            "**/.git/**",
            "**/target/**",
            "**/build/**",
            "**/dist/**",
            "**/CMakeFiles/**",
            "**/.DS_Store",
        ] {
            default_builder.add(Glob::new(pattern)?);
        }
        let default_ignores = default_builder.build()?;

        Ok(Self {
            gitignore,
            custom_globs,
            default_ignores,
        })
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if self.default_ignores.is_match(&*path_str) || self.custom_globs.is_match(&*path_str) {
            return true;
        }

        match self.gitignore {
            Some(ref gi) => gi.matched(path, is_dir).is_ignore(),
            None => false,
        }
    }

    /// The file kind for `path` if it passes the kind filter
    pub fn accepts(&self, path: &Path, filter: &Option<Vec<FileKind>>) -> Option<FileKind> {
        let ext = path.extension()?.to_string_lossy();
        let kind = FileKind::from_extension(&ext)?;
        match filter {
            Some(kinds) if !kinds.contains(&kind) => None,
            _ => Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.kind_filter.is_none());
        assert_eq!(config.parse.num_blocks, 6);
        assert_eq!(config.parse.block_marker, "//@block");
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(PathBuf::from("/test"))
            .with_kind_filter(vec![FileKind::Header])
            .with_ignore_patterns(vec!["*.gen.*".to_string()])
            .with_threads(4)
            .with_parse_config(ParseConfig::default().with_num_blocks(3));

        assert_eq!(config.root, PathBuf::from("/test"));
        assert!(config.kind_filter.is_some());
        assert_eq!(config.threads, 4);
        assert_eq!(config.parse.num_blocks, 3);
    }

    #[test]
    fn test_parse_config_from_toml() {
        let config = ParseConfig::from_toml_str("num_blocks = 4\nblock_marker = \"//#\"\n").unwrap();
        assert_eq!(config.num_blocks, 4);
        assert_eq!(config.block_marker, "//#");
        assert_eq!(config.max_lines, 100_000);
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        assert!(matches!(
            ParseConfig::from_toml_str("blocks = 4"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_parse_config_rejects_bad_values() {
        assert!(matches!(
            ParseConfig::from_toml_str("num_blocks = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(ParseConfig::default()
            .with_markers("/*@", "//@", "//@sub")
            .validate()
            .is_err());
    }

    #[test]
    fn test_ignore_filter_defaults() {
        let config = ScanConfig::new(PathBuf::from("/nonexistent-root"));
        let filter = IgnoreFilter::new(&config).unwrap();
        assert!(filter.should_ignore(Path::new("/p/target/debug/x.cpp"), false));
        assert!(!filter.should_ignore(Path::new("/p/src/x.cpp"), false));
        assert_eq!(
            filter.accepts(Path::new("a.hpp"), &None),
            Some(FileKind::Header)
        );
        assert_eq!(
            filter.accepts(Path::new("a.cpp"), &Some(vec![FileKind::Header])),
            None
        );
        assert_eq!(filter.accepts(Path::new("a.py"), &None), None);
    }
}
