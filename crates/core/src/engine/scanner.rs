use crate::config::{IgnoreFilter, ScanConfig};
use crate::models::{FileKind, FileOutline, OutlineMap, OutlineStats, ScanMetadata};
use crate::parsers::{create_parser, CodeBase, CodeParser};
use crate::text::TextPage;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("Parser error: {0}")]
    ParserError(#[from] crate::parsers::ParserError),
    #[error("Unsupported file: {}", .0.display())]
    Unsupported(PathBuf),
}

/// Walks a project and reduces every C/C++ file to its outline
pub struct OutlineScanner {
    config: ScanConfig,
    ignore_filter: IgnoreFilter,
    parser: Box<dyn CodeParser>,
}

impl OutlineScanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        let ignore_filter = IgnoreFilter::new(&config)?;
        let parser = create_parser(FileKind::Source, &config.parse)?;
        Ok(Self {
            config,
            ignore_filter,
            parser,
        })
    }

    /// Scan the project and return the outline map
    pub fn scan(&self) -> Result<OutlineMap, ScanError> {
        let start = Instant::now();

        let source_files = self.find_source_files();
        debug!(count = source_files.len(), root = %self.config.root.display(), "scanning");

        // Files parse independently; each parse stays on one thread
        let files: Vec<FileOutline> = if self.config.threads == 1 {
            source_files
                .iter()
                .map(|(path, kind)| self.outline_file(path, *kind))
                .collect()
        } else {
            let pool = if self.config.threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.threads)
                    .build()
                    .ok()
            } else {
                None
            };

            match pool {
                Some(pool) => pool.install(|| {
                    source_files
                        .par_iter()
                        .map(|(path, kind)| self.outline_file(path, *kind))
                        .collect()
                }),
                None => source_files
                    .par_iter()
                    .map(|(path, kind)| self.outline_file(path, *kind))
                    .collect(),
            }
        };

        let mut stats = OutlineStats::default();
        for file in &files {
            stats.add_file(file);
        }

        let duration = start.elapsed();
        let metadata = ScanMetadata {
            scan_duration_ms: duration.as_millis() as u64,
            files_per_second: if duration.as_secs_f64() > 0.0 {
                files.len() as f64 / duration.as_secs_f64()
            } else {
                0.0
            },
            ..ScanMetadata::default()
        };

        Ok(OutlineMap {
            root: self.config.root.clone(),
            files,
            stats,
            metadata,
        })
    }

    /// Parse one file into a code base
    pub fn parse_file(&self, path: &Path) -> Result<CodeBase, ScanError> {
        let source = fs::read_to_string(path)?;
        Ok(self.parser.parse(&TextPage::from_source(&source)))
    }

    /// Outline a single file, whether or not it lies under the root
    pub fn scan_file(&self, path: &Path) -> Result<FileOutline, ScanError> {
        let kind = path
            .extension()
            .and_then(|e| FileKind::from_extension(&e.to_string_lossy()))
            .ok_or_else(|| ScanError::Unsupported(path.to_path_buf()))?;
        Ok(self.outline_file(path, kind))
    }

    /// Find all C/C++ files that pass the ignore and kind filters
    fn find_source_files(&self) -> Vec<(PathBuf, FileKind)> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.config.root).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !self
                    .ignore_filter
                    .should_ignore(e.path(), e.file_type().is_dir())
        });

        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if let Some(kind) = self.ignore_filter.accepts(path, &self.config.kind_filter) {
                files.push((path.to_path_buf(), kind));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    fn outline_file(&self, path: &Path, kind: FileKind) -> FileOutline {
        let relative_path = path
            .strip_prefix(&self.config.root)
            .unwrap_or(path)
            .to_path_buf();
        let mut outline = FileOutline {
            path: relative_path,
            absolute_path: path.to_path_buf(),
            kind,
            dialect: Default::default(),
            block_count: 0,
            line_count: 0,
            symbols: vec![],
            diagnostics: vec![],
            parsed: false,
            error: None,
        };

        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_size => {
                outline.error = Some(format!("file exceeds {} bytes", self.config.max_file_size));
                return outline;
            }
            Ok(_) => {}
            Err(e) => {
                outline.error = Some(e.to_string());
                return outline;
            }
        }

        let code = match self.parse_file(path) {
            Ok(code) => code,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read");
                outline.error = Some(e.to_string());
                return outline;
            }
        };

        outline.dialect = code.dialect();
        outline.block_count = code.block_count();
        outline.line_count = code.line_count();
        outline.symbols = code.symbols().entries();
        outline.diagnostics = code.diagnostics().iter().map(ToString::to_string).collect();
        outline.parsed = true;
        outline
    }
}
