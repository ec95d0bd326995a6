//! Plain directories of YAML/JSON manifests

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use argorender_core::DirectorySource;

use super::{RenderContext, Strategy};
use crate::error::{RenderError, Result};
use crate::manifest::{split_raw, RawManifest};

const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Renders Directory sources by reading files
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryStrategy;

#[async_trait]
impl Strategy<DirectorySource> for DirectoryStrategy {
    async fn render(
        &self,
        ctx: &RenderContext<'_>,
        bundle: &DirectorySource,
    ) -> Result<Vec<RawManifest>> {
        // Without an explicit bundle the whole tree is read
        let recurse = match &ctx.source.directory {
            Some(_) => bundle.recurse.unwrap_or(false),
            None => true,
        };
        let filter = FileFilter::new(bundle)?;

        tracing::debug!(dir = %ctx.source_dir.display(), recurse, "reading manifest directory");

        let mut manifests = Vec::new();
        for path in manifest_files(&ctx.source_dir, recurse, &filter)? {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| RenderError::io(&path, e))?;
            let docs = split_raw(&content, ctx.index, manifests.len());
            manifests.extend(docs);
        }

        Ok(manifests)
    }
}

/// Include/exclude globs, matched against paths relative to the source directory
#[derive(Debug, Default)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl FileFilter {
    pub fn new(bundle: &DirectorySource) -> Result<Self> {
        Ok(Self {
            include: compile("directory.include", bundle.include.as_deref())?,
            exclude: compile("directory.exclude", bundle.exclude.as_deref())?,
        })
    }

    pub fn accepts(&self, relative: &Path) -> bool {
        let matches = |patterns: &[Pattern]| {
            patterns
                .iter()
                .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
        };
        (self.include.is_empty() || matches(&self.include))
            && (self.exclude.is_empty() || !matches(&self.exclude))
    }
}

fn compile(option: &str, pattern: Option<&str>) -> Result<Vec<Pattern>> {
    let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
        return Ok(Vec::new());
    };
    expand_braces(pattern)
        .iter()
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| RenderError::invalid_option(option, format!("'{}': {}", pattern, e)))
        })
        .collect()
}

/// Expand `{a,b}` alternation into separate patterns
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{}{}{}", prefix, &pattern[w[0] + 1..w[1]], suffix)))
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MANIFEST_EXTENSIONS
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
}

/// Manifest files under `dir`, sorted by name at each level
pub fn manifest_files(
    dir: &Path,
    recurse: bool,
    filter: &FileFilter,
) -> Result<Vec<std::path::PathBuf>> {
    let mut walker = WalkDir::new(dir).sort_by_file_name().follow_links(true);
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            RenderError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() || !is_manifest(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        if filter.accepts(relative) {
            tracing::trace!(file = %relative.display(), "including manifest file");
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
