//! Display formatting for CLI output
//!
//! Rendered manifests go to stdout; everything meant for a human goes to
//! stderr so output can be piped straight into `kubectl`.

use argorender_engine::{DetectedSource, Warning};
use console::style;

/// Print render warnings to stderr, parse failures before duplicates
pub fn display_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }

    for warning in warnings {
        let label = if warning.is_duplicate() {
            style("duplicate").yellow()
        } else {
            style("warning").yellow().bold()
        };
        eprintln!("{} {}", label, warning);
    }

    let duplicates = warnings.iter().filter(|w| w.is_duplicate()).count();
    let unparsed = warnings.len() - duplicates;
    eprintln!(
        "{} {}, {}",
        style("⚠").yellow(),
        pluralize(unparsed, "unparsable document", "unparsable documents"),
        pluralize(duplicates, "duplicate", "duplicates"),
    );
}

/// One line per detected source, 1-based like the render warnings
pub fn format_detected(source: &DetectedSource) -> String {
    format!(
        "source {}: {} ({})",
        source.index + 1,
        source.kind.source_type(),
        source.source_dir.display()
    )
}

/// Pluralize a word based on count
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argorender_core::{DirectorySource, HelmSource, SourceKind};
    use std::path::PathBuf;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "duplicate", "duplicates"), "0 duplicates");
        assert_eq!(pluralize(1, "duplicate", "duplicates"), "1 duplicate");
        assert_eq!(pluralize(3, "duplicate", "duplicates"), "3 duplicates");
    }

    #[test]
    fn test_format_detected() {
        let helm = DetectedSource {
            index: 0,
            kind: SourceKind::Helm(HelmSource::default()),
            source_dir: PathBuf::from("/repo/charts/web"),
        };
        assert_eq!(format_detected(&helm), "source 1: Helm (/repo/charts/web)");

        let dir = DetectedSource {
            index: 2,
            kind: SourceKind::Directory(DirectorySource::default()),
            source_dir: PathBuf::from("/repo/manifests"),
        };
        assert_eq!(format_detected(&dir), "source 3: Directory (/repo/manifests)");
    }
}
