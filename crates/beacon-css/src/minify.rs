//! CSS minification

use beacon_core::{Error, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const INLINE_SOURCE: &str = "<stylesheet>";

/// Minify a stylesheet
///
/// Structural minification: comments and redundant whitespace go, values are
/// shortened, empty rules are dropped and adjacent rules or `@media` blocks
/// with the same selector or query are merged.
pub fn minify(css: &str) -> Result<String> {
    minify_source(css, INLINE_SOURCE)
}

fn minify_source(css: &str, source: &str) -> Result<String> {
    let mut sheet = parse(css, source)?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| Error::css(source, e.to_string()))?;
    print(&sheet, source)
}

/// Parse leniently; invalid declarations are skipped rather than fatal
pub(crate) fn parse<'i>(css: &'i str, source: &str) -> Result<StyleSheet<'i>> {
    let options = ParserOptions {
        filename: source.to_string(),
        error_recovery: true,
        ..ParserOptions::default()
    };
    StyleSheet::parse(css, options).map_err(|e| Error::css(source, e.to_string()))
}

/// Serialize without any whitespace
pub(crate) fn print(sheet: &StyleSheet<'_>, source: &str) -> Result<String> {
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| Error::css(source, e.to_string()))?;
    Ok(printed.code)
}

/// One input/output pair for [`minify_targets`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinifyTarget {
    /// Source stylesheet
    pub input: PathBuf,
    /// Destination; may equal `input`
    pub output: PathBuf,
}

impl MinifyTarget {
    /// Create a target
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Size report for one minified file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyReport {
    /// Source stylesheet
    pub input: PathBuf,
    /// Written file
    pub output: PathBuf,
    /// Size before minification
    pub before_bytes: u64,
    /// Size after minification
    pub after_bytes: u64,
}

impl MinifyReport {
    /// Percentage of bytes saved
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.before_bytes, self.after_bytes)
    }
}

/// Result of a batch minification
#[derive(Debug, Clone, Default)]
pub struct MinifySummary {
    /// Successfully minified files
    pub reports: Vec<MinifyReport>,
    /// Files that failed, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl MinifySummary {
    /// Total size of all successful inputs
    pub fn total_before(&self) -> u64 {
        self.reports.iter().map(|r| r.before_bytes).sum()
    }

    /// Total size of all successful outputs
    pub fn total_after(&self) -> u64 {
        self.reports.iter().map(|r| r.after_bytes).sum()
    }

    /// Overall percentage of bytes saved
    pub fn total_reduction_percent(&self) -> f64 {
        reduction_percent(self.total_before(), self.total_after())
    }
}

pub(crate) fn reduction_percent(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) / before as f64 * 100.0
}

/// Minify `input` into `output`, creating missing parent directories
pub fn minify_file(input: &Path, output: &Path) -> Result<MinifyReport> {
    let css = fs::read_to_string(input)
        .map_err(|e| Error::css(input.display().to_string(), e.to_string()))?;
    let minified = minify_source(&css, &input.display().to_string())?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::css(output.display().to_string(), e.to_string()))?;
    }
    fs::write(output, &minified)
        .map_err(|e| Error::css(output.display().to_string(), e.to_string()))?;

    let report = MinifyReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        before_bytes: css.len() as u64,
        after_bytes: minified.len() as u64,
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        before_bytes = report.before_bytes,
        after_bytes = report.after_bytes,
        reduction = %format!("{:.2}%", report.reduction_percent()),
        "Minified stylesheet"
    );

    Ok(report)
}

/// Minify every target, resolving relative paths against `root`
///
/// A failing file is logged and recorded; the remaining targets still run.
pub fn minify_targets(targets: &[MinifyTarget], root: &Path) -> MinifySummary {
    let mut summary = MinifySummary::default();

    for target in targets {
        let input = root.join(&target.input);
        let output = root.join(&target.output);
        match minify_file(&input, &output) {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                warn!(input = %input.display(), error = %e, "Failed to minify stylesheet");
                summary.failures.push((input, e.to_string()));
            }
        }
    }

    info!(
        files = summary.reports.len(),
        failed = summary.failures.len(),
        total_before = summary.total_before(),
        total_after = summary.total_after(),
        reduction = %format!("{:.2}%", summary.total_reduction_percent()),
        "CSS minification complete"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_minify_basic() {
        let css = "/* theme */\n.a {\n  color : red ;\n}\n";
        assert_eq!(minify(css).unwrap(), ".a{color:red}");
    }

    #[test]
    fn test_minify_removes_empty_rules() {
        let css = ".empty { }\n@media print { .d { } }\n.kept { color: red }";
        assert_eq!(minify(css).unwrap(), ".kept{color:red}");
    }

    #[test]
    fn test_minify_selectors() {
        let css = "ul  >  li ,\n  .nav   a:hover { color: red }";
        assert_eq!(minify(css).unwrap(), "ul>li,.nav a:hover{color:red}");
    }

    #[test]
    fn test_minify_preserves_strings() {
        let css = r#"a[href="x  y"] > b { content : "a  ;  b" ; }"#;
        assert_eq!(
            minify(css).unwrap(),
            r#"a[href="x  y"]>b{content:"a  ;  b"}"#
        );
    }

    #[test]
    fn test_minify_keeps_non_ascii_identifiers() {
        let css = ".a\u{a0}b { color: red }";
        assert_eq!(minify(css).unwrap(), ".a\u{a0}b{color:red}");
    }

    #[test]
    fn test_minify_keeps_descendant_combinator_in_nested_rules() {
        let css = ".card { color: red; & .title :hover { color: red } }";
        let minified = minify(css).unwrap();
        assert!(minified.contains(".title :hover"), "{minified}");
        assert!(!minified.contains(".title:hover"), "{minified}");
    }

    #[test]
    fn test_minify_merges_duplicates() {
        assert_eq!(minify(".a{color:red}.a{color:red}").unwrap(), ".a{color:red}");
        assert_eq!(
            minify("@media print{.b{color:red}}@media print{.b{color:red}}").unwrap(),
            "@media print{.b{color:red}}"
        );
    }

    #[test]
    fn test_minify_keeps_important() {
        let minified = minify(".x { color: red !important; }").unwrap();
        assert!(minified.starts_with(".x{color:red"), "{minified}");
        assert!(minified.contains("!important"), "{minified}");
    }

    #[test]
    fn test_minify_empty_input() {
        assert_eq!(minify("").unwrap(), "");
        assert_eq!(minify("/* only a comment */").unwrap(), "");
    }

    #[test]
    fn test_minify_file_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("style.css");
        fs::write(&input, ".a {\n  color: red;\n}\n").unwrap();
        let output = dir.path().join("out/nested/style.min.css");

        let report = minify_file(&input, &output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), ".a{color:red}");
        assert_eq!(report.before_bytes, 21);
        assert_eq!(report.after_bytes, 13);
        assert!(report.reduction_percent() > 30.0);
    }

    #[test]
    fn test_minify_targets_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/style.css"), "b { margin : 0 }").unwrap();

        let targets = vec![
            MinifyTarget::new("css/missing.css", "css/missing.min.css"),
            MinifyTarget::new("css/style.css", "css/style.min.css"),
        ];
        let summary = minify_targets(&targets, dir.path());

        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].0.ends_with("css/missing.css"));
        assert_eq!(
            fs::read_to_string(dir.path().join("css/style.min.css")).unwrap(),
            "b{margin:0}"
        );
        assert_eq!(summary.total_before(), 16);
        assert_eq!(summary.total_after(), 11);
    }

    #[test]
    fn test_reduction_percent_of_empty_file() {
        assert_eq!(reduction_percent(0, 0), 0.0);
        assert_eq!(reduction_percent(200, 50), 75.0);
    }
}
