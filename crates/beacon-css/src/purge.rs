//! Unused selector removal
//!
//! Scans content files for every identifier-like token and drops selectors
//! whose class and id names never appear, unless safelisted.

use crate::minify::{parse, print, reduction_percent};
use beacon_core::{Error, Result};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::{Component, Selector};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Purge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeConfig {
    /// Glob patterns for files whose tokens keep selectors alive
    #[serde(default = "default_content")]
    pub content: Vec<String>,

    /// Stylesheets to purge
    #[serde(default = "default_css")]
    pub css: Vec<PathBuf>,

    /// Directory receiving the purged stylesheets
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Class or id names always kept
    #[serde(default = "default_safelist")]
    pub safelist: Vec<String>,

    /// Regular expressions; matching names are always kept
    #[serde(default = "default_safelist_patterns")]
    pub safelist_patterns: Vec<String>,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            css: default_css(),
            output: default_output(),
            safelist: default_safelist(),
            safelist_patterns: default_safelist_patterns(),
        }
    }
}

fn default_content() -> Vec<String> {
    vec!["*.html".to_string()]
}

fn default_css() -> Vec<PathBuf> {
    vec![
        PathBuf::from("css/bootstrap.min.css"),
        PathBuf::from("lib/animate/animate.min.css"),
    ]
}

fn default_output() -> PathBuf {
    PathBuf::from("css/optimized")
}

fn default_safelist() -> Vec<String> {
    [
        "active",
        "show",
        "animated",
        "slideInDown",
        "slideInLeft",
        "slideInRight",
        "fadeInUp",
        "wow",
        "collapse",
        "collapsing",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_safelist_patterns() -> Vec<String> {
    [
        "^owl-", "^carousel", "^animated", "^fade", "^slide", "^wow", "^modal", "^collapse",
        "^show",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Names that survive purging regardless of content
#[derive(Debug, Clone, Default)]
pub struct Safelist {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl Safelist {
    /// Compile exact names and regex patterns
    pub fn new<S: AsRef<str>>(exact: &[S], patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    Error::Config(format!("Invalid safelist pattern '{}': {e}", p.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            exact: exact.iter().map(|s| s.as_ref().to_string()).collect(),
            patterns,
        })
    }

    /// Whether `name` is safelisted
    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|p| p.is_match(name))
    }
}

/// Outcome of purging one stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Source stylesheet
    pub file: PathBuf,
    /// Written file
    pub output: PathBuf,
    /// Original size
    pub original_bytes: u64,
    /// Purged size
    pub purged_bytes: u64,
}

impl PurgeReport {
    /// Percentage of bytes removed
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.original_bytes, self.purged_bytes)
    }
}

/// Selector purger
#[derive(Debug)]
pub struct Purger {
    root: PathBuf,
    content: Vec<String>,
    safelist: Safelist,
    token: Regex,
}

impl Purger {
    /// Create a purger resolving content globs against `root`
    pub fn new(root: impl Into<PathBuf>, content: Vec<String>, safelist: Safelist) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            content,
            safelist,
            token: compile(r"[A-Za-z0-9_-]+")?,
        })
    }

    /// Create a purger from configuration
    pub fn from_config(config: &PurgeConfig, root: impl Into<PathBuf>) -> Result<Self> {
        let safelist = Safelist::new(config.safelist.as_slice(), config.safelist_patterns.as_slice())?;
        Self::new(root, config.content.clone(), safelist)
    }

    /// Gather every token from the content files
    pub fn collect_tokens(&self) -> Result<HashSet<String>> {
        let mut tokens = HashSet::new();

        for pattern in &self.content {
            let full = self.root.join(pattern);
            let full = full.to_string_lossy();
            let entries = glob::glob(&full)
                .map_err(|e| Error::Config(format!("Invalid content pattern '{pattern}': {e}")))?;

            for entry in entries {
                let path = entry.map_err(|e| Error::Io(e.into()))?;
                if !path.is_file() {
                    continue;
                }
                let text = fs::read_to_string(&path)?;
                let before = tokens.len();
                tokens.extend(self.token.find_iter(&text).map(|m| m.as_str().to_string()));
                debug!(
                    file = %path.display(),
                    new_tokens = tokens.len() - before,
                    "Scanned content file"
                );
            }
        }

        Ok(tokens)
    }

    /// Purge one stylesheet against a token set
    pub fn purge_css(&self, css: &str, tokens: &HashSet<String>) -> Result<String> {
        self.purge_source(css, "<stylesheet>", tokens)
    }

    fn purge_source(&self, css: &str, source: &str, tokens: &HashSet<String>) -> Result<String> {
        let mut sheet = parse(css, source)?;
        self.purge_rules(&mut sheet.rules, tokens);
        print(&sheet, source)
    }

    fn purge_rules(&self, rules: &mut CssRuleList<'_>, tokens: &HashSet<String>) {
        rules.0.retain_mut(|rule| match rule {
            CssRule::Style(style) => {
                style
                    .selectors
                    .0
                    .retain(|selector| self.is_used(selector, tokens));
                if style.selectors.0.is_empty() {
                    return false;
                }
                self.purge_rules(&mut style.rules, tokens);
                true
            }
            CssRule::Media(media) => {
                self.purge_rules(&mut media.rules, tokens);
                !media.rules.0.is_empty()
            }
            CssRule::Supports(supports) => {
                self.purge_rules(&mut supports.rules, tokens);
                !supports.rules.0.is_empty()
            }
            _ => true,
        });
    }

    /// Whether every class and id in `selector` is used or safelisted
    ///
    /// Names under `:not()` never keep a selector alive; `:is()` and
    /// `:where()` need one used alternative.
    pub fn is_used(&self, selector: &Selector<'_>, tokens: &HashSet<String>) -> bool {
        selector
            .iter_raw_match_order()
            .all(|component| match component {
                Component::Class(name) | Component::ID(name) => {
                    let name: &str = &name.0;
                    tokens.contains(name) || self.safelist.contains(name)
                }
                Component::Is(alternatives) | Component::Where(alternatives) => alternatives
                    .iter()
                    .any(|alternative| self.is_used(alternative, tokens)),
                _ => true,
            })
    }

    /// Purge `css_files` (relative to the root) into `output_dir`
    ///
    /// Each result is written under its original file name.
    pub fn purge_to_dir(&self, css_files: &[PathBuf], output_dir: &Path) -> Result<Vec<PurgeReport>> {
        let tokens = self.collect_tokens()?;
        let output_dir = self.root.join(output_dir);
        fs::create_dir_all(&output_dir)
            .map_err(|e| Error::css(output_dir.display().to_string(), e.to_string()))?;

        let mut reports = Vec::with_capacity(css_files.len());
        for file in css_files {
            let input = self.root.join(file);
            let css = fs::read_to_string(&input)
                .map_err(|e| Error::css(input.display().to_string(), e.to_string()))?;
            let purged = self.purge_source(&css, &input.display().to_string(), &tokens)?;

            let file_name = input
                .file_name()
                .ok_or_else(|| Error::css(input.display().to_string(), "not a file path"))?;
            let output = output_dir.join(file_name);
            fs::write(&output, &purged)
                .map_err(|e| Error::css(output.display().to_string(), e.to_string()))?;

            let report = PurgeReport {
                file: input,
                output,
                original_bytes: css.len() as u64,
                purged_bytes: purged.len() as u64,
            };
            info!(
                file = %report.file.display(),
                output = %report.output.display(),
                original_bytes = report.original_bytes,
                purged_bytes = report.purged_bytes,
                reduction = %format!("{:.2}%", report.reduction_percent()),
                "Purged stylesheet"
            );
            reports.push(report);
        }

        Ok(reports)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Internal(format!("Invalid built-in pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tokens(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn purger(safelist: &[&str], patterns: &[&str]) -> Purger {
        Purger::new(".", Vec::new(), Safelist::new(safelist, patterns).unwrap()).unwrap()
    }

    #[test]
    fn test_purge_selectors() {
        let purger = purger(&[], &[]);
        let used = tokens(&["btn", "btn-primary", "navbar"]);
        let purge = |css: &str| purger.purge_css(css, &used).unwrap();

        assert_eq!(purge(".btn{color:red}"), ".btn{color:red}");
        assert_eq!(
            purge(".btn.btn-primary:hover{color:red}"),
            ".btn.btn-primary:hover{color:red}"
        );
        assert_eq!(purge("body{margin:0}"), "body{margin:0}");
        assert_eq!(purge(".navbar .btn:not(.disabled){color:red}"), ".navbar .btn:not(.disabled){color:red}");
        assert_eq!(purge(".modal{color:red}"), "");
        assert_eq!(purge(".navbar #hero{color:red}"), "");
        assert_eq!(purge(":is(.btn,.modal){color:red}"), ":is(.btn,.modal){color:red}");
        assert_eq!(purge(":where(.modal){color:red}"), "");
    }

    #[test]
    fn test_purge_keeps_non_ascii_class_intact() {
        let purger = purger(&[], &[]);
        let used = tokens(&["a"]);
        assert_eq!(purger.purge_css(".a\u{a0}b{color:red}", &used).unwrap(), "");
    }

    #[test]
    fn test_purge_nested_rules() {
        let purger = purger(&[], &[]);
        let used = tokens(&["card"]);
        let purged = purger
            .purge_css(".card{color:red;& .title{color:red}}.other{color:red}", &used)
            .unwrap();
        assert!(purged.starts_with(".card{color:red"), "{purged}");
        assert!(!purged.contains("title"), "{purged}");
        assert!(!purged.contains("other"), "{purged}");
    }

    #[test]
    fn test_safelist() {
        let safelist = Safelist::new(&["active"], &["^owl-"]).unwrap();
        assert!(safelist.contains("active"));
        assert!(safelist.contains("owl-carousel"));
        assert!(!safelist.contains("inactive"));

        assert!(Safelist::new(&[], &["(unclosed"]).is_err());
    }

    #[test]
    fn test_purge_css() {
        let purger = purger(&["active"], &["^fade"]);
        let used = tokens(&["container", "row"]);
        let css = ".container{width:100%}\n.unused{color:red}\n.row, .col-lg-4 { display: flex }\n\
                   .active{color:red}.fadeIn{opacity:1}\n\
                   @media (min-width: 768px) { .col-md-6 { width: 50% } .container { max-width: 720px } }\n\
                   @media print { .carousel { display: none } }\n\
                   @keyframes fadeIn { from { opacity: 0 } to { opacity: 1 } }";

        let purged = purger.purge_css(css, &used).unwrap();
        assert!(purged.starts_with(
            ".container{width:100%}.row{display:flex}.active{color:red}.fadeIn{opacity:1}"
        ), "{purged}");
        assert!(purged.contains(".container{max-width:720px}"), "{purged}");
        assert!(purged.contains("@keyframes fadeIn"), "{purged}");
        for removed in ["unused", "col-lg-4", "col-md-6", "carousel", "@media print"] {
            assert!(!purged.contains(removed), "{removed} survived in {purged}");
        }
    }

    #[test]
    fn test_purge_to_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join("index.html"),
            r#"<div class="hero-header wow"><a id="cta" class="btn">Go</a></div>"#,
        )
        .unwrap();
        fs::write(root.join("about.html"), r#"<section class="team"></section>"#).unwrap();
        fs::create_dir_all(root.join("css")).unwrap();
        fs::write(
            root.join("css/site.css"),
            ".hero-header{padding:0}.team{margin:0}.footer{color:#000}#cta{color:red}.owl-item{float:left}",
        )
        .unwrap();

        let config = PurgeConfig {
            content: vec!["*.html".to_string()],
            css: vec![PathBuf::from("css/site.css")],
            output: PathBuf::from("css/optimized"),
            safelist: Vec::new(),
            safelist_patterns: vec!["^owl-".to_string()],
        };
        let purger = Purger::from_config(&config, root).unwrap();
        let reports = purger.purge_to_dir(&config.css, &config.output).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].output, root.join("css/optimized/site.css"));
        assert!(reports[0].purged_bytes < reports[0].original_bytes);
        assert_eq!(
            fs::read_to_string(root.join("css/optimized/site.css")).unwrap(),
            ".hero-header{padding:0}.team{margin:0}#cta{color:red}.owl-item{float:left}"
        );
    }

    #[test]
    fn test_missing_stylesheet_is_an_error() {
        let dir = TempDir::new().unwrap();
        let purger = Purger::new(dir.path(), vec!["*.html".to_string()], Safelist::default()).unwrap();
        let result = purger.purge_to_dir(&[PathBuf::from("css/none.css")], Path::new("out"));
        assert!(matches!(result, Err(Error::Css { .. })));
    }

    #[test]
    fn test_default_config() {
        let config = PurgeConfig::default();
        assert_eq!(config.content, vec!["*.html"]);
        assert_eq!(config.output, PathBuf::from("css/optimized"));
        assert!(config.safelist.contains(&"collapsing".to_string()));
        assert!(Purger::from_config(&config, ".").is_ok());
    }
}
