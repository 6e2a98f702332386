//! Critical CSS file management and HTML injection

use beacon_core::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Contents written when no critical CSS has been generated yet
pub const PLACEHOLDER: &str = "/* Critical CSS placeholder */\n";

/// Closing tag every injection is anchored on
pub const HEAD_CLOSE: &str = "</head>";

/// Script reporting largest-contentful-paint timings to the console
pub const LCP_MONITOR_SCRIPT: &str = r#"
<script>
// Monitor LCP performance
if ('PerformanceObserver' in window) {
  const lcpObserver = new PerformanceObserver((entryList) => {
    const entries = entryList.getEntries();
    const lcpEntry = entries[entries.length - 1];
    console.log('LCP:', lcpEntry.startTime, 'Element:', lcpEntry.element);
  });
  lcpObserver.observe({ type: 'largest-contentful-paint', buffered: true });
}
</script>"#;

/// Create the critical CSS file with placeholder contents if it is missing
///
/// Returns `true` when the file was created.
pub fn ensure_placeholder(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| Error::css(path.display().to_string(), e.to_string()))?;
    }
    fs::write(path, PLACEHOLDER)
        .map_err(|e| Error::css(path.display().to_string(), e.to_string()))?;

    info!(path = %path.display(), "Created critical CSS placeholder");
    Ok(true)
}

/// Insert `snippet` right before the first `</head>`
///
/// Returns `None` when the document has no `</head>`.
pub fn inject_before_head_close(html: &str, snippet: &str) -> Option<String> {
    let idx = html.find(HEAD_CLOSE)?;
    let mut out = String::with_capacity(html.len() + snippet.len());
    out.push_str(&html[..idx]);
    out.push_str(snippet);
    out.push_str(&html[idx..]);
    Some(out)
}

/// Inline `css` as `<style id="critical-css">` before `</head>`
///
/// Returns `None` when `css` is empty or the document has no `</head>`.
pub fn inline_critical_css(html: &str, css: &str) -> Option<String> {
    if css.is_empty() {
        return None;
    }
    inject_before_head_close(html, &format!("<style id=\"critical-css\">{css}</style>"))
}

/// Add the LCP monitoring script before `</head>`
pub fn inject_lcp_monitor(html: &str) -> Option<String> {
    inject_before_head_close(html, LCP_MONITOR_SCRIPT)
}
