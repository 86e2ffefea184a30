use std::path::PathBuf;

/// A post that was dropped, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPost {
    pub url: String,
    pub reason: String,
}

/// Outcome of one export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub discovered: usize,
    /// URLs of written posts, in output order.
    pub exported: Vec<String>,
    pub skipped: Vec<SkippedPost>,
    /// Non-fatal problems that did not drop a post (image fallbacks, sitemap index).
    pub warnings: Vec<String>,
    pub output_paths: Vec<PathBuf>,
}

impl RunReport {
    pub fn record_skip(&mut self, url: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedPost {
            url: url.into(),
            reason: reason.into(),
        });
    }

    pub fn record_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn has_problems(&self) -> bool {
        !self.skipped.is_empty() || !self.warnings.is_empty()
    }

    /// One line per skipped post, for the end-of-run summary. Warnings are
    /// reported as they happen and only counted here.
    pub fn skip_summary_lines(&self) -> Vec<String> {
        self.skipped
            .iter()
            .map(|s| format!("skipped {}: {}", s.url, s.reason))
            .collect()
    }
}
