use super::Analyzer;
use crate::config::AnalysisConfig;
use content_inspector::{ContentType, inspect};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{Level, debug, span};

/// Keyword and non-ASCII heuristic over the first `max_bytes` of a file.
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    keywords: Vec<String>,
    flag_non_ascii: bool,
    skip_binary: bool,
    max_bytes: usize,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl ContentAnalyzer {
    /// Build an analyzer from the `[analysis]` config section.
    #[must_use]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.to_lowercase())
                .collect(),
            flag_non_ascii: config.flag_non_ascii,
            skip_binary: config.skip_binary,
            max_bytes: config.max_bytes.max(1),
        }
    }

    /// Decide on already-read content.
    #[must_use]
    pub fn inspect_bytes(&self, content: &[u8]) -> bool {
        if content.is_empty() {
            return false;
        }
        if self.skip_binary && matches!(inspect(content), ContentType::BINARY) {
            return false;
        }
        if self.flag_non_ascii && !content.is_ascii() {
            return true;
        }
        let text = String::from_utf8_lossy(content).to_lowercase();
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    fn read_head(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut buffer = Vec::new();
        file.take(self.max_bytes as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

impl Analyzer for ContentAnalyzer {
    fn is_flagged(&self, path: &Path) -> bool {
        let span = span!(Level::DEBUG, "analyze", path = %path.display());
        let _guard = span.enter();

        // Symlinks are recorded as files but never followed.
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }

        match self.read_head(path) {
            Ok(content) => {
                let flagged = self.inspect_bytes(&content);
                debug!(flagged, bytes_checked = content.len(), "Analysis complete");
                flagged
            }
            Err(e) => {
                debug!(error = %e, "Unreadable, not flagged");
                false
            }
        }
    }
}
