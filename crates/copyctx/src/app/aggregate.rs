//! Aggregation of admitted candidates into one fenced-Markdown document.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::Result;

use crate::app::classify::{Classifier, Verdict};
use crate::app::language::LanguageMap;
use crate::app::resolve::Resolution;
use crate::domain::model::{AggregateResult, SkipReason, SkippedFile};
use crate::infra::config::Config;

/// Drives classification, tagging, and formatting for resolved candidates.
pub struct Aggregator {
    languages: LanguageMap,
    classifier: Classifier,
}

impl Aggregator {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            languages: LanguageMap::new(),
            classifier,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Classifier::from_config(config)?))
    }

    /// Aggregate resolved candidates, in order, into one document.
    ///
    /// Rejected candidates join the resolution's skip records; a read failure
    /// after admission demotes the candidate the same way. The text is empty
    /// when nothing was admitted, and callers must then report "no files"
    /// instead of delivering it.
    pub fn aggregate(&mut self, resolution: &Resolution) -> AggregateResult {
        let mut result = AggregateResult::default();
        result.skipped.extend(resolution.skipped.iter().cloned());

        for candidate in &resolution.candidates {
            match self.classifier.classify(candidate, &self.languages) {
                Verdict::Reject(reason) => {
                    tracing::warn!(path = %candidate.display_path, reason = %reason, "skipping file");
                    result.skipped.push(SkippedFile {
                        display_path: candidate.display_path.clone(),
                        reason,
                    });
                }
                Verdict::Admit => match read_text(&candidate.absolute_path) {
                    Ok(content) => {
                        let label = self.languages.label_for(Path::new(&candidate.display_path));
                        push_block(&mut result.text, &candidate.display_path, &label, &content);
                        result.file_count += 1;
                    }
                    Err(err) => {
                        tracing::warn!(path = %candidate.display_path, error = %err, "cannot read file");
                        result.skipped.push(SkippedFile {
                            display_path: candidate.display_path.clone(),
                            reason: SkipReason::Unreadable,
                        });
                    }
                },
            }
        }
        result
    }
}

fn push_block(out: &mut String, display_path: &str, label: &str, content: &str) {
    let fence = LanguageMap::fence_for(label);
    out.push_str("### ");
    out.push_str(display_path);
    out.push_str("\n\n");
    out.push_str(fence);
    out.push_str(label);
    out.push('\n');
    out.push_str(content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(fence);
    out.push_str("\n\n");
}

/// Read a file as text. BOMs are honored (UTF-8 stripped, UTF-16 decoded);
/// everything else falls back to lossy UTF-8.
pub fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(decode_text(&bytes))
}

fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| combine([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
