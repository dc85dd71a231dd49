//! Text/binary classification for aggregate candidates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;

use crate::app::language::LanguageMap;
use crate::domain::model::{Candidate, SkipReason};
use crate::infra::config::{Config, Exclude};

/// Outcome of classifying one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Reject(SkipReason),
}

/// Thresholds for the size and content tiers.
#[derive(Debug, Clone)]
pub struct ClassifyLimits {
    pub max_file_size: u64,
    pub sniff_bytes: usize,
    pub max_nul_fraction: f64,
    pub max_control_fraction: f64,
    pub cache_capacity: usize,
    pub cache_eviction: usize,
}

impl ClassifyLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size: config.limits.max_file_size(),
            sniff_bytes: config.limits.sniff_bytes(),
            max_nul_fraction: config.limits.max_nul_fraction(),
            max_control_fraction: config.limits.max_control_fraction(),
            cache_capacity: config.limits.cache_capacity(),
            cache_eviction: config.limits.cache_eviction(),
        }
    }
}

/// Decides whether a candidate may be embedded as text.
///
/// Tiers, in order, first match wins: exclusion list, size ceiling,
/// extension/MIME allow-list, then a content sniff of the file's first bytes.
/// Only sniff verdicts are cached, the other tiers are metadata checks.
#[derive(Debug)]
pub struct Classifier {
    limits: ClassifyLimits,
    excluded_names: HashSet<String>,
    excluded_patterns: Vec<Regex>,
    cache: VerdictCache,
}

impl Classifier {
    pub fn new(limits: ClassifyLimits, exclude: &Exclude) -> Result<Self> {
        let mut excluded_patterns = Vec::with_capacity(exclude.patterns.len());
        for pattern in &exclude.patterns {
            let regex = Regex::new(pattern)
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
            excluded_patterns.push(regex);
        }
        Ok(Self {
            cache: VerdictCache::new(limits.cache_capacity, limits.cache_eviction),
            excluded_names: exclude
                .basenames
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            excluded_patterns,
            limits,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ClassifyLimits::from_config(config), &config.exclude)
    }

    pub fn classify(&mut self, candidate: &Candidate, languages: &LanguageMap) -> Verdict {
        // The nominal name decides extension-based tiers; content comes from
        // the physical path.
        let nominal = Path::new(&candidate.display_path);
        if self.is_excluded(nominal, &candidate.display_path) {
            return Verdict::Reject(SkipReason::Excluded);
        }
        if candidate.size_bytes > self.limits.max_file_size {
            return Verdict::Reject(SkipReason::TooLarge);
        }
        if languages.knows(nominal) || has_text_mime(nominal) {
            return Verdict::Admit;
        }
        if let Some(verdict) = self.cache.get(&candidate.absolute_path) {
            return verdict;
        }
        let verdict = self.sniff(&candidate.absolute_path);
        self.cache.insert(candidate.absolute_path.clone(), verdict);
        verdict
    }

    fn is_excluded(&self, nominal: &Path, display_path: &str) -> bool {
        if let Some(name) = nominal.file_name().and_then(|name| name.to_str())
            && self.excluded_names.contains(&name.to_lowercase())
        {
            return true;
        }
        self.excluded_patterns
            .iter()
            .any(|pattern| pattern.is_match(display_path))
    }

    fn sniff(&self, path: &Path) -> Verdict {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot open file for sniffing");
                return Verdict::Reject(SkipReason::Unreadable);
            }
        };
        let mut buf = Vec::with_capacity(self.limits.sniff_bytes);
        if let Err(err) = file.take(self.limits.sniff_bytes as u64).read_to_end(&mut buf) {
            tracing::warn!(path = %path.display(), error = %err, "cannot read file for sniffing");
            return Verdict::Reject(SkipReason::Unreadable);
        }
        if looks_binary(&buf, &self.limits) {
            Verdict::Reject(SkipReason::Binary)
        } else {
            Verdict::Admit
        }
    }

    #[cfg(test)]
    fn cached_sniffs(&self) -> usize {
        self.cache.entries.len()
    }
}

/// Byte-level heuristic over the sniffed prefix. Empty input is text.
fn looks_binary(bytes: &[u8], limits: &ClassifyLimits) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let mut nul = 0usize;
    let mut control = 0usize;
    for &byte in bytes {
        match byte {
            0x00 => nul += 1,
            // Bytes that can never start a UTF-8 sequence.
            0xF8..=0xFF => return true,
            // TAB, LF, FF, CR are fine in text.
            b'\t' | b'\n' | 0x0C | b'\r' => {}
            0x01..=0x1F => control += 1,
            _ => {}
        }
    }
    let len = bytes.len() as f64;
    nul as f64 / len > limits.max_nul_fraction
        || control as f64 / len > limits.max_control_fraction
}

/// MIME half of the allow-list tier: `text/*` always passes, plus a short
/// list of application subtypes that are text in practice.
fn has_text_mime(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let Some(mime) = mime_guess::from_ext(ext).first() else {
        return false;
    };
    if mime.type_() == mime_guess::mime::TEXT {
        return true;
    }
    if mime.type_() != mime_guess::mime::APPLICATION {
        return false;
    }
    matches!(
        mime.subtype().as_str(),
        "json"
            | "xml"
            | "javascript"
            | "ecmascript"
            | "sql"
            | "toml"
            | "yaml"
            | "x-yaml"
            | "x-sh"
            | "graphql"
    ) || mime
        .suffix()
        .is_some_and(|suffix| matches!(suffix.as_str(), "json" | "xml"))
}

/// Insertion-order cache of sniff verdicts. When the capacity is exceeded,
/// the oldest entries are dropped in one batch.
#[derive(Debug)]
struct VerdictCache {
    entries: HashMap<PathBuf, Verdict>,
    order: VecDeque<PathBuf>,
    capacity: usize,
    eviction: usize,
}

impl VerdictCache {
    fn new(capacity: usize, eviction: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            eviction,
        }
    }

    fn get(&self, path: &Path) -> Option<Verdict> {
        self.entries.get(path).copied()
    }

    fn insert(&mut self, path: PathBuf, verdict: Verdict) {
        if self.entries.insert(path.clone(), verdict).is_none() {
            self.order.push_back(path);
        }
        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        for _ in 0..self.eviction {
            let Some(path) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    fn candidate(path: &Path, size: u64) -> Candidate {
        Candidate {
            absolute_path: path.to_path_buf(),
            display_path: path
                .file_name()
                .expect("file name")
                .to_string_lossy()
                .into_owned(),
            size_bytes: size,
        }
    }

    fn classifier() -> Classifier {
        Classifier::from_config(&Config::default()).expect("classifier")
    }

    fn classifier_with(limits: ClassifyLimits) -> Classifier {
        Classifier::new(limits, &Exclude::default()).expect("classifier")
    }

    #[test]
    fn known_extension_admits_despite_nul_content() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("data.json");
        fs::write(&path, b"{\"k\":\0\0\0\0\0\0\0\0\0\"v\"}")?;

        let languages = LanguageMap::new();
        let size = fs::metadata(&path)?.len();
        let verdict = classifier().classify(&candidate(&path, size), &languages);
        assert_eq!(verdict, Verdict::Admit);
        Ok(())
    }

    #[test]
    fn nul_heavy_unknown_extension_rejects_as_binary() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("blob.qqq");
        fs::write(&path, b"ab\0\0\0\0cd")?;

        let languages = LanguageMap::new();
        let verdict = classifier().classify(&candidate(&path, 8), &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Binary));
        Ok(())
    }

    #[test]
    fn size_ceiling_beats_known_extension() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("huge.py");
        fs::write(&path, vec![b'x'; 64])?;

        let mut limits = ClassifyLimits::from_config(&Config::default());
        limits.max_file_size = 16;
        let languages = LanguageMap::new();
        let verdict = classifier_with(limits).classify(&candidate(&path, 64), &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::TooLarge));
        Ok(())
    }

    #[test]
    fn empty_file_admits() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("empty.qqq");
        fs::write(&path, b"")?;

        let languages = LanguageMap::new();
        let verdict = classifier().classify(&candidate(&path, 0), &languages);
        assert_eq!(verdict, Verdict::Admit);
        Ok(())
    }

    #[test]
    fn invalid_utf8_lead_byte_rejects() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("lead.qqq");
        fs::write(&path, [b'a', b'b', 0xF9, b'c'])?;

        let languages = LanguageMap::new();
        let verdict = classifier().classify(&candidate(&path, 4), &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Binary));
        Ok(())
    }

    #[test]
    fn allowed_control_characters_stay_text() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("ctl.qqq");
        fs::write(&path, b"line one\r\n\tline two\x0cend")?;

        let languages = LanguageMap::new();
        let verdict = classifier().classify(&candidate(&path, 23), &languages);
        assert_eq!(verdict, Verdict::Admit);
        Ok(())
    }

    #[test]
    fn disallowed_control_fraction_rejects() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("esc.qqq");
        fs::write(&path, b"ab\x01\x02\x03cd")?;

        let languages = LanguageMap::new();
        let verdict = classifier().classify(&candidate(&path, 7), &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Binary));
        Ok(())
    }

    #[test]
    fn excluded_basename_rejects_before_everything() {
        let languages = LanguageMap::new();
        let candidate = Candidate {
            absolute_path: PathBuf::from("/nonexistent/.DS_Store"),
            display_path: ".DS_Store".into(),
            size_bytes: 10,
        };
        let verdict = classifier().classify(&candidate, &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Excluded));
    }

    #[test]
    fn excluded_pattern_matches_display_path() -> Result<()> {
        let exclude = Exclude {
            basenames: Vec::new(),
            patterns: vec![r"(^|/)generated/".into()],
        };
        let mut classifier =
            Classifier::new(ClassifyLimits::from_config(&Config::default()), &exclude)?;
        let languages = LanguageMap::new();
        let candidate = Candidate {
            absolute_path: PathBuf::from("/repo/generated/out.py"),
            display_path: "generated/out.py".into(),
            size_bytes: 10,
        };
        let verdict = classifier.classify(&candidate, &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Excluded));
        Ok(())
    }

    #[test]
    fn unreadable_file_rejects_without_panicking() {
        let languages = LanguageMap::new();
        let candidate = Candidate {
            absolute_path: PathBuf::from("/nonexistent/ghost.qqq"),
            display_path: "ghost.qqq".into(),
            size_bytes: 10,
        };
        let verdict = classifier().classify(&candidate, &languages);
        assert_eq!(verdict, Verdict::Reject(SkipReason::Unreadable));
    }

    #[test]
    fn cache_evicts_oldest_batch_when_full() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let mut limits = ClassifyLimits::from_config(&Config::default());
        limits.cache_capacity = 10;
        limits.cache_eviction = 4;
        let mut classifier = classifier_with(limits);
        let languages = LanguageMap::new();

        for index in 0..11 {
            let path = temp.path().join(format!("f{index}.qqq"));
            fs::write(&path, b"plain text")?;
            let verdict = classifier.classify(&candidate(&path, 10), &languages);
            assert_eq!(verdict, Verdict::Admit);
        }

        assert_eq!(classifier.cached_sniffs(), 7);
        Ok(())
    }
}
