//! Domain models for selections, candidates, and aggregate results.

use std::fmt;
use std::path::PathBuf;

/// One node in the selection forest handed over by a host adapter.
///
/// `File` and `Folder` describe on-disk entries. `Container` is a logical
/// grouping (a project or workspace node): it has a display name, an optional
/// on-disk root, and children, but no path of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionItem {
    File(FileNode),
    Folder(FolderNode),
    Container(ContainerNode),
}

impl SelectionItem {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(FileNode {
            path: path.into(),
            resolved_path: None,
        })
    }

    /// A file reached through a link or alias: `path` is where the selection
    /// shows it, `target` is the physical file.
    pub fn linked_file(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self::File(FileNode {
            path: path.into(),
            resolved_path: Some(target.into()),
        })
    }

    pub fn folder(path: impl Into<PathBuf>, children: Vec<SelectionItem>) -> Self {
        Self::Folder(FolderNode {
            path: path.into(),
            children,
        })
    }

    pub fn container(
        name: impl Into<String>,
        root: Option<PathBuf>,
        children: Vec<SelectionItem>,
    ) -> Self {
        Self::Container(ContainerNode {
            name: name.into(),
            root,
            children,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub path: PathBuf,
    /// Physical path when the selection entry is a link or alias.
    pub resolved_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub path: PathBuf,
    pub children: Vec<SelectionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerNode {
    pub name: String,
    pub root: Option<PathBuf>,
    pub children: Vec<SelectionItem>,
}

/// A file that survived selection resolution and awaits classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub absolute_path: PathBuf,
    pub display_path: String,
    pub size_bytes: u64,
}

/// Reason a candidate was dropped from the aggregate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Excluded,
    TooLarge,
    Binary,
    Unreadable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Excluded => "excluded",
            SkipReason::TooLarge => "too large",
            SkipReason::Binary => "binary",
            SkipReason::Unreadable => "unreadable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a dropped candidate, kept in traversal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub display_path: String,
    pub reason: SkipReason,
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub text: String,
    pub file_count: usize,
    pub skipped: Vec<SkippedFile>,
}

impl AggregateResult {
    /// Whether no file made it into the output.
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    /// One-line summary suitable for a status bar or stderr.
    pub fn status_line(&self) -> String {
        if self.file_count == 0 {
            return "no files found".to_owned();
        }
        let mut line = format!("copied {} file(s) to the clipboard", self.file_count);
        if !self.skipped.is_empty() {
            line.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        line
    }
}
