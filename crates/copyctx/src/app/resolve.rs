//! Selection resolution: expanding the selection forest into candidates.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::model::{
    Candidate, ContainerNode, FileNode, SelectionItem, SkipReason, SkippedFile,
};

/// Options controlling path relativization.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Root for display paths when no container provides one. Ignored when
    /// the selection does not live under it; the parent of the first selected
    /// item is the fallback either way.
    pub workspace_root: Option<PathBuf>,
}

/// Flat view of a selection: candidates in traversal order plus skip records.
#[derive(Debug, Default)]
pub struct Resolution {
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SkippedFile>,
}

/// Expand `selection` depth-first into deduplicated candidates.
///
/// Candidates appear in pre-order; a physical file reachable through several
/// selection entries is emitted once, silently. Files that cannot be resolved
/// are recorded in `skipped` and never abort the walk.
pub fn resolve(selection: &[SelectionItem], options: &ResolveOptions) -> Resolution {
    let fallback_root = options
        .workspace_root
        .clone()
        .filter(|root| selection_starts_under(selection, root))
        .or_else(|| first_item_parent(selection));

    let mut resolver = Resolver {
        seen: HashSet::new(),
        resolution: Resolution::default(),
        fallback_root,
    };
    for item in selection {
        resolver.visit(item, &DisplayContext::Root);
    }
    resolver.resolution
}

/// Where a file sits relative to the nearest container ancestor.
#[derive(Debug, Clone)]
enum DisplayContext {
    /// No container ancestor; paths are relative to the fallback root.
    Root,
    /// Inside a container with an on-disk root.
    Rooted { name: String, root: PathBuf },
    /// Inside a rootless container; the prefix is a chain of names.
    Named { prefix: String },
}

struct Resolver {
    seen: HashSet<PathBuf>,
    resolution: Resolution,
    fallback_root: Option<PathBuf>,
}

impl Resolver {
    fn visit(&mut self, item: &SelectionItem, ctx: &DisplayContext) {
        match item {
            SelectionItem::File(file) => self.visit_file(file, ctx),
            SelectionItem::Folder(folder) => {
                let ctx = match ctx {
                    DisplayContext::Named { prefix } => DisplayContext::Named {
                        prefix: format!("{prefix}/{}", file_name_of(&folder.path)),
                    },
                    other => other.clone(),
                };
                for child in &folder.children {
                    self.visit(child, &ctx);
                }
            }
            SelectionItem::Container(container) => {
                let ctx = container_context(container);
                for child in &container.children {
                    self.visit(child, &ctx);
                }
            }
        }
    }

    fn visit_file(&mut self, file: &FileNode, ctx: &DisplayContext) {
        let display = self.display_for(&file.path, ctx);
        let Some(canonical) = canonicalize_physical(file) else {
            tracing::warn!(path = %file.path.display(), "selected file could not be resolved");
            self.resolution.skipped.push(SkippedFile {
                display_path: display,
                reason: SkipReason::Unreadable,
            });
            return;
        };
        if !self.seen.insert(canonical.clone()) {
            return;
        }
        let size = match fs::metadata(&canonical) {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                tracing::warn!(path = %canonical.display(), error = %err, "cannot stat selected file");
                self.resolution.skipped.push(SkippedFile {
                    display_path: display,
                    reason: SkipReason::Unreadable,
                });
                return;
            }
        };
        self.resolution.candidates.push(Candidate {
            absolute_path: canonical,
            display_path: display,
            size_bytes: size,
        });
    }

    fn display_for(&self, nominal: &Path, ctx: &DisplayContext) -> String {
        match ctx {
            DisplayContext::Rooted { name, root } => match nominal.strip_prefix(root) {
                Ok(rel) => format!("{name}/{}", display_string(rel)),
                Err(_) => format!("{name}/{}", file_name_of(nominal)),
            },
            DisplayContext::Named { prefix } => format!("{prefix}/{}", file_name_of(nominal)),
            DisplayContext::Root => match &self.fallback_root {
                Some(root) => match nominal.strip_prefix(root) {
                    Ok(rel) => display_string(rel),
                    Err(_) => file_name_of(nominal),
                },
                None => file_name_of(nominal),
            },
        }
    }
}

fn container_context(container: &ContainerNode) -> DisplayContext {
    match &container.root {
        Some(root) => DisplayContext::Rooted {
            name: container.name.clone(),
            root: root.clone(),
        },
        None => DisplayContext::Named {
            prefix: container.name.clone(),
        },
    }
}

/// The physical file behind a node: the link target when one is given and
/// usable, the nominal path otherwise.
fn canonicalize_physical(file: &FileNode) -> Option<PathBuf> {
    if let Some(target) = &file.resolved_path
        && let Ok(path) = fs::canonicalize(target)
    {
        return Some(path);
    }
    fs::canonicalize(&file.path).ok()
}

fn selection_starts_under(selection: &[SelectionItem], root: &Path) -> bool {
    match selection.first() {
        Some(SelectionItem::File(file)) => file.path.starts_with(root),
        Some(SelectionItem::Folder(folder)) => folder.path.starts_with(root),
        Some(SelectionItem::Container(_)) | None => true,
    }
}

fn first_item_parent(selection: &[SelectionItem]) -> Option<PathBuf> {
    let path = match selection.first()? {
        SelectionItem::File(file) => &file.path,
        SelectionItem::Folder(folder) => &folder.path,
        SelectionItem::Container(container) => return container.root.clone(),
    };
    path.parent().map(Path::to_path_buf)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Display paths always use forward slashes.
fn display_string(path: &Path) -> String {
    let raw = path.display().to_string();
    if std::path::MAIN_SEPARATOR == '/' {
        raw
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    fn touch(path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn orders_candidates_depth_first() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir(root.join("sub"))?;
        touch(&root.join("a.txt"), "a")?;
        touch(&root.join("sub/b.txt"), "b")?;
        touch(&root.join("c.txt"), "c")?;

        let selection = vec![
            SelectionItem::file(root.join("a.txt")),
            SelectionItem::folder(
                root.join("sub"),
                vec![SelectionItem::file(root.join("sub/b.txt"))],
            ),
            SelectionItem::file(root.join("c.txt")),
        ];
        let resolution = resolve(
            &selection,
            &ResolveOptions {
                workspace_root: Some(root.to_path_buf()),
            },
        );

        let displays: Vec<_> = resolution
            .candidates
            .iter()
            .map(|candidate| candidate.display_path.as_str())
            .collect();
        assert_eq!(displays, ["a.txt", "sub/b.txt", "c.txt"]);
        assert!(resolution.skipped.is_empty());
        Ok(())
    }

    #[test]
    fn deduplicates_file_selected_directly_and_via_folder() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir(root.join("parent"))?;
        touch(&root.join("parent/same.txt"), "once")?;

        let selection = vec![
            SelectionItem::file(root.join("parent/same.txt")),
            SelectionItem::folder(
                root.join("parent"),
                vec![SelectionItem::file(root.join("parent/same.txt"))],
            ),
        ];
        let resolution = resolve(
            &selection,
            &ResolveOptions {
                workspace_root: Some(root.to_path_buf()),
            },
        );

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "parent/same.txt");
        assert!(resolution.skipped.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn deduplicates_through_symlinks() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        touch(&root.join("real.txt"), "real")?;
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt"))?;

        let selection = vec![
            SelectionItem::file(root.join("real.txt")),
            SelectionItem::file(root.join("link.txt")),
        ];
        let resolution = resolve(
            &selection,
            &ResolveOptions {
                workspace_root: Some(root.to_path_buf()),
            },
        );

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "real.txt");
        Ok(())
    }

    #[test]
    fn container_with_root_prefixes_display_paths() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("proj/src"))?;
        touch(&root.join("proj/src/main.rs"), "fn main() {}")?;

        let selection = vec![SelectionItem::container(
            "proj",
            Some(root.join("proj")),
            vec![SelectionItem::folder(
                root.join("proj/src"),
                vec![SelectionItem::file(root.join("proj/src/main.rs"))],
            )],
        )];
        let resolution = resolve(&selection, &ResolveOptions::default());

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "proj/src/main.rs");
        Ok(())
    }

    #[test]
    fn rootless_container_uses_name_chain() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        touch(&root.join("notes.txt"), "notes")?;

        let selection = vec![SelectionItem::container(
            "Solution Items",
            None,
            vec![SelectionItem::file(root.join("notes.txt"))],
        )];
        let resolution = resolve(&selection, &ResolveOptions::default());

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(
            resolution.candidates[0].display_path,
            "Solution Items/notes.txt"
        );
        Ok(())
    }

    #[test]
    fn missing_file_is_recorded_and_does_not_abort() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        touch(&root.join("ok.txt"), "ok")?;

        let selection = vec![
            SelectionItem::file(root.join("gone.txt")),
            SelectionItem::file(root.join("ok.txt")),
        ];
        let resolution = resolve(
            &selection,
            &ResolveOptions {
                workspace_root: Some(root.to_path_buf()),
            },
        );

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "ok.txt");
        assert_eq!(resolution.skipped.len(), 1);
        assert_eq!(resolution.skipped[0].display_path, "gone.txt");
        assert_eq!(resolution.skipped[0].reason, SkipReason::Unreadable);
        Ok(())
    }

    #[test]
    fn falls_back_to_first_item_parent_without_workspace_root() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir(root.join("folder"))?;
        touch(&root.join("folder/file.txt"), "x")?;

        let selection = vec![SelectionItem::folder(
            root.join("folder"),
            vec![SelectionItem::file(root.join("folder/file.txt"))],
        )];
        let resolution = resolve(&selection, &ResolveOptions::default());

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "folder/file.txt");
        Ok(())
    }

    #[test]
    fn linked_file_displays_at_nominal_position() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir(root.join("shared"))?;
        touch(&root.join("shared/util.py"), "pass")?;

        // The selection shows the file inside proj even though the bytes
        // live in shared.
        let selection = vec![SelectionItem::container(
            "proj",
            Some(root.join("proj")),
            vec![SelectionItem::linked_file(
                root.join("proj/util.py"),
                root.join("shared/util.py"),
            )],
        )];
        let resolution = resolve(&selection, &ResolveOptions::default());

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].display_path, "proj/util.py");
        assert!(resolution.candidates[0].absolute_path.ends_with("shared/util.py"));
        Ok(())
    }
}
