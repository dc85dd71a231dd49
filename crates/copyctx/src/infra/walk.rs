//! Builds the selection forest from filesystem paths.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::domain::errors::SelectionError;
use crate::domain::model::{FolderNode, SelectionItem};
use crate::infra::config::{Config, Ignore};

/// Directory-walk policy derived from config and CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    pub respect_gitignore: bool,
    pub include_hidden: bool,
}

impl WalkOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            respect_gitignore: config.walk.respect_gitignore(),
            include_hidden: config.walk.include_hidden(),
        }
    }
}

/// Turn path arguments into selection items. File arguments become file
/// nodes; directory arguments are walked into folder nodes with children in
/// lexical name order.
pub fn selection_from_paths(
    paths: &[PathBuf],
    config: &Config,
    options: &WalkOptions,
) -> Result<Vec<SelectionItem>> {
    let matcher = build_prune_matcher(&config.ignore)?;
    let cwd = env::current_dir().context("failed to determine current directory")?;

    let mut selection = Vec::with_capacity(paths.len());
    for path in paths {
        let absolute = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };

        let metadata = fs::metadata(&absolute).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => SelectionError::NotFound(absolute.clone()),
            _ => SelectionError::Inaccessible {
                path: absolute.clone(),
                source: err,
            },
        })?;

        if metadata.is_dir() {
            selection.push(walk_folder(&absolute, &matcher, options)?);
        } else {
            selection.push(file_node(&absolute));
        }
    }

    Ok(selection)
}

fn file_node(path: &Path) -> SelectionItem {
    if path.is_symlink()
        && let Ok(target) = fs::canonicalize(path)
    {
        return SelectionItem::linked_file(path, target);
    }
    SelectionItem::file(path)
}

fn walk_folder(
    root: &Path,
    matcher: &PruneMatcher,
    options: &WalkOptions,
) -> Result<SelectionItem> {
    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .git_global(false)
        .hidden(!options.include_hidden)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    let filter_root = root.to_path_buf();
    let filter_matcher = matcher.clone();
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let rel = entry
            .path()
            .strip_prefix(&filter_root)
            .unwrap_or(entry.path());
        !filter_matcher.should_skip(rel)
    });

    // Entries arrive in depth-first pre-order; a directory always precedes
    // its contents, so a stack of open folders mirrors the traversal.
    let mut stack: Vec<FolderNode> = vec![FolderNode {
        path: root.to_path_buf(),
        children: Vec::new(),
    }];

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "walk error");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        while stack.len() > entry.depth() {
            close_folder(&mut stack);
        }

        if entry.file_type().is_some_and(|kind| kind.is_dir()) {
            stack.push(FolderNode {
                path: entry.path().to_path_buf(),
                children: Vec::new(),
            });
        } else if let Some(parent) = stack.last_mut() {
            parent.children.push(file_node(entry.path()));
        }
    }

    while stack.len() > 1 {
        close_folder(&mut stack);
    }

    stack
        .pop()
        .map(SelectionItem::Folder)
        .context("folder walk produced no root")
}

fn close_folder(stack: &mut Vec<FolderNode>) {
    if let Some(done) = stack.pop()
        && let Some(parent) = stack.last_mut()
    {
        parent.children.push(SelectionItem::Folder(done));
    }
}

#[derive(Debug, Clone)]
struct PruneMatcher {
    globs: GlobSet,
}

impl PruneMatcher {
    fn should_skip(&self, rel: &Path) -> bool {
        self.globs.is_match(rel)
    }
}

fn build_prune_matcher(ignore: &Ignore) -> Result<PruneMatcher> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &ignore.paths {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for glob in &ignore.globs {
        let glob = Glob::new(glob).context("invalid ignore glob")?;
        builder.add(glob);
    }

    let globs = builder.build().context("failed to build prune matcher")?;
    Ok(PruneMatcher { globs })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_config() -> Config {
        Config::default()
    }

    fn leaf_names(item: &SelectionItem) -> Vec<String> {
        match item {
            SelectionItem::File(file) => vec![
                file.path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default()
                    .to_owned(),
            ],
            SelectionItem::Folder(folder) => folder.children.iter().flat_map(leaf_names).collect(),
            SelectionItem::Container(container) => {
                container.children.iter().flat_map(leaf_names).collect()
            }
        }
    }

    #[test]
    fn walks_folders_in_sorted_order() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("sub"))?;
        fs::write(root.join("b.txt"), b"b")?;
        fs::write(root.join("a.txt"), b"a")?;
        fs::write(root.join("sub/c.txt"), b"c")?;

        let config = build_config();
        let options = WalkOptions::from_config(&config);
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &options)?;

        assert_eq!(selection.len(), 1);
        assert_eq!(leaf_names(&selection[0]), ["a.txt", "b.txt", "c.txt"]);

        let SelectionItem::Folder(folder) = &selection[0] else {
            panic!("expected folder root");
        };
        let SelectionItem::Folder(sub) = folder.children.last().expect("folder has children")
        else {
            panic!("expected subfolder after files");
        };
        assert!(sub.path.ends_with("sub"));
        Ok(())
    }

    #[test]
    fn file_arguments_become_file_nodes() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("one.txt");
        fs::write(&file, b"one")?;

        let config = build_config();
        let options = WalkOptions::from_config(&config);
        let selection = selection_from_paths(&[file.clone()], &config, &options)?;
        assert_eq!(selection, vec![SelectionItem::file(&file)]);
        Ok(())
    }

    #[test]
    fn missing_argument_is_an_error() {
        let config = build_config();
        let options = WalkOptions::from_config(&config);
        let missing = PathBuf::from("/definitely/not/here/ever");
        let err = selection_from_paths(&[missing], &config, &options).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn prunes_configured_paths_and_globs() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("src"))?;
        fs::create_dir_all(root.join("skipme"))?;
        fs::write(root.join("src/lib.rs"), b"fn lib() {}")?;
        fs::write(root.join("skipme/file.txt"), b"ignored")?;
        fs::write(root.join("Cargo.lock"), b"lock")?;

        let mut config = build_config();
        config.ignore.paths.push("skipme/".into());

        let options = WalkOptions::from_config(&config);
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &options)?;
        let leaves = leaf_names(&selection[0]);
        assert!(leaves.contains(&"lib.rs".to_string()));
        assert!(!leaves.iter().any(|name| name == "file.txt"));
        assert!(!leaves.iter().any(|name| name == "Cargo.lock"));
        Ok(())
    }

    #[test]
    fn hidden_entries_follow_walk_options() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::write(root.join(".secret"), b"hidden")?;
        fs::write(root.join("visible.txt"), b"visible")?;

        let config = build_config();
        let default_options = WalkOptions::from_config(&config);
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &default_options)?;
        assert_eq!(leaf_names(&selection[0]), ["visible.txt"]);

        let options = WalkOptions {
            include_hidden: true,
            ..default_options
        };
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &options)?;
        assert_eq!(leaf_names(&selection[0]), [".secret", "visible.txt"]);
        Ok(())
    }

    #[test]
    fn respects_gitignore_when_enabled() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join(".git"))?;
        fs::write(root.join(".gitignore"), "ignored.txt\n")?;
        fs::write(root.join("ignored.txt"), b"skip me")?;
        fs::write(root.join("kept.txt"), b"keep me")?;

        let config = build_config();
        let options = WalkOptions::from_config(&config);
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &options)?;
        assert_eq!(leaf_names(&selection[0]), ["kept.txt"]);

        let options = WalkOptions {
            respect_gitignore: false,
            ..options
        };
        let selection = selection_from_paths(&[root.to_path_buf()], &config, &options)?;
        assert_eq!(leaf_names(&selection[0]), ["ignored.txt", "kept.txt"]);
        Ok(())
    }
}
