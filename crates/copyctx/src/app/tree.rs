//! Tree rendering of a selection forest.

use std::path::Path;

use crate::domain::model::SelectionItem;

/// Options for tree rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// Render folders and containers only, dropping file leaves.
    pub dirs_only: bool,
}

/// Render the selection as a box-drawing tree, one root per selected item.
pub fn render(selection: &[SelectionItem], options: TreeOptions) -> String {
    let mut out = String::new();
    for item in selection {
        if !included(item, options) {
            continue;
        }
        out.push_str(glyph(item));
        out.push(' ');
        out.push_str(&name_of(item));
        out.push('\n');
        render_children(&mut out, children_of(item), "", options);
    }
    out
}

fn render_children(
    out: &mut String,
    children: &[SelectionItem],
    prefix: &str,
    options: TreeOptions,
) {
    let visible: Vec<&SelectionItem> = children
        .iter()
        .filter(|child| included(child, options))
        .collect();
    let count = visible.len();
    for (index, child) in visible.into_iter().enumerate() {
        let last = index + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└─" } else { "├─" });
        out.push_str(glyph(child));
        out.push(' ');
        out.push_str(&name_of(child));
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { "   " } else { "│  " });
        render_children(out, children_of(child), &child_prefix, options);
    }
}

fn included(item: &SelectionItem, options: TreeOptions) -> bool {
    !(options.dirs_only && matches!(item, SelectionItem::File(_)))
}

fn children_of(item: &SelectionItem) -> &[SelectionItem] {
    match item {
        SelectionItem::File(_) => &[],
        SelectionItem::Folder(folder) => &folder.children,
        SelectionItem::Container(container) => &container.children,
    }
}

fn glyph(item: &SelectionItem) -> &'static str {
    match item {
        SelectionItem::File(_) => "📄",
        SelectionItem::Folder(_) | SelectionItem::Container(_) => "📁",
    }
}

fn name_of(item: &SelectionItem) -> String {
    match item {
        SelectionItem::File(file) => leaf_name(&file.path),
        SelectionItem::Folder(folder) => leaf_name(&folder.path),
        SelectionItem::Container(container) => container.name.clone(),
    }
}

fn leaf_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
