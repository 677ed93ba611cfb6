//! Explorer view state: which directories are expanded and where the cursor is.

use std::collections::HashSet;

use crate::tree::{FileNode, FileTree};

/// Coarse file type derived from the extension, used by renderers for icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Code,
    Json,
    Text,
    Image,
    Style,
    Markup,
    Other,
}

impl FileCategory {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("js" | "jsx" | "ts" | "tsx") => Self::Code,
            Some("json") => Self::Json,
            Some("md" | "txt") => Self::Text,
            Some("png" | "jpg" | "svg" | "ico" | "gif") => Self::Image,
            Some("css" | "scss" | "sass") => Self::Style,
            Some("html") => Self::Markup,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    File(FileCategory),
    Directory { expanded: bool },
}

/// One visible line of the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerRow<'a> {
    pub depth: usize,
    pub name: &'a str,
    pub full_path: &'a str,
    pub kind: RowKind,
}

#[derive(Debug, Clone, Default)]
pub struct Explorer {
    expanded: HashSet<String>,
    cursor: usize,
}

impl Explorer {
    /// Visible rows: every root, and the children of expanded directories.
    #[must_use]
    pub fn rows<'a>(&self, tree: &'a FileTree) -> Vec<ExplorerRow<'a>> {
        let mut rows = Vec::new();
        for node in tree.roots() {
            self.push_rows(node, 0, &mut rows);
        }
        rows
    }

    fn push_rows<'a>(&self, node: &'a FileNode, depth: usize, rows: &mut Vec<ExplorerRow<'a>>) {
        if node.is_leaf() {
            rows.push(ExplorerRow {
                depth,
                name: node.name(),
                full_path: node.full_path(),
                kind: RowKind::File(FileCategory::from_name(node.name())),
            });
            return;
        }

        let expanded = self.is_expanded(node.full_path());
        rows.push(ExplorerRow {
            depth,
            name: node.name(),
            full_path: node.full_path(),
            kind: RowKind::Directory { expanded },
        });
        if expanded {
            for child in node.children() {
                self.push_rows(child, depth + 1, rows);
            }
        }
    }

    #[must_use]
    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Flip a directory's expansion. Returns the new state.
    pub fn toggle(&mut self, path: &str) -> bool {
        if self.expanded.remove(path) {
            false
        } else {
            self.expanded.insert(path.to_string());
            true
        }
    }

    /// Expand every directory on the way to `path`.
    pub fn reveal(&mut self, path: &str) {
        let mut prefix = String::new();
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                break;
            }
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            self.expanded.insert(prefix.clone());
        }
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor by `delta`, clamped to `[0, row_count)`.
    pub fn move_cursor(&mut self, delta: isize, row_count: usize) {
        if row_count == 0 {
            self.cursor = 0;
            return;
        }
        let max = row_count - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(max);
    }

    pub fn set_cursor(&mut self, index: usize, row_count: usize) {
        self.cursor = index.min(row_count.saturating_sub(1));
    }
}
