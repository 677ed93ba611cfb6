//! Generated-project workspace: the current file tree, the selected file, the
//! preview endpoint, and explorer view state.
//!
//! A rebuild always clears everything at once, so a stale selection can never
//! point into a freshly installed tree.

use thiserror::Error;

use crate::explorer::{Explorer, RowKind};
use crate::tree::{FileNode, FileTree};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected_path: Option<String>,
    preview_endpoint: Option<String>,
}

impl SelectionState {
    #[must_use]
    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    #[must_use]
    pub fn preview_endpoint(&self) -> Option<&str> {
        self.preview_endpoint.as_deref()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("no file at {0}")]
    NotFound(String),
    #[error("{0} is a directory")]
    NotAFile(String),
}

/// Result of activating the explorer row under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Selected(String),
    Toggled { path: String, expanded: bool },
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    tree: FileTree,
    selection: SelectionState,
    explorer: Explorer,
    generation: u64,
}

impl Workspace {
    /// Drop the current tree, selection and preview ahead of a new fetch.
    pub fn begin_rebuild(&mut self) {
        self.tree = FileTree::default();
        self.selection = SelectionState::default();
        self.explorer = Explorer::default();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Install a freshly built tree. The first leaf in depth-first order
    /// becomes the selection and its ancestors are expanded.
    pub fn install(&mut self, tree: FileTree, preview_endpoint: Option<String>) {
        let selected_path = tree.first_leaf().map(|leaf| leaf.full_path().to_string());
        let mut explorer = Explorer::default();
        if let Some(path) = &selected_path {
            explorer.reveal(path);
        }
        self.tree = tree;
        self.selection = SelectionState {
            selected_path,
            preview_endpoint,
        };
        self.explorer = explorer;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn select(&mut self, path: &str) -> Result<(), SelectError> {
        let node = self
            .tree
            .find(path)
            .ok_or_else(|| SelectError::NotFound(path.to_string()))?;
        if !node.is_leaf() {
            return Err(SelectError::NotAFile(path.to_string()));
        }
        self.selection.selected_path = Some(node.full_path().to_string());
        Ok(())
    }

    /// Toggle the directory or select the file under the explorer cursor.
    pub fn activate_cursor(&mut self) -> Option<Activation> {
        let rows = self.explorer.rows(&self.tree);
        let row = rows.get(self.explorer.cursor())?;
        let path = row.full_path.to_string();
        let kind = row.kind;

        match kind {
            RowKind::File(_) => {
                self.selection.selected_path = Some(path.clone());
                Some(Activation::Selected(path))
            }
            RowKind::Directory { .. } => {
                let expanded = self.explorer.toggle(&path);
                Some(Activation::Toggled { path, expanded })
            }
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let count = self.explorer.rows(&self.tree).len();
        self.explorer.move_cursor(delta, count);
    }

    #[must_use]
    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    #[must_use]
    pub fn selected_file(&self) -> Option<&FileNode> {
        self.selection
            .selected_path()
            .and_then(|path| self.tree.find(path))
    }

    #[must_use]
    pub fn selected_content(&self) -> Option<&str> {
        self.selected_file().and_then(FileNode::content)
    }

    #[must_use]
    pub fn preview_endpoint(&self) -> Option<&str> {
        self.selection.preview_endpoint()
    }

    /// Bumped on every rebuild and install; renderers use it to reset scroll.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
