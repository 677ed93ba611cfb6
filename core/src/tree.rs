//! Flat manifest → hierarchical file tree.
//!
//! The build runs in two passes. Records are folded into an arena of slots,
//! each directory holding its children in first-insertion order plus a
//! name index. The arena is then projected once into owned [`FileNode`]s.
//!
//! Path handling:
//! - empty segments are dropped, so `/a//b/` is the same file as `a/b`;
//! - a record with no non-empty segment is skipped;
//! - the first structural assignment of a path wins: a record that would
//!   descend through an existing file, or end on an existing directory, is
//!   rejected;
//! - repeated file paths keep their first position and the last content.
//!
//! Rejected records are reported as [`TreeAnomaly`] values; they never abort
//! the build.

use std::collections::HashMap;
use std::fmt;

use kiln_types::FileRecord;

/// A materialized node of the file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    name: String,
    full_path: String,
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File { content: String },
    Directory { children: Vec<FileNode> },
}

impl FileNode {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `/`-joined segment chain from the root.
    #[must_use]
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Children in first-insertion order. Empty for files.
    #[must_use]
    pub fn children(&self) -> &[FileNode] {
        match &self.kind {
            NodeKind::File { .. } => &[],
            NodeKind::Directory { children } => children,
        }
    }
}

/// A record that could not be placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeAnomaly {
    /// The path had no non-empty segment.
    EmptyPath { path: String },
    /// The path runs through a node that is already a file.
    ThroughFile { path: String, file: String },
    /// The path ends on a node that is already a directory.
    OntoDirectory { path: String },
}

impl fmt::Display for TreeAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath { path } => write!(f, "skipped record with empty path {path:?}"),
            Self::ThroughFile { path, file } => {
                write!(f, "skipped {path:?}: {file:?} is already a file")
            }
            Self::OntoDirectory { path } => {
                write!(f, "skipped {path:?}: already a directory")
            }
        }
    }
}

/// File and folder totals of a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCounts {
    pub files: usize,
    pub folders: usize,
}

/// Result of one build: root nodes plus the records that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    roots: Vec<FileNode>,
    anomalies: Vec<TreeAnomaly>,
}

impl FileTree {
    /// Build a tree from a flat record list.
    #[must_use]
    pub fn build(records: &[FileRecord]) -> Self {
        let mut arena = Arena::default();
        for record in records {
            arena.insert(record);
        }
        arena.project()
    }

    #[must_use]
    pub fn roots(&self) -> &[FileNode] {
        &self.roots
    }

    #[must_use]
    pub fn anomalies(&self) -> &[TreeAnomaly] {
        &self.anomalies
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Walk `path` segment by segment from the roots.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        let mut level = self.roots.as_slice();
        let mut found = None;
        for segment in segments(path) {
            let node = level.iter().find(|node| node.name == segment)?;
            level = node.children();
            found = Some(node);
        }
        found
    }

    /// Leaves in tree order (depth-first, children in insertion order).
    pub fn leaves(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes().filter(|node| node.is_leaf())
    }

    #[must_use]
    pub fn first_leaf(&self) -> Option<&FileNode> {
        self.leaves().next()
    }

    /// All nodes in tree order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        let mut stack: Vec<&FileNode> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }

    #[must_use]
    pub fn counts(&self) -> TreeCounts {
        self.nodes()
            .fold(TreeCounts::default(), |mut counts, node| {
                if node.is_leaf() {
                    counts.files += 1;
                } else {
                    counts.folders += 1;
                }
                counts
            })
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

// ============================================================================
// Arena
// ============================================================================

type SlotId = usize;

#[derive(Debug)]
enum SlotKind {
    File {
        content: String,
    },
    Directory {
        order: Vec<SlotId>,
        index: HashMap<String, SlotId>,
    },
}

#[derive(Debug)]
struct Slot {
    name: String,
    full_path: String,
    kind: SlotKind,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    roots: Vec<SlotId>,
    root_index: HashMap<String, SlotId>,
    anomalies: Vec<TreeAnomaly>,
}

impl Arena {
    fn insert(&mut self, record: &FileRecord) {
        let parts: Vec<&str> = segments(&record.path).collect();
        if parts.is_empty() {
            self.anomalies.push(TreeAnomaly::EmptyPath {
                path: record.path.clone(),
            });
            return;
        }

        let mut parent: Option<SlotId> = None;
        for (depth, part) in parts.iter().enumerate() {
            let is_last = depth + 1 == parts.len();
            let Some(existing) = self.child(parent, part) else {
                let kind = if is_last {
                    SlotKind::File {
                        content: record.content.clone(),
                    }
                } else {
                    SlotKind::Directory {
                        order: Vec::new(),
                        index: HashMap::new(),
                    }
                };
                let full_path = parts[..=depth].join("/");
                parent = Some(self.attach(parent, part, full_path, kind));
                continue;
            };

            let slot = &mut self.slots[existing];
            match (&mut slot.kind, is_last) {
                (SlotKind::File { content }, true) => content.clone_from(&record.content),
                (SlotKind::File { .. }, false) => {
                    self.anomalies.push(TreeAnomaly::ThroughFile {
                        path: parts.join("/"),
                        file: slot.full_path.clone(),
                    });
                    return;
                }
                (SlotKind::Directory { .. }, true) => {
                    self.anomalies.push(TreeAnomaly::OntoDirectory {
                        path: parts.join("/"),
                    });
                    return;
                }
                (SlotKind::Directory { .. }, false) => parent = Some(existing),
            }
        }
    }

    fn child(&self, parent: Option<SlotId>, name: &str) -> Option<SlotId> {
        match parent {
            None => self.root_index.get(name).copied(),
            Some(id) => match &self.slots[id].kind {
                SlotKind::Directory { index, .. } => index.get(name).copied(),
                SlotKind::File { .. } => None,
            },
        }
    }

    fn attach(
        &mut self,
        parent: Option<SlotId>,
        name: &str,
        full_path: String,
        kind: SlotKind,
    ) -> SlotId {
        let id = self.slots.len();
        self.slots.push(Slot {
            name: name.to_string(),
            full_path,
            kind,
        });
        let (order, index) = match parent {
            None => (&mut self.roots, &mut self.root_index),
            Some(parent) => match &mut self.slots[parent].kind {
                SlotKind::Directory { order, index } => (order, index),
                // `child` never hands out a file as a parent.
                SlotKind::File { .. } => unreachable!("files have no children"),
            },
        };
        order.push(id);
        index.insert(name.to_string(), id);
        id
    }

    fn project(mut self) -> FileTree {
        let roots = std::mem::take(&mut self.roots);
        let nodes = roots.iter().map(|&id| self.project_slot(id)).collect();
        FileTree {
            roots: nodes,
            anomalies: self.anomalies,
        }
    }

    fn project_slot(&mut self, id: SlotId) -> FileNode {
        let placeholder = SlotKind::File {
            content: String::new(),
        };
        let slot = &mut self.slots[id];
        let name = std::mem::take(&mut slot.name);
        let full_path = std::mem::take(&mut slot.full_path);
        let kind = match std::mem::replace(&mut slot.kind, placeholder) {
            SlotKind::File { content } => NodeKind::File { content },
            SlotKind::Directory { order, .. } => NodeKind::Directory {
                children: order
                    .into_iter()
                    .map(|child| self.project_slot(child))
                    .collect(),
            },
        };
        FileNode {
            name,
            full_path,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileTree, TreeAnomaly, TreeCounts};
    use kiln_types::FileRecord;
    use pretty_assertions::assert_eq;

    fn records(items: &[(&str, &str)]) -> Vec<FileRecord> {
        items
            .iter()
            .map(|(path, content)| FileRecord::new(*path, *content))
            .collect()
    }

    fn names(nodes: &[super::FileNode]) -> Vec<&str> {
        nodes.iter().map(super::FileNode::name).collect()
    }

    #[test]
    fn package_json_and_src_scenario() {
        let tree = FileTree::build(&records(&[("package.json", "{}"), ("src/app.ts", "x")]));
        assert_eq!(names(tree.roots()), vec!["package.json", "src"]);

        let package = &tree.roots()[0];
        assert!(package.is_leaf());
        assert_eq!(package.content(), Some("{}"));

        let src = &tree.roots()[1];
        assert!(!src.is_leaf());
        assert_eq!(src.content(), None);
        assert_eq!(names(src.children()), vec!["app.ts"]);
        assert_eq!(src.children()[0].full_path(), "src/app.ts");
        assert_eq!(src.children()[0].content(), Some("x"));
    }

    #[test]
    fn children_keep_first_insertion_order() {
        let tree = FileTree::build(&records(&[
            ("src/z.ts", ""),
            ("src/a.ts", ""),
            ("README.md", ""),
            ("src/m/b.ts", ""),
        ]));
        assert_eq!(names(tree.roots()), vec!["src", "README.md"]);
        assert_eq!(names(tree.roots()[0].children()), vec!["z.ts", "a.ts", "m"]);
    }

    #[test]
    fn build_is_deterministic() {
        let input = records(&[
            ("src/components/Header.tsx", "h"),
            ("index.html", "<html>"),
            ("src/main.tsx", "m"),
            ("src/components/Footer.tsx", "f"),
        ]);
        assert_eq!(FileTree::build(&input), FileTree::build(&input));
    }

    #[test]
    fn full_path_round_trips_through_find() {
        let paths = [
            "package.json",
            "src/app.ts",
            "src/components/ui/button.tsx",
            "public/favicon.ico",
        ];
        let input: Vec<FileRecord> = paths.iter().map(|p| FileRecord::new(*p, "")).collect();
        let tree = FileTree::build(&input);
        for path in paths {
            let node = tree.find(path).unwrap();
            assert_eq!(node.full_path(), path);
        }
        for node in tree.nodes() {
            assert_eq!(tree.find(node.full_path()).unwrap(), node);
        }
    }

    #[test]
    fn duplicate_path_keeps_position_and_last_content() {
        let tree = FileTree::build(&records(&[
            ("a.ts", "first"),
            ("b.ts", "b"),
            ("a.ts", "second"),
        ]));
        assert_eq!(names(tree.roots()), vec!["a.ts", "b.ts"]);
        assert_eq!(tree.find("a.ts").unwrap().content(), Some("second"));
        assert!(tree.anomalies().is_empty());
    }

    #[test]
    fn empty_segments_are_normalized() {
        let tree = FileTree::build(&records(&[("/src//app.ts/", "x"), ("src/b.ts", "y")]));
        assert_eq!(names(tree.roots()), vec!["src"]);
        assert_eq!(tree.find("src/app.ts").unwrap().full_path(), "src/app.ts");
        assert_eq!(tree.roots()[0].children().len(), 2);
    }

    #[test]
    fn empty_path_is_reported_and_skipped() {
        let tree = FileTree::build(&records(&[("", "x"), ("//", "y"), ("a.ts", "z")]));
        assert_eq!(names(tree.roots()), vec!["a.ts"]);
        assert_eq!(
            tree.anomalies(),
            &[
                TreeAnomaly::EmptyPath { path: String::new() },
                TreeAnomaly::EmptyPath {
                    path: "//".to_string()
                },
            ]
        );
    }

    #[test]
    fn file_first_blocks_directory_with_same_name() {
        let tree = FileTree::build(&records(&[("lib", "file"), ("lib/util.ts", "u")]));
        let lib = tree.find("lib").unwrap();
        assert!(lib.is_leaf());
        assert_eq!(lib.content(), Some("file"));
        assert!(tree.find("lib/util.ts").is_none());
        assert_eq!(
            tree.anomalies(),
            &[TreeAnomaly::ThroughFile {
                path: "lib/util.ts".to_string(),
                file: "lib".to_string(),
            }]
        );
    }

    #[test]
    fn directory_first_blocks_file_with_same_name() {
        let tree = FileTree::build(&records(&[("lib/util.ts", "u"), ("lib", "file")]));
        let lib = tree.find("lib").unwrap();
        assert!(!lib.is_leaf());
        assert_eq!(names(lib.children()), vec!["util.ts"]);
        assert_eq!(
            tree.anomalies(),
            &[TreeAnomaly::OntoDirectory {
                path: "lib".to_string()
            }]
        );
    }

    #[test]
    fn first_leaf_follows_tree_order() {
        let tree = FileTree::build(&records(&[
            ("src/main.tsx", "m"),
            ("package.json", "{}"),
        ]));
        assert_eq!(tree.first_leaf().unwrap().full_path(), "src/main.tsx");
        assert!(FileTree::build(&[]).first_leaf().is_none());
    }

    #[test]
    fn leaves_walk_depth_first() {
        let tree = FileTree::build(&records(&[
            ("a/b/c.ts", ""),
            ("a/d.ts", ""),
            ("e.ts", ""),
            ("a/b/f.ts", ""),
        ]));
        let order: Vec<&str> = tree.leaves().map(super::FileNode::full_path).collect();
        assert_eq!(order, vec!["a/b/c.ts", "a/b/f.ts", "a/d.ts", "e.ts"]);
    }

    #[test]
    fn counts_files_and_folders() {
        let tree = FileTree::build(&records(&[
            ("package.json", ""),
            ("src/app.ts", ""),
            ("src/ui/button.tsx", ""),
        ]));
        assert_eq!(tree.counts(), TreeCounts { files: 3, folders: 2 });
        assert_eq!(FileTree::default().counts(), TreeCounts::default());
    }
}
