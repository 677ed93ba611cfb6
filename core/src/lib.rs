//! Core domain logic for Kiln.
//!
//! Pure state with no IO: the conversation reducer, the file-tree builder,
//! explorer view state and the selection/preview workspace. The engine owns
//! one instance of each and drives them from network events.

mod conversation;
mod explorer;
mod preview;
mod tree;
mod workspace;

pub use conversation::{Conversation, ConversationEntry, ConversationInput, Origin, Speaker, Transition};
pub use explorer::{Explorer, ExplorerRow, FileCategory, RowKind};
pub use preview::{DEFAULT_PREVIEW_TEMPLATE, PreviewTemplate, PreviewTemplateError};
pub use tree::{FileNode, FileTree, NodeKind, TreeAnomaly, TreeCounts};
pub use workspace::{Activation, SelectError, SelectionState, Workspace};
