//! JSON 大纲树同步库
//!
//! 把编辑器中的 JSON/JSONC 文本映射为可导航的树，随编辑增量刷新，
//! 并支持从树节点跳转、选中和复制键/值/路径

pub mod model;
pub mod utils;
pub mod vm;

// 重新导出主要类型
pub use model::document::{DocumentError, DocumentModel, Offset, TextEdit};
pub use model::path::{render_accessor, NodePath, PathSegment};
pub use model::syntax_tree::{NodeKind, SyntaxTree};
pub use vm::bridge::Command;
pub use vm::engine::{CollapsibleState, DocumentListener, EngineOptions, SyncState, TreeItem, TreeSyncEngine};
pub use vm::ports::{DocumentInfo, EditorPort, RevealOptions, Selection, TextChangeEvent, VisualizationPort};
pub use vm::preview::{evaluate, PreviewChannel, PreviewError, PreviewPort};
