//! DocumentModel：当前文本与语法树的快照，以及位置/路径解析

use std::ops::Range;

use serde_json::Value;
use thiserror::Error;

use crate::model::parser::{ParseError, ParseOptions};
use crate::model::path::{self, NodePath};
use crate::model::syntax_tree::{quote_padding, NodeId, NodeKind, SyntaxNode, SyntaxTree};

/// 文本中的字节偏移，同时作为树节点对外的标识
pub type Offset = usize;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("编辑范围无效: {start}..{end}（文本长度 {len}）")]
    InvalidEdit { start: usize, end: usize, len: usize },
}

/// 一次离散编辑：把 `range`（字节）替换为 `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self { range, text: text.into() }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset..offset, text)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range, String::new())
    }

    /// 被替换或插入的文本里是否含有会改变结构的字符
    pub fn is_structural(&self, old_text: &str) -> bool {
        const STRUCTURAL: &[char] = &['{', '}', '[', ']', ',', ':', '"', '/'];
        let Some(replaced) = old_text.get(self.range.clone()) else {
            return true;
        };
        replaced.contains(STRUCTURAL) || self.text.contains(STRUCTURAL)
    }
}

/// 文本与语法树总是一起替换
#[derive(Debug, Default)]
struct Snapshot {
    text: String,
    tree: Option<SyntaxTree>,
}

#[derive(Debug, Default)]
pub struct DocumentModel {
    snapshot: Snapshot,
    options: ParseOptions,
    generation: u64,
}

impl DocumentModel {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// 用新文本整体替换快照；空文本或无文本时清空
    pub fn refresh(&mut self, text: Option<&str>) {
        let next = match text.filter(|t| !t.is_empty()) {
            Some(text) => Snapshot {
                text: text.to_owned(),
                tree: Some(SyntaxTree::parse_with(text, &self.options)),
            },
            None => Snapshot::default(),
        };
        self.snapshot = next;
        self.generation += 1;
        tracing::debug!(
            "快照已刷新: 第 {} 代，{} 字节，{} 个节点，{} 个诊断",
            self.generation,
            self.snapshot.text.len(),
            self.snapshot.tree.as_ref().map_or(0, SyntaxTree::len),
            self.errors().len()
        );
    }

    pub fn clear(&mut self) {
        self.refresh(None);
    }

    /// 把一次编辑拼接进当前文本并重新解析
    pub fn apply_edit(&mut self, edit: &TextEdit) -> Result<(), DocumentError> {
        let text = &self.snapshot.text;
        let Range { start, end } = edit.range;
        if start > end || end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(DocumentError::InvalidEdit {
                start,
                end,
                len: text.len(),
            });
        }
        let mut next = String::with_capacity(text.len() - (end - start) + edit.text.len());
        next.push_str(&text[..start]);
        next.push_str(&edit.text);
        next.push_str(&text[end..]);
        self.refresh(Some(&next));
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.snapshot.text
    }

    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.snapshot.tree.as_ref()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.tree()?.root()
    }

    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.tree()?.node(id)
    }

    pub fn errors(&self) -> &[ParseError] {
        self.tree().map(SyntaxTree::errors).unwrap_or_default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// 偏移处最窄节点的路径；无根节点时为空路径
    pub fn location_path(&self, offset: Offset) -> NodePath {
        self.tree()
            .map(|tree| path::locate(tree, offset).path)
            .unwrap_or_default()
    }

    /// 在当前树上解析路径；路径已失效时返回 None
    pub fn node_at(&self, path: &[path::PathSegment]) -> Option<NodeId> {
        self.tree()?.find_node_at_path(path)
    }

    /// 偏移 → 路径 → 节点
    pub fn resolve(&self, offset: Offset) -> Option<NodeId> {
        self.node_at(&self.location_path(offset))
    }

    pub fn path_of(&self, id: NodeId) -> NodePath {
        self.tree().map(|tree| tree.path_of(id)).unwrap_or_default()
    }

    /// 值节点对外的标识：对象成员取所在属性的偏移，其余取自身偏移；根节点没有标识
    pub fn entry_offset(&self, id: NodeId) -> Option<Offset> {
        let tree = self.tree()?;
        let parent = tree.node(id)?.parent?;
        match tree[parent].kind {
            NodeKind::Property => Some(tree[parent].offset),
            _ => Some(tree[id].offset),
        }
    }

    /// 节点的值范围，字符串去掉两端引号
    pub fn content_range(&self, id: NodeId) -> Option<Range<usize>> {
        let node = self.node(id)?;
        let raw = self.snapshot.text.get(node.offset..node.end())?;
        let (leading, trailing) = quote_padding(node.kind, raw);
        Some(node.offset + leading..node.end() - trailing)
    }

    /// 整个文档的 JSON 值（供预览通道使用）
    pub fn to_value(&self) -> Option<Value> {
        let tree = self.tree()?;
        tree.to_value(tree.root()?)
    }
}
