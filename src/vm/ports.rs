//! 宿主编辑器与树视图的接口
//!
//! 引擎只通过这两个 trait 与外界交互，所有出站调用都在 `&mut self` 上完成。

use std::ops::Range;

use crate::model::document::{Offset, TextEdit};
use crate::utils::clipboard::ClipboardError;
use crate::vm::bridge::{ELIGIBLE_LANGUAGES, ELIGIBLE_SCHEME};

/// 活动文档的标识信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub uri: String,
    pub scheme: String,
    pub language_id: String,
}

impl DocumentInfo {
    pub fn new(uri: impl Into<String>, scheme: impl Into<String>, language_id: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            scheme: scheme.into(),
            language_id: language_id.into(),
        }
    }

    /// 只有本地文件里的 json / jsonc 文档才会被跟踪
    pub fn is_eligible(&self) -> bool {
        self.scheme == ELIGIBLE_SCHEME && ELIGIBLE_LANGUAGES.contains(&self.language_id.as_str())
    }
}

/// 编辑器选区（字节偏移）；anchor 为起点，active 为光标所在端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub active: usize,
}

impl Selection {
    pub fn caret(offset: usize) -> Self {
        Self {
            anchor: offset,
            active: offset,
        }
    }

    pub fn new(anchor: usize, active: usize) -> Self {
        Self { anchor, active }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealOptions {
    pub select: bool,
    pub focus: bool,
    /// 向下展开的层数
    pub expand: u8,
}

/// 一次文本变更事件：按顺序可依次应用的编辑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChangeEvent {
    pub uri: String,
    pub edits: Vec<TextEdit>,
}

/// 宿主编辑器
pub trait EditorPort {
    fn active_document(&self) -> Option<DocumentInfo>;

    /// 活动文档的完整文本
    fn document_text(&self) -> Option<String>;

    /// 活动文档中一段范围的实时文本；范围无效时返回 None
    fn text_range(&self, range: Range<usize>) -> Option<String> {
        self.document_text()?.get(range).map(str::to_owned)
    }

    fn selection(&self) -> Option<Selection>;

    fn reveal_range(&mut self, range: Range<usize>);

    fn set_selection(&mut self, selection: Selection);

    fn focus_editor(&mut self);

    fn write_clipboard(&mut self, text: &str) -> Result<(), ClipboardError>;

    fn set_context_flag(&mut self, key: &str, value: bool);
}

/// 树视图宿主
pub trait VisualizationPort {
    /// 节点（None 表示整棵树）需要重新拉取
    fn tree_changed(&mut self, node: Option<Offset>);

    fn reveal(&mut self, node: Offset, options: RevealOptions);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_eligibility() {
        assert!(DocumentInfo::new("file:///a.json", "file", "json").is_eligible());
        assert!(DocumentInfo::new("file:///a.jsonc", "file", "jsonc").is_eligible());
        assert!(!DocumentInfo::new("untitled:1", "untitled", "json").is_eligible(), "未保存文档不跟踪");
        assert!(!DocumentInfo::new("file:///a.rs", "file", "rust").is_eligible());
    }

    #[test]
    fn test_selection_caret() {
        assert!(Selection::caret(5).is_empty());
        assert!(!Selection::new(2, 5).is_empty());
    }
}
