//! 内存中的端口实现：命令行宿主、性能基准和测试共用

use std::collections::HashMap;
use std::ops::Range;

use serde_json::Value;

use crate::model::document::{Offset, TextEdit};
use crate::utils::clipboard::ClipboardError;
use crate::vm::ports::{
    DocumentInfo, EditorPort, RevealOptions, Selection, TextChangeEvent, VisualizationPort,
};
use crate::vm::preview::{PreviewError, PreviewPort};

/// 只持有一个活动文档的编辑器
#[derive(Debug, Default)]
pub struct MemoryEditor {
    document: Option<(DocumentInfo, String)>,
    selection: Selection,
    revealed: Vec<Range<usize>>,
    focus_count: usize,
    clipboard: Option<String>,
    clipboard_broken: bool,
    context_flags: HashMap<String, bool>,
}

impl MemoryEditor {
    /// 打开（或切换到）一个文档，光标回到开头
    pub fn open(&mut self, info: DocumentInfo, text: impl Into<String>) {
        self.document = Some((info, text.into()));
        self.selection = Selection::default();
    }

    pub fn close(&mut self) {
        self.document = None;
    }

    /// 依次应用编辑并返回对应的变更事件；越界的编辑被跳过
    pub fn apply(&mut self, edits: &[TextEdit]) -> TextChangeEvent {
        let Some((info, text)) = self.document.as_mut() else {
            return TextChangeEvent {
                uri: String::new(),
                edits: Vec::new(),
            };
        };
        let mut applied = Vec::with_capacity(edits.len());
        for edit in edits {
            if text.get(edit.range.clone()).is_none() {
                tracing::warn!("跳过无效编辑: {:?}", edit.range);
                continue;
            }
            text.replace_range(edit.range.clone(), &edit.text);
            applied.push(edit.clone());
        }
        TextChangeEvent {
            uri: info.uri.clone(),
            edits: applied,
        }
    }

    /// 直接替换全文，不产生变更事件
    pub fn replace_text(&mut self, new_text: impl Into<String>) {
        if let Some((_, text)) = self.document.as_mut() {
            *text = new_text.into();
        }
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.selection = Selection::caret(offset);
    }

    pub fn text(&self) -> Option<&str> {
        self.document.as_ref().map(|(_, text)| text.as_str())
    }

    pub fn current_selection(&self) -> Selection {
        self.selection
    }

    pub fn revealed(&self) -> &[Range<usize>] {
        &self.revealed
    }

    pub fn focus_count(&self) -> usize {
        self.focus_count
    }

    /// 最近一次写入剪贴板的内容
    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// 让后续的剪贴板写入失败
    pub fn break_clipboard(&mut self) {
        self.clipboard_broken = true;
    }

    pub fn context_flag(&self, key: &str) -> Option<bool> {
        self.context_flags.get(key).copied()
    }
}

impl EditorPort for MemoryEditor {
    fn active_document(&self) -> Option<DocumentInfo> {
        self.document.as_ref().map(|(info, _)| info.clone())
    }

    fn document_text(&self) -> Option<String> {
        self.text().map(str::to_owned)
    }

    fn text_range(&self, range: Range<usize>) -> Option<String> {
        self.text()?.get(range).map(str::to_owned)
    }

    fn selection(&self) -> Option<Selection> {
        self.document.as_ref().map(|_| self.selection)
    }

    fn reveal_range(&mut self, range: Range<usize>) {
        self.revealed.push(range);
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    fn focus_editor(&mut self) {
        self.focus_count += 1;
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.clipboard_broken {
            return Err(ClipboardError::Clip("剪贴板不可用".to_string()));
        }
        self.clipboard = Some(text.to_owned());
        Ok(())
    }

    fn set_context_flag(&mut self, key: &str, value: bool) {
        self.context_flags.insert(key.to_owned(), value);
    }
}

/// 树视图收到的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    TreeChanged(Option<Offset>),
    Reveal(Offset, RevealOptions),
}

/// 记录所有通知的树视图
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn events(&self) -> &[ViewEvent] {
        &self.events
    }

    /// 取出并清空已记录的通知
    pub fn take(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}

impl VisualizationPort for RecordingView {
    fn tree_changed(&mut self, node: Option<Offset>) {
        self.events.push(ViewEvent::TreeChanged(node));
    }

    fn reveal(&mut self, node: Offset, options: RevealOptions) {
        self.events.push(ViewEvent::Reveal(node, options));
    }
}

/// 记录发出消息的预览面板
#[derive(Debug, Default)]
pub struct RecordingPreview {
    posted: Vec<Value>,
    broken: bool,
}

impl RecordingPreview {
    pub fn posted(&self) -> &[Value] {
        &self.posted
    }

    /// 之后的发送都会失败
    pub fn break_port(&mut self) {
        self.broken = true;
    }
}

impl PreviewPort for RecordingPreview {
    fn post(&mut self, message: &str) -> Result<(), PreviewError> {
        if self.broken {
            return Err(PreviewError::Port("面板已关闭".into()));
        }
        self.posted.push(serde_json::from_str(message)?);
        Ok(())
    }
}
