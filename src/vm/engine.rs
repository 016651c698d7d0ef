//! 树同步引擎：把编辑器中的文本映射为以偏移标识的树，并随编辑增量通知树视图
//!
//! 节点对外只暴露偏移；每次查询都按路径在当前快照上重新解析，
//! 不在两次事件之间持有节点引用。

use std::ops::Range;
use std::time::Instant;

use serde_json::Value;

use crate::model::document::{DocumentModel, Offset, TextEdit};
use crate::model::parser::ParseOptions;
use crate::model::path::{render_accessor, NodePath, PathSegment};
use crate::model::syntax_tree::{strip_quotes, NodeId, NodeKind};
use crate::vm::bridge::{Command, DEFAULT_REVEAL_EXPAND_LEVELS, TREE_ACTIVE_CONTEXT};
use crate::vm::ports::{DocumentInfo, EditorPort, RevealOptions, Selection, TextChangeEvent, VisualizationPort};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// 光标跟随时展开的层数
    pub reveal_expand_levels: u8,
    pub parse: ParseOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            reveal_expand_levels: DEFAULT_REVEAL_EXPAND_LEVELS,
            parse: ParseOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsibleState {
    Expanded,
    Collapsed,
    None,
}

/// 树视图渲染一个节点所需的全部信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub id: Offset,
    pub label: String,
    pub collapsible: CollapsibleState,
    /// 节点类型名，宿主用它决定可用的菜单项
    pub context_value: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Inactive,
    Active,
}

/// 文档刷新后的回调，预览通道从这里取得最新文档
pub type DocumentListener = Box<dyn FnMut(Option<Value>)>;

/// 重解析前按旧树确定的通知条目，连同它的路径
struct ScopedEntry {
    offset: Offset,
    path: NodePath,
}

/// 一次编辑的通知范围；两者都失效时整树刷新
struct EditScope {
    /// 非结构性编辑只刷新所在条目
    narrow: Option<ScopedEntry>,
    /// 上退一层后的条目
    fallback: Option<ScopedEntry>,
}

pub struct TreeSyncEngine<E, V> {
    editor: E,
    view: V,
    model: DocumentModel,
    tracked: Option<DocumentInfo>,
    options: EngineOptions,
    document_listener: Option<DocumentListener>,
}

impl<E: EditorPort, V: VisualizationPort> TreeSyncEngine<E, V> {
    pub fn new(editor: E, view: V) -> Self {
        Self::with_options(editor, view, EngineOptions::default())
    }

    pub fn with_options(editor: E, view: V, options: EngineOptions) -> Self {
        Self {
            editor,
            view,
            model: DocumentModel::new(options.parse.clone()),
            tracked: None,
            options,
            document_listener: None,
        }
    }

    /// 注册文档刷新回调：焦点切换、重新加载和每批编辑之后各调用一次
    pub fn set_document_listener(&mut self, listener: impl FnMut(Option<Value>) + 'static) {
        self.document_listener = Some(Box::new(listener));
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn state(&self) -> SyncState {
        if self.tracked.is_some() {
            SyncState::Active
        } else {
            SyncState::Inactive
        }
    }

    /// 解析后的整个文档（预览通道使用）
    pub fn document_value(&self) -> Option<Value> {
        self.model.to_value()
    }

    // === 宿主事件 ===

    /// 活动编辑器切换：重新确定跟踪的文档并整树刷新
    pub fn on_focus_changed(&mut self) {
        let start_time = Instant::now();
        let active = self.editor.active_document().filter(DocumentInfo::is_eligible);
        self.editor.set_context_flag(TREE_ACTIVE_CONTEXT, active.is_some());
        match &active {
            Some(info) => tracing::info!("开始跟踪文档: {}", info.uri),
            None => tracing::info!("当前文档不可跟踪，树视图置空"),
        }
        self.tracked = active;
        self.refresh();
        tracing::info!(
            "焦点切换处理完成: {} 个顶层节点，耗时: {:.1}ms",
            self.children(None).len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
    }

    /// 从编辑器重新加载并整树刷新；任何状态下都可调用
    pub fn refresh(&mut self) {
        self.reload();
        self.view.tree_changed(None);
        self.notify_document();
    }

    fn notify_document(&mut self) {
        if self.document_listener.is_none() {
            return;
        }
        let document = self.model.to_value();
        if let Some(listener) = self.document_listener.as_mut() {
            listener(document);
        }
    }

    fn reload(&mut self) {
        let text = match self.tracked {
            Some(_) => self.editor.document_text(),
            None => None,
        };
        self.model.refresh(text.as_deref());
    }

    /// 按顺序处理一批编辑：先在旧树上确定通知范围，再拼接重解析，最后通知
    pub fn on_text_changed(&mut self, event: &TextChangeEvent) {
        match &self.tracked {
            Some(info) if info.uri == event.uri => {}
            _ => {
                tracing::debug!("忽略未跟踪文档的变更: {}", event.uri);
                return;
            }
        }

        let start_time = Instant::now();
        for edit in &event.edits {
            let scope = self.edit_scope(edit);
            if let Err(e) = self.model.apply_edit(edit) {
                tracing::warn!("编辑无法应用，从编辑器重新加载: {}", e);
                self.refresh();
                return;
            }
            let target = self.settle_scope(scope);
            self.view.tree_changed(target);
        }

        match self.editor.document_text() {
            Some(live) if live != self.model.text() => {
                tracing::warn!("编辑后文本与编辑器不一致，重新加载");
                self.refresh();
            }
            _ => self.notify_document(),
        }
        tracing::debug!(
            "处理 {} 个编辑，耗时: {:.2}ms",
            event.edits.len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
    }

    /// 在旧树上确定编辑的通知范围
    fn edit_scope(&self, edit: &TextEdit) -> EditScope {
        let mut path = self.model.location_path(edit.range.start);
        if path.is_empty() {
            return EditScope {
                narrow: None,
                fallback: None,
            };
        }
        let narrow = if edit.is_structural(self.model.text()) {
            None
        } else {
            self.member_entry(&path)
        };
        path.pop();
        EditScope {
            narrow,
            fallback: self.scoped_entry(path),
        }
    }

    /// 被编辑节点所在的条目：对象成员是它自己，数组元素是所在数组
    fn member_entry(&self, path: &[PathSegment]) -> Option<ScopedEntry> {
        let node = self.model.node_at(path)?;
        let tree = self.model.tree()?;
        let parent = tree[node].parent?;
        let (_, parent_path) = path.split_last()?;
        match tree[parent].kind {
            NodeKind::Property => self.scoped_entry(path.to_vec()),
            _ => self.scoped_entry(parent_path.to_vec()),
        }
    }

    fn scoped_entry(&self, path: NodePath) -> Option<ScopedEntry> {
        if path.is_empty() {
            return None;
        }
        let offset = self.model.entry_offset(self.model.node_at(&path)?)?;
        Some(ScopedEntry { offset, path })
    }

    /// 重解析后仍落在原路径上的条目才可用：值被删掉的成员会从父节点的子节点中消失，
    /// 这时退到上一层
    fn settle_scope(&self, scope: EditScope) -> Option<Offset> {
        scope
            .narrow
            .into_iter()
            .chain(scope.fallback)
            .find(|entry| {
                self.model
                    .node_at(&entry.path)
                    .and_then(|node| self.model.entry_offset(node))
                    == Some(entry.offset)
            })
            .map(|entry| entry.offset)
    }

    /// 光标移动时让树视图跟随（不抢焦点、不选中）
    pub fn on_selection_changed(&mut self) {
        if self.tracked.is_none() {
            return;
        }
        let Some(selection) = self.editor.selection() else {
            return;
        };
        if !selection.is_empty() {
            return;
        }
        let Some(entry) = self
            .model
            .resolve(selection.active)
            .and_then(|node| self.model.entry_offset(node))
        else {
            return;
        };
        self.view.reveal(
            entry,
            RevealOptions {
                select: false,
                focus: false,
                expand: self.options.reveal_expand_levels,
            },
        );
    }

    // === 树视图查询 ===

    /// 子节点标识，保持源码顺序；无法回到自身的子节点（重复键、缺值属性）被省略
    pub fn children(&self, offset: Option<Offset>) -> Vec<Offset> {
        let Some(node) = self.node_for(offset) else {
            return Vec::new();
        };
        let Some(tree) = self.model.tree() else {
            return Vec::new();
        };
        let values: Vec<NodeId> = match tree[node].kind {
            NodeKind::Object => tree[node]
                .children
                .iter()
                .filter_map(|&property| tree.property_value(property))
                .collect(),
            NodeKind::Array => tree[node].children.clone(),
            _ => Vec::new(),
        };
        values
            .into_iter()
            .filter_map(|child| {
                let entry = self.model.entry_offset(child)?;
                (self.model.resolve(entry) == Some(child)).then_some(entry)
            })
            .collect()
    }

    pub fn label(&self, offset: Offset) -> Option<String> {
        self.label_of(self.model.resolve(offset)?)
    }

    /// 根节点的标签：`{ }`、`[ ]` 或标量值；没有文档时为 None
    pub fn root_label(&self) -> Option<String> {
        self.label_of(self.model.root()?)
    }

    fn label_of(&self, node: NodeId) -> Option<String> {
        let tree = self.model.tree()?;
        let prefix = match tree[node].parent {
            Some(parent) if tree[parent].kind == NodeKind::Property => {
                Some(tree.property_key(parent)?.to_owned())
            }
            Some(_) => Some(tree.index_in_parent(node)?.to_string()),
            None => None,
        };
        let body = match tree[node].kind {
            NodeKind::Object => "{ }".to_string(),
            NodeKind::Array => "[ ]".to_string(),
            _ => self.rendered_value(node)?,
        };
        let label = match (prefix, tree[node].kind.is_container()) {
            (None, _) => body,
            (Some(prefix), true) => format!("{} {}", body, prefix),
            (Some(prefix), false) => format!("{}: {}", prefix, body),
        };
        Some(label)
    }

    pub fn collapsible_state(&self, offset: Offset) -> CollapsibleState {
        let kind = self
            .model
            .resolve(offset)
            .and_then(|node| self.model.node(node))
            .map(|node| node.kind);
        match kind {
            Some(NodeKind::Object) => CollapsibleState::Expanded,
            Some(NodeKind::Array) => CollapsibleState::Collapsed,
            _ => CollapsibleState::None,
        }
    }

    pub fn tree_item(&self, offset: Offset) -> Option<TreeItem> {
        let node = self.model.resolve(offset)?;
        Some(TreeItem {
            id: offset,
            label: self.label(offset)?,
            collapsible: self.collapsible_state(offset),
            context_value: self.model.node(node)?.kind.as_str(),
        })
    }

    /// 所在容器的标识；根节点和顶层子节点返回 None
    pub fn parent_of(&self, offset: Offset) -> Option<Offset> {
        let node = self.model.resolve(offset)?;
        let tree = self.model.tree()?;
        let mut container = tree[node].parent?;
        if tree[container].kind == NodeKind::Property {
            container = tree[container].parent?;
        }
        let parent = self.model.entry_offset(container)?;
        (parent != offset).then_some(parent)
    }

    fn node_for(&self, offset: Option<Offset>) -> Option<NodeId> {
        match offset {
            None => self.model.root(),
            Some(offset) => self.model.resolve(offset),
        }
    }

    /// 节点的实时文本（字符串去掉两端引号）；编辑器取不到时退回快照文本
    fn rendered_value(&self, node: NodeId) -> Option<String> {
        let syntax = self.model.node(node)?;
        let range = syntax.offset..syntax.end();
        let raw = match self.editor.text_range(range.clone()) {
            Some(live) => live,
            None => self.model.text().get(range)?.to_owned(),
        };
        Some(strip_quotes(syntax.kind, &raw).to_owned())
    }

    // === 节点命令 ===

    pub fn execute(&mut self, command: Command, offset: Offset) {
        tracing::debug!("执行命令 {} @ {}", command, offset);
        match command {
            Command::SelectNode => self.select_node(offset),
            Command::HighlightValue => self.highlight_value(offset),
            Command::JumpToEnd => self.jump_to_end(offset),
            Command::CopyValue => self.copy_value(offset),
            Command::CopyKey => self.copy_key(offset),
            Command::CopyPath => self.copy_path(offset),
        }
    }

    fn content_range_at(&self, offset: Offset) -> Option<Range<usize>> {
        self.model.content_range(self.model.resolve(offset)?)
    }

    /// 在编辑器中显示节点，光标移到值的末尾
    pub fn select_node(&mut self, offset: Offset) {
        let Some(range) = self.content_range_at(offset) else {
            return;
        };
        self.editor.reveal_range(range.clone());
        self.editor.set_selection(Selection::caret(range.end));
    }

    /// 选中整个值并聚焦编辑器
    pub fn highlight_value(&mut self, offset: Offset) {
        let Some(range) = self.content_range_at(offset) else {
            return;
        };
        self.editor.set_selection(Selection::new(range.start, range.end));
        self.editor.reveal_range(range);
        self.editor.focus_editor();
    }

    pub fn jump_to_end(&mut self, offset: Offset) {
        let Some(range) = self.content_range_at(offset) else {
            return;
        };
        self.editor.set_selection(Selection::caret(range.end));
        self.editor.reveal_range(range);
        self.editor.focus_editor();
    }

    pub fn copy_value(&mut self, offset: Offset) {
        let Some(text) = self.model.resolve(offset).and_then(|node| self.rendered_value(node)) else {
            return;
        };
        self.copy(&text);
    }

    /// 复制键名；数组元素复制下标
    pub fn copy_key(&mut self, offset: Offset) {
        let Some(node) = self.model.resolve(offset) else {
            return;
        };
        let Some(last) = self.model.path_of(node).pop() else {
            return;
        };
        let key = match last {
            PathSegment::Key(key) => key,
            PathSegment::Index(index) => index.to_string(),
        };
        self.copy(&key);
    }

    /// 复制形如 `['a'][0]['b']` 的访问路径
    pub fn copy_path(&mut self, offset: Offset) {
        let Some(node) = self.model.resolve(offset) else {
            return;
        };
        let accessor = render_accessor(&self.model.path_of(node));
        self.copy(&accessor);
    }

    fn copy(&mut self, text: &str) {
        match self.editor.write_clipboard(text) {
            Ok(()) => tracing::info!("内容已复制到剪贴板，长度: {} 字符", text.chars().count()),
            Err(e) => tracing::warn!("复制失败: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::headless::{MemoryEditor, RecordingPreview, RecordingView, ViewEvent};
    use crate::vm::preview::PreviewChannel;
    use serde_json::json;
    use std::{cell::RefCell, rc::Rc};

    const URI: &str = "file:///test.json";

    fn engine_with(text: &str) -> TreeSyncEngine<MemoryEditor, RecordingView> {
        let mut editor = MemoryEditor::default();
        editor.open(DocumentInfo::new(URI, "file", "json"), text);
        let mut engine = TreeSyncEngine::new(editor, RecordingView::default());
        engine.on_focus_changed();
        engine.view_mut().take();
        engine
    }

    fn key_offset(text: &str, key: &str) -> Offset {
        text.find(&format!("\"{}\"", key)).expect("键应该存在")
    }

    fn edit(engine: &mut TreeSyncEngine<MemoryEditor, RecordingView>, edits: &[TextEdit]) -> Vec<ViewEvent> {
        let event = engine.editor_mut().apply(edits);
        engine.on_text_changed(&event);
        engine.view_mut().take()
    }

    #[test]
    fn test_focus_on_eligible_document() {
        let mut editor = MemoryEditor::default();
        editor.open(DocumentInfo::new(URI, "file", "jsonc"), r#"{"a": 1}"#);
        let mut engine = TreeSyncEngine::new(editor, RecordingView::default());
        assert_eq!(engine.state(), SyncState::Inactive);

        engine.on_focus_changed();
        assert_eq!(engine.state(), SyncState::Active);
        assert_eq!(engine.editor().context_flag(TREE_ACTIVE_CONTEXT), Some(true));
        assert_eq!(engine.view().events(), &[ViewEvent::TreeChanged(None)]);
        assert_eq!(engine.children(None), vec![1]);
    }

    #[test]
    fn test_focus_on_ineligible_document() {
        let mut engine = engine_with(r#"{"a": 1}"#);
        engine
            .editor_mut()
            .open(DocumentInfo::new("file:///main.rs", "file", "rust"), "fn main() {}");
        engine.on_focus_changed();

        assert_eq!(engine.state(), SyncState::Inactive);
        assert_eq!(engine.editor().context_flag(TREE_ACTIVE_CONTEXT), Some(false));
        assert_eq!(engine.view_mut().take(), vec![ViewEvent::TreeChanged(None)]);
        assert!(engine.children(None).is_empty(), "不跟踪时树为空");
        assert!(engine.label(0).is_none());
        assert!(engine.root_label().is_none());

        engine.copy_path(0);
        assert!(engine.editor().clipboard().is_none(), "不跟踪时命令不生效");
    }

    #[test]
    fn test_root_children_in_source_order() {
        let text = r#"{"b": 1, "a": [1, 2], "c": {}}"#;
        let engine = engine_with(text);
        assert_eq!(
            engine.children(None),
            vec![key_offset(text, "b"), key_offset(text, "a"), key_offset(text, "c")]
        );
        assert!(engine.children(Some(key_offset(text, "b"))).is_empty(), "标量没有子节点");
    }

    #[test]
    fn test_array_children_and_labels() {
        let text = r#"[{"x": 1}, [2], "s"]"#;
        let engine = engine_with(text);
        assert_eq!(engine.children(None), vec![1, 11, 16]);
        assert_eq!(engine.label(1).as_deref(), Some("{ } 0"));
        assert_eq!(engine.label(11).as_deref(), Some("[ ] 1"));
        assert_eq!(engine.label(16).as_deref(), Some("2: s"));
        assert_eq!(engine.root_label().as_deref(), Some("[ ]"), "根节点只显示类型");
    }

    #[test]
    fn test_root_label() {
        assert_eq!(engine_with(r#"{"a": 1}"#).root_label().as_deref(), Some("{ }"));
        assert_eq!(engine_with("  \"top\"").root_label().as_deref(), Some("top"));
        assert_eq!(engine_with("42").root_label().as_deref(), Some("42"));
        assert!(engine_with("// 只有注释").root_label().is_none());
    }

    #[test]
    fn test_collapsible_states() {
        let text = r#"{"o": {}, "a": [], "s": "x", "n": null}"#;
        let engine = engine_with(text);
        assert_eq!(engine.collapsible_state(key_offset(text, "o")), CollapsibleState::Expanded);
        assert_eq!(engine.collapsible_state(key_offset(text, "a")), CollapsibleState::Collapsed);
        assert_eq!(engine.collapsible_state(key_offset(text, "s")), CollapsibleState::None);
        assert_eq!(engine.collapsible_state(key_offset(text, "n")), CollapsibleState::None);
    }

    #[test]
    fn test_nested_labels() {
        let text = r#"{"a": {"b": 1}}"#;
        let engine = engine_with(text);
        assert_eq!(engine.children(None), vec![1]);
        assert_eq!(engine.label(1).as_deref(), Some("{ } a"));
        assert_eq!(engine.children(Some(1)), vec![7]);
        assert_eq!(engine.label(7).as_deref(), Some("b: 1"));
    }

    #[test]
    fn test_tree_item() {
        let text = r#"{"list": [true]}"#;
        let engine = engine_with(text);
        let item = engine.tree_item(1).expect("应该有树节点");
        assert_eq!(
            item,
            TreeItem {
                id: 1,
                label: "[ ] list".to_string(),
                collapsible: CollapsibleState::Collapsed,
                context_value: "array",
            }
        );
        let child = engine.children(Some(1))[0];
        assert_eq!(engine.tree_item(child).unwrap().context_value, "boolean");
    }

    #[test]
    fn test_label_reads_live_editor_text() {
        let mut engine = engine_with(r#"{"a": "foo"}"#);
        engine.editor_mut().replace_text(r#"{"a": "bar"}"#);
        assert_eq!(engine.label(1).as_deref(), Some("a: bar"));
    }

    #[test]
    fn test_duplicate_and_missing_values_are_omitted() {
        let engine = engine_with(r#"{"a": 1, "a": 2}"#);
        assert_eq!(engine.children(None), vec![1]);

        let text = r#"{"b": true, "a": }"#;
        let engine = engine_with(text);
        assert_eq!(engine.children(None), vec![key_offset(text, "b")]);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let text = r#"{"a": [1, {"b": null}], "c": "x"}"#;
        let mut engine = engine_with(text);
        let first = engine.children(None);
        engine.refresh();
        engine.refresh();
        assert_eq!(engine.children(None), first);
        assert_eq!(
            engine.view_mut().take(),
            vec![ViewEvent::TreeChanged(None), ViewEvent::TreeChanged(None)]
        );
    }

    #[test]
    fn test_parent_of_leads_back_to_origin() {
        let text = r#"{"a": [1, {"b": null, "c": [true, []]}], "d": {"e": "x"}}"#;
        let engine = engine_with(text);

        let mut pending: Vec<Option<Offset>> = vec![None];
        let mut visited = 0;
        while let Some(origin) = pending.pop() {
            for child in engine.children(origin) {
                assert_eq!(engine.parent_of(child), origin, "子节点 {} 应该回到 {:?}", child, origin);
                pending.push(Some(child));
                visited += 1;
            }
        }
        assert_eq!(visited, 9, "应该遍历到全部非根节点");
        assert_eq!(engine.parent_of(0), None, "根节点没有父节点");
    }

    #[test]
    fn test_edit_inside_string_notifies_property() {
        let mut engine = engine_with(r#"{"a": "foo"}"#);
        let events = edit(&mut engine, &[TextEdit::insert(10, "bar")]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))]);
        assert_eq!(engine.label(1).as_deref(), Some("a: foobar"));
    }

    #[test]
    fn test_edit_inside_array_element_notifies_array() {
        let mut engine = engine_with(r#"{"list": [10, 20]}"#);
        let events = edit(&mut engine, &[TextEdit::new(14..16, "25")]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))]);
        assert_eq!(engine.document_value(), Some(json!({"list": [10, 25]})));
    }

    #[test]
    fn test_edit_top_level_element_notifies_whole_tree() {
        let mut engine = engine_with("[1, 2]");
        let events = edit(&mut engine, &[TextEdit::new(4..5, "3")]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(None)]);
    }

    #[test]
    fn test_deleting_member_value_notifies_enclosing_object() {
        let text = r#"{"o": {"a": 1, "b": 2}}"#;
        let mut engine = engine_with(text);
        let a = key_offset(text, "a");
        assert_eq!(engine.children(Some(1)), vec![a, key_offset(text, "b")]);

        let one = text.find('1').unwrap();
        let events = edit(&mut engine, &[TextEdit::delete(one..one + 1)]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))], "成员失去值后应刷新所在对象");
        assert_eq!(engine.children(Some(1)), vec![14]);
        assert!(engine.tree_item(a).is_none(), "缺值的成员不再是树节点");

        // 重新输入值，成员回到原处
        let events = edit(&mut engine, &[TextEdit::insert(one, "3")]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))]);
        assert_eq!(engine.children(Some(1)), vec![a, key_offset(text, "b")]);
        assert_eq!(engine.label(a).as_deref(), Some("a: 3"));
    }

    #[test]
    fn test_deleting_top_level_member_value_refreshes_whole_tree() {
        let mut engine = engine_with(r#"{"a": 1, "b": 2}"#);
        let events = edit(&mut engine, &[TextEdit::delete(6..7)]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(None)]);
        assert_eq!(engine.children(None), vec![8]);
    }

    #[test]
    fn test_deleting_array_element_notifies_array() {
        let text = r#"{"list": [10, 20]}"#;
        let mut engine = engine_with(text);
        assert_eq!(engine.children(Some(1)), vec![10, 14]);

        let events = edit(&mut engine, &[TextEdit::delete(10..12)]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))]);
        assert_eq!(engine.children(Some(1)), vec![12]);
        assert_eq!(engine.label(12).as_deref(), Some("0: 20"));
        assert_eq!(engine.document_value(), Some(json!({"list": [20]})));
    }

    #[test]
    fn test_structural_edit_notifies_enclosing_node() {
        let text = r#"{"a": {"b": 1}}"#;
        let mut engine = engine_with(text);
        let events = edit(&mut engine, &[TextEdit::insert(13, r#", "c": 2"#)]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(Some(1))]);
        assert_eq!(engine.children(Some(1)).len(), 2);

        let mut engine = engine_with(r#"{"a": 1}"#);
        let events = edit(&mut engine, &[TextEdit::insert(7, r#", "b": 2"#)]);
        assert_eq!(events, vec![ViewEvent::TreeChanged(None)], "顶层结构变化整树刷新");
        assert_eq!(engine.children(None).len(), 2);
    }

    #[test]
    fn test_edit_batch_is_applied_in_order() {
        let mut engine = engine_with(r#"{"a": "x", "b": "y"}"#);
        let events = edit(
            &mut engine,
            &[TextEdit::insert(8, "1"), TextEdit::insert(18, "2")],
        );
        assert_eq!(events.len(), 2, "每个编辑各通知一次");
        assert_eq!(engine.document_value(), Some(json!({"a": "x1", "b": "y2"})));
        assert_eq!(engine.model().text(), engine.editor().text().unwrap());
    }

    #[test]
    fn test_focus_and_edits_push_document_to_preview() {
        let preview = Rc::new(RefCell::new(PreviewChannel::new(RecordingPreview::default())));
        preview.borrow_mut().on_ready(None).unwrap();

        let mut editor = MemoryEditor::default();
        editor.open(DocumentInfo::new(URI, "file", "json"), r#"{"a": 1}"#);
        let mut engine = TreeSyncEngine::new(editor, RecordingView::default());
        let sink = Rc::clone(&preview);
        engine.set_document_listener(move |document| {
            sink.borrow_mut().on_document_changed(document).unwrap();
        });

        engine.on_focus_changed();
        assert_eq!(preview.borrow().port().posted().len(), 2, "焦点切换推送一次");
        assert_eq!(
            preview.borrow().port().posted()[1],
            json!({"type": "json", "payload": {"a": 1}})
        );

        edit(&mut engine, &[TextEdit::new(6..7, "2")]);
        assert_eq!(preview.borrow().port().posted().len(), 3, "编辑推送一次");
        assert_eq!(preview.borrow().port().posted()[2]["payload"], json!({"a": 2}));

        edit(&mut engine, &[TextEdit::insert(7, "0"), TextEdit::insert(8, "0")]);
        assert_eq!(preview.borrow().port().posted().len(), 4, "一批编辑只推送一次");
        assert_eq!(preview.borrow().port().posted()[3]["payload"], json!({"a": 200}));
    }

    #[test]
    fn test_untracked_document_changes_are_ignored() {
        let mut engine = engine_with(r#"{"a": 1}"#);
        let event = TextChangeEvent {
            uri: "file:///other.json".to_string(),
            edits: vec![TextEdit::insert(0, " ")],
        };
        engine.on_text_changed(&event);
        assert!(engine.view().events().is_empty());
        assert_eq!(engine.model().text(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_out_of_sync_batch_reloads() {
        let mut engine = engine_with(r#"{"a": 1}"#);
        let mut event = engine.editor_mut().apply(&[TextEdit::insert(7, r#", "b": 2"#)]);
        event.edits[0].text = r#", "c": 3"#.to_string();
        engine.on_text_changed(&event);

        let events = engine.view_mut().take();
        assert_eq!(events.last(), Some(&ViewEvent::TreeChanged(None)));
        assert_eq!(engine.model().text(), r#"{"a": 1, "b": 2}"#, "应该以编辑器文本为准");
    }

    #[test]
    fn test_invalid_edit_reloads() {
        let mut engine = engine_with(r#"{"a": 1}"#);
        let event = TextChangeEvent {
            uri: URI.to_string(),
            edits: vec![TextEdit::insert(999, "x")],
        };
        engine.on_text_changed(&event);
        assert_eq!(engine.view_mut().take(), vec![ViewEvent::TreeChanged(None)]);
        assert_eq!(engine.model().text(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_caret_reveals_node() {
        let mut engine = engine_with(r#"{"a": {"b": 1}}"#);
        engine.editor_mut().set_caret(12);
        engine.on_selection_changed();
        assert_eq!(
            engine.view_mut().take(),
            vec![ViewEvent::Reveal(7, RevealOptions { select: false, focus: false, expand: 3 })]
        );

        engine.editor_mut().set_selection(Selection::new(7, 12));
        engine.on_selection_changed();
        assert!(engine.view().events().is_empty(), "非光标选区不跟随");

        engine.editor_mut().set_caret(0);
        engine.on_selection_changed();
        assert!(engine.view().events().is_empty(), "根节点没有标识，不跟随");
    }

    #[test]
    fn test_select_highlight_and_jump() {
        let text = r#"{"s": "hello"}"#;
        let mut engine = engine_with(text);

        engine.select_node(1);
        assert_eq!(engine.editor().revealed().last(), Some(&(7..12)));
        assert_eq!(engine.editor().current_selection(), Selection::caret(12));
        assert_eq!(engine.editor().focus_count(), 0);

        engine.highlight_value(1);
        assert_eq!(engine.editor().current_selection(), Selection::new(7, 12));
        assert_eq!(engine.editor().focus_count(), 1);

        engine.editor_mut().set_caret(0);
        engine.jump_to_end(1);
        assert_eq!(engine.editor().current_selection(), Selection::caret(12));
        assert_eq!(engine.editor().focus_count(), 2);
        assert_eq!(engine.editor().revealed().len(), 3);
    }

    #[test]
    fn test_commands_on_unresolvable_offset_are_noops() {
        // 缺值的属性无法解析到节点
        let text = r#"{"b": 1, "a": }"#;
        let mut engine = engine_with(text);
        let a = key_offset(text, "a");
        engine.select_node(a);
        engine.copy_value(a);
        assert!(engine.editor().revealed().is_empty());
        assert!(engine.editor().clipboard().is_none());
    }

    #[test]
    fn test_copy_value() {
        let text = r#"{"s": "hello", "n": 42}"#;
        let mut engine = engine_with(text);
        engine.copy_value(key_offset(text, "s"));
        assert_eq!(engine.editor().clipboard(), Some("hello"));
        engine.copy_value(key_offset(text, "n"));
        assert_eq!(engine.editor().clipboard(), Some("42"));
    }

    #[test]
    fn test_copy_key_and_path() {
        let text = r#"{"users": [0, 1, {"name": "x"}]}"#;
        let mut engine = engine_with(text);
        let name = key_offset(text, "name");

        engine.copy_path(name);
        assert_eq!(engine.editor().clipboard(), Some("['users'][2]['name']"));
        engine.copy_key(name);
        assert_eq!(engine.editor().clipboard(), Some("name"));

        let third = engine.children(Some(key_offset(text, "users")))[2];
        engine.copy_key(third);
        assert_eq!(engine.editor().clipboard(), Some("2"), "数组元素复制下标");
    }

    #[test]
    fn test_execute_parsed_command() {
        let text = r#"{"it's": [true]}"#;
        let mut engine = engine_with(text);
        let command: Command = "code-json-editor.copy-path-to-clipboard".parse().unwrap();
        engine.execute(command, 1);
        assert_eq!(engine.editor().clipboard(), Some("['it\\'s']"));
    }

    #[test]
    fn test_clipboard_failure_is_not_propagated() {
        let mut engine = engine_with(r#"{"a": 1}"#);
        engine.editor_mut().break_clipboard();
        engine.copy_value(1);
        assert!(engine.editor().clipboard().is_none());
    }

    #[test]
    fn test_malformed_document_still_browsable() {
        let text = "{\n  // 注释\n  \"a\": [1, 2,\n  \"b\": tru\n";
        let engine = engine_with(text);
        let top = engine.children(None);
        assert!(!top.is_empty(), "容错解析应该保留部分树");
        assert_eq!(engine.label(top[0]).as_deref(), Some("[ ] a"));
    }
}
