//! 程序入口：初始化日志，在终端中打开 JSON/JSONC 文件并驱动树同步引擎

use std::{cell::RefCell, ops::Range, path::{Path, PathBuf}, rc::Rc, time::Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use code_json_editor::model::performance::run_performance_suite;
use code_json_editor::utils::{clipboard, clipboard::ClipboardError, fs};
use code_json_editor::vm::bridge::*;
use code_json_editor::vm::engine::{CollapsibleState, TreeSyncEngine};
use code_json_editor::vm::headless::{MemoryEditor, RecordingView, ViewEvent};
use code_json_editor::vm::ports::{DocumentInfo, EditorPort, Selection};
use code_json_editor::vm::preview::{PreviewChannel, PreviewError, PreviewMessage, PreviewPort};
use code_json_editor::{Offset, SyncState};

#[derive(Parser, Debug)]
#[command(name = "code_json_editor", version, about = "在终端中浏览 JSON/JSONC 文件的大纲树")]
struct Cli {
    /// 要打开的 JSON/JSONC 文件
    #[arg(required_unless_present = "bench")]
    file: Option<PathBuf>,

    /// 光标位置（字节偏移），输出并定位该处节点
    #[arg(long)]
    at: Option<usize>,

    /// 复制光标处节点的值、键或路径
    #[arg(long, value_enum, requires = "at")]
    copy: Option<CopyTarget>,

    /// 在文档上执行 JSONPath 查询
    #[arg(long)]
    query: Option<String>,

    /// 展开所有节点（默认数组折叠）
    #[arg(long)]
    expand_all: bool,

    /// 运行性能测试
    #[arg(long)]
    bench: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CopyTarget {
    Value,
    Key,
    Path,
}

impl From<CopyTarget> for Command {
    fn from(target: CopyTarget) -> Self {
        match target {
            CopyTarget::Value => Command::CopyValue,
            CopyTarget::Key => Command::CopyKey,
            CopyTarget::Path => Command::CopyPath,
        }
    }
}

/// 内存编辑器 + 系统剪贴板
#[derive(Default)]
struct TerminalEditor {
    inner: MemoryEditor,
}

impl EditorPort for TerminalEditor {
    fn active_document(&self) -> Option<DocumentInfo> {
        self.inner.active_document()
    }

    fn document_text(&self) -> Option<String> {
        self.inner.document_text()
    }

    fn text_range(&self, range: Range<usize>) -> Option<String> {
        self.inner.text_range(range)
    }

    fn selection(&self) -> Option<Selection> {
        self.inner.selection()
    }

    fn reveal_range(&mut self, range: Range<usize>) {
        self.inner.reveal_range(range)
    }

    fn set_selection(&mut self, selection: Selection) {
        self.inner.set_selection(selection)
    }

    fn focus_editor(&mut self) {
        self.inner.focus_editor()
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), ClipboardError> {
        println!("复制内容: {}", text);
        clipboard::copy_to_clipboard(text)?;
        println!("{}", STATUS_COPIED);
        Ok(())
    }

    fn set_context_flag(&mut self, key: &str, value: bool) {
        self.inner.set_context_flag(key, value)
    }
}

/// 预览面板：只把查询结果打印到终端
struct StdoutPreview;

impl PreviewPort for StdoutPreview {
    fn post(&mut self, message: &str) -> Result<(), PreviewError> {
        match serde_json::from_str::<PreviewMessage>(message)? {
            PreviewMessage::Json { .. } => tracing::debug!("预览文档已推送: {} 字节", message.len()),
            PreviewMessage::Result { expression, output } => println!("{} =>\n{}", expression, output),
        }
        Ok(())
    }
}

type Engine = TreeSyncEngine<TerminalEditor, RecordingView>;

/// VM桥接器：管理终端输入与树同步引擎、预览通道的交互
struct ViewModelBridge {
    engine: Rc<RefCell<Engine>>,
    preview: Rc<RefCell<PreviewChannel<StdoutPreview>>>,
}

impl ViewModelBridge {
    fn new() -> Self {
        let preview = Rc::new(RefCell::new(PreviewChannel::new(StdoutPreview)));
        let mut engine = TreeSyncEngine::new(TerminalEditor::default(), RecordingView::default());

        // 焦点切换与每批编辑后把最新文档交给预览通道
        let sink = Rc::clone(&preview);
        engine.set_document_listener(move |document| {
            if let Err(e) = sink.borrow_mut().on_document_changed(document) {
                tracing::warn!("预览推送失败: {}", e);
            }
        });

        Self {
            engine: Rc::new(RefCell::new(engine)),
            preview,
        }
    }

    /// 处理加载文件操作
    fn handle_load_file(&self, path: &Path) -> Result<()> {
        let start_time = Instant::now();
        let text = fs::read_document(path).with_context(|| format!("无法读取 {}", path.display()))?;
        let info = fs::document_info_for(path);

        let mut engine = self.engine.borrow_mut();
        engine.editor_mut().inner.open(info, text);
        engine.on_focus_changed();
        engine.view_mut().take();

        let diagnostics = engine.model().errors().len();
        if diagnostics > 0 {
            tracing::warn!("文档包含 {} 处语法问题，已尽量解析", diagnostics);
        }
        let status = match engine.state() {
            SyncState::Active => STATUS_LOADED,
            SyncState::Inactive => STATUS_INELIGIBLE,
        };
        println!("{}", status);
        tracing::info!(
            "文件加载完成: {}，耗时: {:.2}ms",
            path.display(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    /// 打印整棵树：对象默认展开，数组仅在 expand_all 时展开
    fn handle_print_tree(&self, expand_all: bool) {
        let engine = self.engine.borrow();
        if let Some(root) = engine.root_label() {
            println!("{}", root);
        }
        Self::print_children(&engine, None, 1, expand_all);
    }

    fn print_children(engine: &Engine, parent: Option<Offset>, depth: usize, expand_all: bool) {
        for child in engine.children(parent) {
            let Some(item) = engine.tree_item(child) else {
                continue;
            };
            let expand = match item.collapsible {
                CollapsibleState::Expanded => true,
                CollapsibleState::Collapsed => expand_all,
                CollapsibleState::None => false,
            };
            let marker = match (item.collapsible, expand) {
                (CollapsibleState::None, _) => " ",
                (_, true) => "▾",
                (_, false) => "▸",
            };
            println!("{}{} {}  @{}", "  ".repeat(depth), marker, item.label, item.id);
            if expand {
                Self::print_children(engine, Some(child), depth + 1, expand_all);
            }
        }
    }

    /// 处理光标定位：让树视图跟随光标，并可选执行复制命令
    fn handle_caret(&self, offset: usize, copy: Option<CopyTarget>) {
        let mut engine = self.engine.borrow_mut();
        engine.editor_mut().inner.set_caret(offset);
        engine.on_selection_changed();

        let revealed = engine.view_mut().take().into_iter().find_map(|event| match event {
            ViewEvent::Reveal(node, _) => Some(node),
            ViewEvent::TreeChanged(_) => None,
        });
        let Some(node) = revealed else {
            println!("{}光标 {} 处没有可定位的节点", STATUS_ERROR_PREFIX, offset);
            return;
        };

        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            chain.push(engine.label(id).unwrap_or_default());
            current = engine.parent_of(id);
        }
        chain.reverse();
        println!("光标处节点: {}", chain.join(" › "));

        engine.select_node(node);
        if let Some(target) = copy {
            engine.execute(target.into(), node);
        }
    }

    /// 处理查询：面板就绪后通过预览通道求值并打印结果
    fn handle_query(&self, expression: &str) -> Result<()> {
        let mut preview = self.preview.borrow_mut();
        if !preview.is_ready() {
            preview.on_ready(self.engine.borrow().document_value())?;
        }
        let request = serde_json::json!({"type": "evaluate", "expression": expression});
        preview.handle_message(&request.to_string())?;
        Ok(())
    }

    fn handle_bench() {
        for result in run_performance_suite() {
            let status = if result.success { "✓" } else { "✗" };
            println!(
                "{} {:<24} {:>6}ms  {}",
                status, result.operation, result.duration_ms, result.details
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志输出
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .try_init();

    if cli.bench {
        ViewModelBridge::handle_bench();
    }

    let Some(path) = cli.file.as_deref() else {
        return Ok(());
    };

    let bridge = ViewModelBridge::new();
    bridge.handle_load_file(path)?;
    bridge.handle_print_tree(cli.expand_all);

    if let Some(offset) = cli.at {
        bridge.handle_caret(offset, cli.copy);
    }
    if let Some(expression) = cli.query.as_deref() {
        bridge.handle_query(expression)?;
    }

    tracing::info!("{}", STATUS_READY);
    Ok(())
}
