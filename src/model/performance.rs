//! 性能基准测试模块
//!
//! 用于测试大文档解析、位置查询和编辑同步的性能

use std::time::Instant;

use serde_json::{json, Value};

use crate::model::document::{DocumentModel, TextEdit};
use crate::model::syntax_tree::SyntaxTree;
use crate::vm::engine::TreeSyncEngine;
use crate::vm::headless::{MemoryEditor, RecordingView};
use crate::vm::ports::DocumentInfo;

/// 性能测试结果
#[derive(Debug)]
pub struct PerformanceResult {
    pub operation: String,
    pub duration_ms: u128,
    pub success: bool,
    pub details: String,
}

impl PerformanceResult {
    pub fn new(operation: &str, duration_ms: u128, success: bool, details: &str) -> Self {
        Self {
            operation: operation.to_string(),
            duration_ms,
            success,
            details: details.to_string(),
        }
    }
}

/// 生成大型测试文档（带注释的 JSONC 文本）
pub fn generate_large_document(depth: usize, width: usize) -> String {
    fn create_nested_object(current_depth: usize, max_depth: usize, width: usize) -> Value {
        if current_depth >= max_depth {
            return json!("叶子节点值");
        }

        let mut obj = serde_json::Map::new();
        for i in 0..width {
            let key = format!("field_{}", i);
            let value = match i % 5 {
                0 => json!(format!("字符串值_{}", i)),
                1 => json!(i as i64),
                2 => json!(i % 2 == 0),
                3 => json!([1, 2, 3, i]),
                _ => create_nested_object(current_depth + 1, max_depth, width / 2),
            };
            obj.insert(key, value);
        }
        Value::Object(obj)
    }

    let items: Vec<Value> = (0..width * 10)
        .map(|i| json!({
            "id": i,
            "name": format!("项目_{}", i),
            "value": i * 2,
            "active": i % 3 == 0
        }))
        .collect();
    let root = json!({
        "metadata": {
            "depth": depth,
            "width": width,
            "description": "性能测试用大型JSON文档"
        },
        "data": create_nested_object(0, depth, width),
        "items": items,
    });

    let body = serde_json::to_string_pretty(&root).unwrap_or_default();
    format!("// 自动生成的测试文档\n{}\n", body)
}

/// 测试容错解析性能
pub fn benchmark_parse(text: &str) -> PerformanceResult {
    let start = Instant::now();
    let tree = SyntaxTree::parse(text);
    let duration = start.elapsed();

    PerformanceResult::new(
        "容错解析",
        duration.as_millis(),
        tree.root().is_some() && tree.errors().is_empty(),
        &format!("解析了 {} 字节，{} 个节点", text.len(), tree.len()),
    )
}

/// 测试按位置解析节点的性能（每隔 step 字节查询一次）
pub fn benchmark_location_queries(text: &str, step: usize) -> PerformanceResult {
    let mut model = DocumentModel::default();
    model.refresh(Some(text));

    let start = Instant::now();
    let mut resolved = 0;
    let mut queries = 0;
    for offset in (0..text.len()).step_by(step.max(1)) {
        queries += 1;
        if model.resolve(offset).is_some() {
            resolved += 1;
        }
    }
    let duration = start.elapsed();

    PerformanceResult::new(
        "位置查询",
        duration.as_millis(),
        resolved > 0,
        &format!("{} 次查询，{} 次命中", queries, resolved),
    )
}

/// 测试编辑同步性能：在每个字符串值末尾插入字符
pub fn benchmark_edit_sync(text: &str, edits: usize) -> PerformanceResult {
    let mut editor = MemoryEditor::default();
    editor.open(DocumentInfo::new("file:///bench.json", "file", "json"), text);
    let mut engine = TreeSyncEngine::new(editor, RecordingView::default());
    engine.on_focus_changed();

    let targets: Vec<usize> = text
        .match_indices("\": \"")
        .filter_map(|(offset, _)| text[offset + 4..].find('"').map(|end| offset + 4 + end))
        .take(edits)
        .collect();

    let start = Instant::now();
    // 从后往前插入，前面的偏移保持不变
    for &offset in targets.iter().rev() {
        let event = engine.editor_mut().apply(&[TextEdit::insert(offset, "x")]);
        engine.on_text_changed(&event);
    }
    let duration = start.elapsed();

    let notifications = engine.view_mut().take().len();
    let in_sync = Some(engine.model().text()) == engine.editor().text();
    PerformanceResult::new(
        "编辑同步",
        duration.as_millis(),
        in_sync,
        &format!("{} 次编辑，{} 次通知", targets.len(), notifications),
    )
}

/// 运行综合性能测试
pub fn run_performance_suite() -> Vec<PerformanceResult> {
    let mut results = Vec::new();

    let test_cases = [
        (3, 10), // 小型：深度3，宽度10
        (4, 20), // 中型：深度4，宽度20
        (5, 30), // 大型：深度5，宽度30
    ];

    for (depth, width) in test_cases {
        tracing::info!("测试规模：深度{}，宽度{}", depth, width);

        let start = Instant::now();
        let text = generate_large_document(depth, width);
        results.push(PerformanceResult::new(
            &format!("数据生成({}x{})", depth, width),
            start.elapsed().as_millis(),
            true,
            &format!("生成了 {} 字节", text.len()),
        ));

        results.push(benchmark_parse(&text));
        results.push(benchmark_location_queries(&text, 97));
        results.push(benchmark_edit_sync(&text, 50));
    }

    results
}
