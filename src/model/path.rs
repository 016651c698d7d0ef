//! 节点路径：键名/下标序列，以及按文本位置定位路径

use std::fmt;
use std::ops::ControlFlow;

use crate::model::syntax_tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};

/// 路径中的一段：对象键或数组下标
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// 从根到节点的路径，只对生成它的那一代语法树有意义
pub type NodePath = Vec<PathSegment>;

/// 渲染为方括号访问形式：`['a'][0]['b']`
pub fn render_accessor(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            // 键名含单引号时转义
            PathSegment::Key(key) => {
                out.push_str("['");
                out.push_str(&key.replace('\'', "\\'"));
                out.push_str("']");
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// 文本位置对应的结构位置
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: NodePath,
    /// 位置是否落在（或即将输入）属性键上
    pub is_at_property_key: bool,
}

/// 计算 `offset` 处最窄的结构路径
///
/// 进入容器时压入占位段（对象为空键，数组为 0），属性名覆盖最后一段，
/// 逗号使下标加一或把键重置为空；落在容器左括号及之前的位置属于容器本身。
pub fn locate(tree: &SyntaxTree, offset: usize) -> Location {
    let mut locator = Locator {
        tree,
        position: offset,
        segments: NodePath::new(),
        at_property_key: false,
    };
    if let Some(root) = tree.root() {
        // Break 表示已经定位到，不是错误
        let _ = locator.value(root);
    }
    Location {
        path: locator.segments,
        is_at_property_key: locator.at_property_key,
    }
}

type Flow = ControlFlow<()>;

/// 容器内按偏移排列的逗号与成员
enum Event {
    Comma(usize),
    Member(NodeId),
}

fn events(tree: &SyntaxTree, container: &SyntaxNode) -> Vec<(usize, Event)> {
    let mut events: Vec<(usize, Event)> = container
        .commas
        .iter()
        .map(|&comma| (comma, Event::Comma(comma)))
        .collect();
    events.extend(container.children.iter().map(|&child| (tree[child].offset, Event::Member(child))));
    events.sort_by_key(|(offset, _)| *offset);
    events
}

struct Locator<'t> {
    tree: &'t SyntaxTree,
    position: usize,
    segments: NodePath,
    at_property_key: bool,
}

impl Locator<'_> {
    fn value(&mut self, id: NodeId) -> Flow {
        let tree = self.tree;
        let node = &tree[id];
        match node.kind {
            NodeKind::Object | NodeKind::Array => self.container(id),
            _ if self.position <= node.end() => Flow::Break(()),
            _ => Flow::Continue(()),
        }
    }

    fn container(&mut self, id: NodeId) -> Flow {
        let tree = self.tree;
        let node = &tree[id];
        if self.position <= node.offset {
            return Flow::Break(());
        }
        let is_object = node.kind == NodeKind::Object;
        if is_object {
            self.at_property_key = true;
            self.segments.push(PathSegment::Key(String::new()));
        } else {
            self.segments.push(PathSegment::Index(0));
        }

        for (_, event) in events(tree, node) {
            match event {
                Event::Comma(comma) => {
                    if self.position <= comma {
                        return Flow::Break(());
                    }
                    match self.segments.last_mut() {
                        Some(PathSegment::Index(index)) => *index += 1,
                        Some(last) => {
                            self.at_property_key = true;
                            *last = PathSegment::Key(String::new());
                        }
                        None => {}
                    }
                }
                Event::Member(child) if is_object => self.property(child)?,
                Event::Member(child) => self.value(child)?,
            }
        }

        // 未闭合的容器一直延伸到末尾，路径停留在其中
        if !node.closed || self.position < node.end() {
            return Flow::Break(());
        }
        self.segments.pop();
        Flow::Continue(())
    }

    fn property(&mut self, property: NodeId) -> Flow {
        let tree = self.tree;
        let Some(&key) = tree[property].children.first() else {
            return Flow::Continue(());
        };
        if self.position < tree[key].offset {
            return Flow::Break(());
        }
        if let (Some(last), Some(name)) = (self.segments.last_mut(), tree.property_key(property)) {
            *last = PathSegment::Key(name.to_owned());
        }
        if self.position <= tree[key].end() {
            return Flow::Break(());
        }
        if let Some(colon) = tree[property].colon_offset {
            if self.position <= colon {
                return Flow::Break(());
            }
            self.at_property_key = false;
        }
        match tree.property_value(property) {
            Some(value) => self.value(value),
            None => Flow::Continue(()),
        }
    }
}
