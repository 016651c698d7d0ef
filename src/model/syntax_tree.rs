//! 语法树：以 arena 存放节点，父链接只用于导航，不持有所有权
//!
//! 节点由 tree-sitter-json 的语法树整理而来。每次刷新都会整体重建，
//! 节点 id 只在同一棵树内有效。

use std::ops::Index;

use serde_json::{Map, Number, Value};
use tree_sitter::Node;

use crate::model::parser::{self, ParseError, ParseErrorKind, ParseOptions};
use crate::model::path::{NodePath, PathSegment};

/// JSON 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    /// 对象成员包装节点：children[0] 为键，children[1] 为值（缺值时只有键）
    Property,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Property => "property",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::Null => "null",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::Array)
    }
}

/// 节点在 arena 中的下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// 起始字节偏移
    pub offset: usize,
    /// 字节长度（字符串含引号）
    pub length: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 标量与键的解码值
    pub value: Option<Value>,
    /// 属性节点冒号的位置
    pub colon_offset: Option<usize>,
    /// 容器内逗号的位置，多余的逗号也记录在内
    pub commas: Vec<usize>,
    /// 容器是否以自己的右括号结束
    pub closed: bool,
}

impl SyntaxNode {
    fn new(kind: NodeKind, offset: usize, length: usize) -> Self {
        Self {
            kind,
            offset,
            length,
            parent: None,
            children: Vec::new(),
            value: None,
            colon_offset: None,
            commas: Vec::new(),
            closed: false,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: Option<NodeId>,
    errors: Vec<ParseError>,
}

impl Index<NodeId> for SyntaxTree {
    type Output = SyntaxNode;

    fn index(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }
}

impl SyntaxTree {
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, &ParseOptions::default())
    }

    pub fn parse_with(text: &str, options: &ParseOptions) -> Self {
        let Some(source) = parser::parse_source(text) else {
            return Self::default();
        };
        let mut builder = TreeBuilder {
            text,
            options,
            nodes: Vec::new(),
            errors: Vec::new(),
        };
        let root = builder.document(source.root_node());
        Self {
            nodes: builder.nodes,
            root,
            errors: builder.errors,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// 属性节点的键名
    pub fn property_key(&self, property: NodeId) -> Option<&str> {
        let node = self.node(property)?;
        if node.kind != NodeKind::Property {
            return None;
        }
        self[*node.children.first()?].value.as_ref()?.as_str()
    }

    /// 属性节点的值；缺值的属性返回 None
    pub fn property_value(&self, property: NodeId) -> Option<NodeId> {
        let node = self.node(property)?;
        match (node.kind, node.children.as_slice()) {
            (NodeKind::Property, [_, value]) => Some(*value),
            _ => None,
        }
    }

    /// 节点在父节点 children 中的位置
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id)?.parent?;
        self[parent].children.iter().position(|&child| child == id)
    }

    /// 按路径查找节点：键匹配第一个同名且带值的属性，下标按数组元素顺序
    pub fn find_node_at_path(&self, path: &[PathSegment]) -> Option<NodeId> {
        let mut current = self.root?;
        for segment in path {
            let node = &self[current];
            current = match segment {
                PathSegment::Key(key) => {
                    if node.kind != NodeKind::Object {
                        return None;
                    }
                    node.children.iter().find_map(|&property| {
                        let value = self.property_value(property)?;
                        (self.property_key(property)? == key.as_str()).then_some(value)
                    })?
                }
                PathSegment::Index(index) => {
                    if node.kind != NodeKind::Array {
                        return None;
                    }
                    *node.children.get(*index)?
                }
            };
        }
        Some(current)
    }

    /// 沿父链接还原从根到节点的路径
    pub fn path_of(&self, id: NodeId) -> NodePath {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).and_then(|n| n.parent) {
            match self[parent].kind {
                NodeKind::Property => {
                    if let Some(key) = self.property_key(parent) {
                        segments.push(PathSegment::Key(key.to_owned()));
                    }
                    current = parent;
                    continue;
                }
                NodeKind::Array => {
                    if let Some(index) = self.index_in_parent(current) {
                        segments.push(PathSegment::Index(index));
                    }
                }
                _ => {}
            }
            current = parent;
        }
        segments.reverse();
        segments
    }

    /// 转换为 serde_json 值；重复键以后出现者为准，缺值属性被忽略
    pub fn to_value(&self, id: NodeId) -> Option<Value> {
        let node = self.node(id)?;
        let value = match node.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for &property in &node.children {
                    let (Some(key), Some(value)) = (self.property_key(property), self.property_value(property)) else {
                        continue;
                    };
                    if let Some(value) = self.to_value(value) {
                        map.insert(key.to_owned(), value);
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(node.children.iter().filter_map(|&child| self.to_value(child)).collect()),
            NodeKind::Property => self.to_value(self.property_value(id)?)?,
            _ => node.value.clone().unwrap_or(Value::Null),
        };
        Some(value)
    }
}

/// 字符串节点在两端各去掉一个引号：返回 (前导, 末尾) 去掉的字节数
///
/// 标签渲染、显示范围和复制值都走这里，保证正反两个方向的偏移计算一致。
pub fn quote_padding(kind: NodeKind, raw: &str) -> (usize, usize) {
    if kind != NodeKind::String {
        return (0, 0);
    }
    let leading = usize::from(raw.starts_with('"'));
    let trailing = usize::from(raw.len() > leading && raw.ends_with('"'));
    (leading, trailing)
}

/// 去掉引号后的渲染文本
pub fn strip_quotes(kind: NodeKind, raw: &str) -> &str {
    let (leading, trailing) = quote_padding(kind, raw);
    &raw[leading..raw.len() - trailing]
}

/// tree-sitter 子节点展平后的一项；ERROR 与 pair 节点不单独成项
#[derive(Clone, Copy)]
enum Item<'t> {
    /// object / array / string / number / true / false / null
    Value(Node<'t>),
    /// `{ } [ ] : ,` 及其偏移
    Punct(u8, usize),
    Unknown { offset: usize, length: usize },
}

impl Item<'_> {
    fn span(&self) -> (usize, usize) {
        match *self {
            Item::Value(node) => (node.start_byte(), node.end_byte() - node.start_byte()),
            Item::Punct(_, offset) => (offset, 1),
            Item::Unknown { offset, length } => (offset, length),
        }
    }

    fn end(&self) -> usize {
        let (offset, length) = self.span();
        offset + length
    }

    fn starts_value(&self) -> bool {
        matches!(self, Item::Value(_) | Item::Punct(b'{' | b'[', _))
    }

    fn opens_container(&self) -> bool {
        match self {
            Item::Value(node) => matches!(node.kind(), "object" | "array"),
            Item::Punct(punct, _) => matches!(punct, b'{' | b'['),
            Item::Unknown { .. } => false,
        }
    }

    fn is_key(&self) -> bool {
        matches!(self, Item::Value(node) if node.kind() == "string")
    }
}

/// 越过从 `items[*pos]` 开始的一个值，左右括号按层数配对
fn skip_value(items: &[Item<'_>], pos: &mut usize) {
    let mut depth = 0usize;
    while let Some(item) = items.get(*pos) {
        *pos += 1;
        match item {
            Item::Punct(b'{' | b'[', _) => depth += 1,
            Item::Punct(b'}' | b']', _) => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 {
            break;
        }
    }
}

/// 对象成员的解析状态
#[derive(Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Colon,
    Value,
    Comma,
}

/// 把 tree-sitter 语法树整理成 arena 树
///
/// tree-sitter 的错误恢复可能把括号、键值对拆散在 ERROR 节点里，
/// 这里按 `{ } [ ] : ,` 重新配对，得到与合法部分一致的结构。
struct TreeBuilder<'a> {
    text: &'a str,
    options: &'a ParseOptions,
    nodes: Vec<SyntaxNode>,
    errors: Vec<ParseError>,
}

impl TreeBuilder<'_> {
    fn report(&mut self, kind: ParseErrorKind, offset: usize, length: usize) {
        self.errors.push(ParseError { kind, offset, length });
    }

    /// 无法识别的片段；文档开头的 BOM 不算错误
    fn report_unknown(&mut self, item: &Item<'_>) {
        let (offset, length) = item.span();
        if offset == 0 && self.text.get(..length) == Some("\u{feff}") {
            return;
        }
        self.report(ParseErrorKind::InvalidSymbol, offset, length);
    }

    fn push(&mut self, mut node: SyntaxNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        self.nodes.push(node);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn flatten<'t>(&mut self, node: Node<'t>, out: &mut Vec<Item<'t>>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_missing() {
                continue;
            }
            let kind = child.kind();
            match kind {
                "pair" => self.flatten(child, out),
                "ERROR" if child.child_count() > 0 => self.flatten(child, out),
                "comment" => {
                    if !self.options.allow_comments {
                        let range = child.byte_range();
                        self.report(ParseErrorKind::InvalidCommentToken, range.start, range.len());
                    }
                }
                "object" | "array" | "string" | "number" | "true" | "false" | "null" => out.push(Item::Value(child)),
                "{" | "}" | "[" | "]" | ":" | "," => out.push(Item::Punct(kind.as_bytes()[0], child.start_byte())),
                _ => {
                    let range = child.byte_range();
                    out.push(Item::Unknown {
                        offset: range.start,
                        length: range.len(),
                    });
                }
            }
        }
    }

    /// 文档的第一个值是根节点，之后的内容只产生诊断
    fn document(&mut self, node: Node<'_>) -> Option<NodeId> {
        let mut items = Vec::new();
        self.flatten(node, &mut items);

        let mut root = None;
        let mut pos = 0;
        while let Some(item) = items.get(pos) {
            if !item.starts_value() {
                self.report_unknown(item);
                pos += 1;
                continue;
            }
            if root.is_some() {
                let (offset, length) = item.span();
                self.report(ParseErrorKind::EndOfFileExpected, offset, length);
                break;
            }
            root = self.value(&items, &mut pos, None, 1, self.text.len());
        }
        root
    }

    /// 从 `items[*pos]` 构建一个值并越过它；超出嵌套深度的容器被跳过
    fn value(
        &mut self,
        items: &[Item<'_>],
        pos: &mut usize,
        parent: Option<NodeId>,
        depth: usize,
        limit: usize,
    ) -> Option<NodeId> {
        let item = *items.get(*pos)?;
        if item.opens_container() && depth > self.options.max_depth {
            let (offset, length) = item.span();
            self.report(ParseErrorKind::NestingTooDeep, offset, length);
            skip_value(items, pos);
            return None;
        }
        *pos += 1;
        match item {
            Item::Value(node) => match node.kind() {
                "object" => Some(self.container_node(NodeKind::Object, node, parent, depth, limit)),
                "array" => Some(self.container_node(NodeKind::Array, node, parent, depth, limit)),
                _ => Some(self.scalar(node, parent)),
            },
            Item::Punct(b'{', offset) => Some(self.container(NodeKind::Object, offset, items, pos, parent, depth, limit)),
            Item::Punct(b'[', offset) => Some(self.container(NodeKind::Array, offset, items, pos, parent, depth, limit)),
            _ => None,
        }
    }

    /// tree-sitter 识别出的容器：成员来自它自己的子节点
    fn container_node(
        &mut self,
        kind: NodeKind,
        node: Node<'_>,
        parent: Option<NodeId>,
        depth: usize,
        limit: usize,
    ) -> NodeId {
        let mut items = Vec::new();
        self.flatten(node, &mut items);
        let (open, close) = match kind {
            NodeKind::Object => (b'{', b'}'),
            _ => (b'[', b']'),
        };
        let mut pos = usize::from(matches!(items.first(), Some(Item::Punct(p, _)) if *p == open));
        // 已闭合的容器，成员不会越过右括号
        let limit = match items.last() {
            Some(Item::Punct(p, offset)) if *p == close => *offset,
            _ => limit,
        };
        self.container(kind, node.start_byte(), &items, &mut pos, parent, depth, limit)
    }

    fn container(
        &mut self,
        kind: NodeKind,
        offset: usize,
        items: &[Item<'_>],
        pos: &mut usize,
        parent: Option<NodeId>,
        depth: usize,
        limit: usize,
    ) -> NodeId {
        let id = self.push(SyntaxNode::new(kind, offset, 1), parent);
        let end = match kind {
            NodeKind::Object => self.object_members(id, items, pos, depth, limit),
            _ => self.array_elements(id, items, pos, depth, limit),
        };
        self.nodes[id.0].length = end.max(offset + 1) - offset;
        id
    }

    /// 返回对象的结束位置；未闭合时延伸到 `limit`
    fn object_members(
        &mut self,
        object: NodeId,
        items: &[Item<'_>],
        pos: &mut usize,
        depth: usize,
        limit: usize,
    ) -> usize {
        let mut expect = Expect::Key;
        let mut pending: Option<NodeId> = None;
        let mut after_comma = false;
        let mut last_end = self.nodes[object.0].offset + 1;

        while let Some(item) = items.get(*pos).copied() {
            let (offset, length) = item.span();
            match item {
                Item::Punct(b'}', _) => {
                    *pos += 1;
                    match expect {
                        Expect::Value => self.report(ParseErrorKind::ValueExpected, offset, 1),
                        Expect::Colon => self.report(ParseErrorKind::ColonExpected, offset, 1),
                        Expect::Key if after_comma && !self.options.allow_trailing_comma => {
                            self.report(ParseErrorKind::PropertyNameExpected, offset, 1)
                        }
                        _ => {}
                    }
                    self.nodes[object.0].closed = true;
                    return offset + 1;
                }
                Item::Punct(b',', _) => {
                    *pos += 1;
                    self.nodes[object.0].commas.push(offset);
                    match expect {
                        Expect::Key => self.report(ParseErrorKind::PropertyNameExpected, offset, 1),
                        Expect::Colon => self.report(ParseErrorKind::ColonExpected, offset, 1),
                        Expect::Value => self.report(ParseErrorKind::ValueExpected, offset, 1),
                        Expect::Comma => {}
                    }
                    // 缺值的属性在逗号处结束
                    if let Some(property) = pending.take() {
                        self.extend(property, offset);
                    }
                    expect = Expect::Key;
                    after_comma = true;
                    last_end = offset + 1;
                }
                Item::Punct(b':', _) => {
                    *pos += 1;
                    match pending {
                        Some(property) if expect == Expect::Colon => {
                            self.nodes[property.0].colon_offset = Some(offset);
                            self.extend(property, offset + 1);
                            expect = Expect::Value;
                        }
                        _ => self.report(ParseErrorKind::InvalidSymbol, offset, 1),
                    }
                    last_end = offset + 1;
                }
                _ if item.is_key() && expect != Expect::Value => {
                    *pos += 1;
                    match expect {
                        Expect::Comma => self.report(ParseErrorKind::CommaExpected, offset, length),
                        Expect::Colon => self.report(ParseErrorKind::ColonExpected, offset, length),
                        _ => {}
                    }
                    if let Item::Value(key) = item {
                        pending = Some(self.begin_property(key, object));
                    }
                    expect = Expect::Colon;
                    after_comma = false;
                    last_end = offset + length;
                }
                _ if item.starts_value() => {
                    after_comma = false;
                    match (expect, pending.take()) {
                        (Expect::Value | Expect::Colon, Some(property)) => {
                            if expect == Expect::Colon {
                                self.report(ParseErrorKind::ColonExpected, offset, length);
                            }
                            if let Some(value) = self.value(items, pos, Some(property), depth + 1, limit) {
                                let end = self.nodes[value.0].end();
                                self.extend(property, end);
                            }
                        }
                        _ => {
                            let kind = match expect {
                                Expect::Comma => ParseErrorKind::CommaExpected,
                                _ => ParseErrorKind::PropertyNameExpected,
                            };
                            self.report(kind, offset, length);
                            skip_value(items, pos);
                        }
                    }
                    expect = Expect::Comma;
                    last_end = items.get(pos.saturating_sub(1)).map_or(offset + length, Item::end);
                }
                _ => {
                    *pos += 1;
                    self.report_unknown(&item);
                }
            }
        }

        match expect {
            Expect::Value => self.report(ParseErrorKind::ValueExpected, limit, 0),
            Expect::Colon => self.report(ParseErrorKind::ColonExpected, limit, 0),
            _ => {}
        }
        self.report(ParseErrorKind::CloseBraceExpected, limit, 0);
        limit.max(last_end)
    }

    /// 返回数组的结束位置；未闭合时延伸到 `limit`
    fn array_elements(
        &mut self,
        array: NodeId,
        items: &[Item<'_>],
        pos: &mut usize,
        depth: usize,
        limit: usize,
    ) -> usize {
        let mut expect_value = true;
        let mut after_comma = false;
        let mut last_end = self.nodes[array.0].offset + 1;

        while let Some(item) = items.get(*pos).copied() {
            let (offset, length) = item.span();
            match item {
                Item::Punct(b']', _) => {
                    *pos += 1;
                    if after_comma && !self.options.allow_trailing_comma {
                        self.report(ParseErrorKind::ValueExpected, offset, 1);
                    }
                    self.nodes[array.0].closed = true;
                    return offset + 1;
                }
                Item::Punct(b',', _) => {
                    *pos += 1;
                    self.nodes[array.0].commas.push(offset);
                    if expect_value {
                        self.report(ParseErrorKind::ValueExpected, offset, 1);
                    }
                    expect_value = true;
                    after_comma = true;
                    last_end = offset + 1;
                }
                _ if item.starts_value() => {
                    if !expect_value {
                        self.report(ParseErrorKind::CommaExpected, offset, length);
                    }
                    self.value(items, pos, Some(array), depth + 1, limit);
                    expect_value = false;
                    after_comma = false;
                    last_end = items.get(pos.saturating_sub(1)).map_or(offset + length, Item::end);
                }
                _ => {
                    *pos += 1;
                    self.report_unknown(&item);
                }
            }
        }

        self.report(ParseErrorKind::CloseBracketExpected, limit, 0);
        limit.max(last_end)
    }

    /// 以键开始一个属性，属性与键共享起始偏移
    fn begin_property(&mut self, key: Node<'_>, object: NodeId) -> NodeId {
        let range = key.byte_range();
        let property = self.push(SyntaxNode::new(NodeKind::Property, range.start, range.len()), Some(object));
        self.scalar(key, Some(property));
        property
    }

    fn extend(&mut self, property: NodeId, end: usize) {
        let node = &mut self.nodes[property.0];
        node.length = node.length.max(end.saturating_sub(node.offset));
    }

    fn scalar(&mut self, node: Node<'_>, parent: Option<NodeId>) -> NodeId {
        let range = node.byte_range();
        let raw = self.text.get(range.clone()).unwrap_or_default();
        let (kind, value) = match node.kind() {
            "string" => (NodeKind::String, Value::String(self.decode_string(raw, range.start))),
            "number" => (NodeKind::Number, self.decode_number(raw, range.start)),
            "true" => (NodeKind::Boolean, Value::Bool(true)),
            "false" => (NodeKind::Boolean, Value::Bool(false)),
            _ => (NodeKind::Null, Value::Null),
        };
        let mut syntax = SyntaxNode::new(kind, range.start, range.len());
        syntax.value = Some(value);
        self.push(syntax, parent)
    }

    /// serde_json 解码字符串；无法解码时保留去掉引号的原文
    fn decode_string(&mut self, raw: &str, offset: usize) -> String {
        if raw.len() < 2 || !raw.ends_with('"') {
            self.report(ParseErrorKind::UnexpectedEndOfString, offset, raw.len());
        } else {
            match serde_json::from_str::<String>(raw) {
                Ok(decoded) => return decoded,
                Err(_) => self.report(ParseErrorKind::InvalidCharacter, offset, raw.len()),
            }
        }
        strip_quotes(NodeKind::String, raw).to_owned()
    }

    fn decode_number(&mut self, raw: &str, offset: usize) -> Value {
        match serde_json::from_str::<Number>(raw) {
            Ok(number) => Value::Number(number),
            Err(_) => {
                self.report(ParseErrorKind::InvalidNumberFormat, offset, raw.len());
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn test_simple_object_tree() {
        let text = r#"{"name": "测试", "age": 30}"#;
        let tree = SyntaxTree::parse(text);
        let root = tree.root().expect("应该有根节点");

        assert_eq!(tree[root].kind, NodeKind::Object);
        assert_eq!(tree[root].offset, 0);
        assert_eq!(tree[root].length, text.len());
        assert_eq!(tree[root].children.len(), 2, "根对象应该有2个属性");

        let name = tree[root].children[0];
        assert_eq!(tree[name].kind, NodeKind::Property);
        assert_eq!(tree.property_key(name), Some("name"));
        assert_eq!(tree[name].colon_offset, Some(7));
        let value = tree.property_value(name).expect("name 应该有值");
        assert_eq!(tree[value].kind, NodeKind::String);
        assert_eq!(tree[value].value, Some(json!("测试")));
        // 属性从键开始，到值结束
        assert_eq!(tree[name].end(), tree[value].end());
        assert_eq!(tree[value].parent, Some(name));
    }

    #[test]
    fn test_nested_paths() {
        let tree = SyntaxTree::parse(r#"{"user": {"profile": {"name": "张三"}}, "items": [1, [2, 3]]}"#);

        let name = tree
            .find_node_at_path(&[key("user"), key("profile"), key("name")])
            .expect("应该找到 name");
        assert_eq!(tree[name].value, Some(json!("张三")));
        assert_eq!(tree.path_of(name), vec![key("user"), key("profile"), key("name")]);

        let three = tree
            .find_node_at_path(&[key("items"), PathSegment::Index(1), PathSegment::Index(1)])
            .expect("应该找到 items[1][1]");
        assert_eq!(tree[three].value, Some(json!(3)));
        assert_eq!(
            tree.path_of(three),
            vec![key("items"), PathSegment::Index(1), PathSegment::Index(1)]
        );

        assert!(tree.find_node_at_path(&[key("missing")]).is_none());
        assert!(tree.find_node_at_path(&[key("items"), PathSegment::Index(5)]).is_none());
        assert!(tree.find_node_at_path(&[PathSegment::Index(0)]).is_none(), "对象不能按下标访问");
        assert_eq!(tree.find_node_at_path(&[]), tree.root());
    }

    #[test]
    fn test_node_offsets_are_unique_per_value() {
        let text = r#"{"a": [1, {"b": null}], "c": "x"}"#;
        let tree = SyntaxTree::parse(text);
        let mut offsets: Vec<usize> = (0..tree.len())
            .map(NodeId)
            .filter(|&id| tree[id].kind != NodeKind::Property)
            .filter(|&id| tree[id].parent.map_or(true, |p| tree[p].kind != NodeKind::Property || tree.property_value(p) == Some(id)))
            .map(|id| tree[id].offset)
            .collect();
        let total = offsets.len();
        offsets.sort_unstable();
        offsets.dedup();
        assert_eq!(offsets.len(), total, "值节点的起始偏移不应重复");
    }

    #[test]
    fn test_duplicate_keys_resolve_to_first() {
        let tree = SyntaxTree::parse(r#"{"a": 1, "a": 2}"#);
        let found = tree.find_node_at_path(&[key("a")]).expect("应该找到 a");
        assert_eq!(tree[found].value, Some(json!(1)));
        // 转换为值时后出现者覆盖
        assert_eq!(tree.to_value(tree.root().unwrap()), Some(json!({"a": 2})));
    }

    #[test]
    fn test_property_without_value() {
        let text = r#"{"b": true, "a": }"#;
        let tree = SyntaxTree::parse(text);
        let root = tree.root().unwrap();
        let a = tree[root].children[1];
        assert_eq!(tree.property_key(a), Some("a"));
        assert!(tree.property_value(a).is_none(), "缺值属性只有键");
        assert!(tree[a].end() < text.len());
        assert!(tree.find_node_at_path(&[key("a")]).is_none());
        assert!(tree.find_node_at_path(&[key("b")]).is_some());
        assert!(tree.errors().iter().any(|e| e.kind == ParseErrorKind::ValueExpected));
        assert_eq!(tree.to_value(root), Some(json!({"b": true})));
    }

    #[test]
    fn test_unclosed_containers_extend_to_end() {
        let text = r#"{"a": [1, 2"#;
        let tree = SyntaxTree::parse(text);
        let root = tree.root().unwrap();
        assert_eq!(tree[root].end(), text.len());
        let array = tree.find_node_at_path(&[key("a")]).unwrap();
        assert_eq!(tree[array].kind, NodeKind::Array);
        assert_eq!(tree[array].children.len(), 2);
        assert_eq!(tree[array].end(), text.len());
    }

    #[test]
    fn test_empty_and_whitespace_text_has_no_root() {
        assert!(SyntaxTree::parse("").root().is_none());
        assert!(SyntaxTree::parse("  \n // 只有注释\n").root().is_none());
        assert!(SyntaxTree::parse(":::").root().is_none());
    }

    #[test]
    fn test_to_value_preserves_key_order() {
        let tree = SyntaxTree::parse(r#"{"z": 1, "a": [true, null, "s"], "m": {"k": -1.5}}"#);
        let value = tree.to_value(tree.root().unwrap()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value["a"], json!([true, null, "s"]));
        assert_eq!(value["m"]["k"], json!(-1.5));
    }

    #[test]
    fn test_quote_padding() {
        assert_eq!(strip_quotes(NodeKind::String, "\"hello\""), "hello");
        assert_eq!(strip_quotes(NodeKind::String, "\"\""), "");
        assert_eq!(strip_quotes(NodeKind::String, "\"open"), "open");
        assert_eq!(strip_quotes(NodeKind::String, "\""), "");
        assert_eq!(strip_quotes(NodeKind::Number, "42"), "42");
        assert_eq!(quote_padding(NodeKind::String, "\"ab\""), (1, 1));
    }

    #[test]
    fn test_comments_and_trailing_comma_are_accepted() {
        let tree = SyntaxTree::parse("{\n  // 注释\n  \"a\": 1, /* 块 */\n}");
        assert!(tree.errors().is_empty(), "JSONC 默认允许注释与尾逗号: {:?}", tree.errors());
        let a = tree.find_node_at_path(&[key("a")]).expect("应该找到 a");
        assert_eq!(tree[a].offset, 21);
        assert!(tree[tree.root().unwrap()].closed);
    }

    #[test]
    fn test_strict_options_report_comments_and_trailing_comma() {
        let options = ParseOptions {
            allow_comments: false,
            allow_trailing_comma: false,
            ..ParseOptions::default()
        };
        let tree = SyntaxTree::parse_with("[1, // c\n]", &options);
        let kinds: Vec<ParseErrorKind> = tree.errors().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ParseErrorKind::InvalidCommentToken));
        assert!(kinds.contains(&ParseErrorKind::ValueExpected));
        assert_eq!(tree.to_value(tree.root().unwrap()), Some(json!([1])));
    }

    #[test]
    fn test_missing_value_and_unclosed_object() {
        let text = r#"{"a": 1, "b": "#;
        let tree = SyntaxTree::parse(text);
        let kinds: Vec<ParseErrorKind> = tree.errors().iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ParseErrorKind::ValueExpected));
        assert!(kinds.contains(&ParseErrorKind::CloseBraceExpected));
        let root = tree.root().unwrap();
        assert!(!tree[root].closed);
        assert_eq!(tree[root].end(), text.len(), "未闭合对象在文本末尾结束");
        assert_eq!(tree.to_value(root), Some(json!({"a": 1})));
    }

    #[test]
    fn test_unknown_symbols_are_skipped() {
        let tree = SyntaxTree::parse("[1, foo, 3]");
        assert!(!tree.errors().is_empty());
        assert_eq!(tree.to_value(tree.root().unwrap()), Some(json!([1, 3])));
    }

    #[test]
    fn test_string_escapes_are_decoded() {
        let tree = SyntaxTree::parse(r#"["a\"bé"]"#);
        let first = tree[tree.root().unwrap()].children[0];
        assert_eq!(tree[first].value, Some(json!("a\"bé")));
        assert_eq!(tree[first].offset, 1);
    }

    #[test]
    fn test_nesting_limit_skips_deep_containers() {
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        let tree = SyntaxTree::parse_with("[[[1]], 2]", &options);
        assert_eq!(tree.errors()[0].kind, ParseErrorKind::NestingTooDeep);
        assert_eq!(tree.to_value(tree.root().unwrap()), Some(json!([[], 2])));
    }

    #[test]
    fn test_leading_bom_is_ignored() {
        let tree = SyntaxTree::parse("\u{feff}{\"a\": 1}");
        let root = tree.root().expect("应该有根节点");
        assert_eq!(tree[root].offset, 3);
        assert_eq!(tree.to_value(root), Some(json!({"a": 1})));
    }

    #[test]
    fn test_commas_are_recorded_per_container() {
        let text = r#"{"a": [1, 2], "b": 3}"#;
        let tree = SyntaxTree::parse(text);
        let root = tree.root().unwrap();
        assert_eq!(tree[root].commas, vec![12]);
        let list = tree.find_node_at_path(&[key("a")]).unwrap();
        assert_eq!(tree[list].commas, vec![8]);
        assert!(tree[list].closed);
    }
}
