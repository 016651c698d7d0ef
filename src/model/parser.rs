//! JSONC 解析入口：语法树由 tree-sitter-json 产出
//!
//! tree-sitter 对任何输入都会给出一棵树，出错的片段以 ERROR / MISSING 节点表示。
//! 诊断在把它整理成 [`SyntaxTree`](crate::model::syntax_tree::SyntaxTree) 时产生。

use tree_sitter::{Parser, Tree};

/// 解析诊断类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidSymbol,
    InvalidNumberFormat,
    InvalidCharacter,
    PropertyNameExpected,
    ValueExpected,
    ColonExpected,
    CommaExpected,
    CloseBraceExpected,
    CloseBracketExpected,
    EndOfFileExpected,
    InvalidCommentToken,
    UnexpectedEndOfString,
    NestingTooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub length: usize,
}

/// 解析选项（默认按 JSONC 宽松处理）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// 是否允许 `//` 与 `/* */` 注释
    pub allow_comments: bool,
    /// 是否允许对象/数组末尾的逗号
    pub allow_trailing_comma: bool,
    /// 最大嵌套深度，超出部分跳过不建节点
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_comments: true,
            allow_trailing_comma: true,
            max_depth: 512,
        }
    }
}

/// 用 JSON 语法解析文本；语法加载失败时返回 None
pub fn parse_source(text: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_json::LANGUAGE.into()) {
        tracing::warn!("无法加载 JSON 语法: {}", e);
        return None;
    }
    parser.parse(text, None)
}
