//! VM桥接层常量与命令标识
//!
//! 宿主注册命令、设置上下文标志时使用这里的字符串，避免魔法值散落各处

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// === 宿主约定 ===
pub const TREE_ACTIVE_CONTEXT: &str = "code-json-editor.tree-active";
pub const ELIGIBLE_SCHEME: &str = "file";
pub const ELIGIBLE_LANGUAGES: &[&str] = &["json", "jsonc"];
/// 光标跟随时树视图向下展开的层数
pub const DEFAULT_REVEAL_EXPAND_LEVELS: u8 = 3;

// === 命令标识 ===
pub const CMD_TREE_ITEM_SELECTION: &str = "code-json-editor.tree-item-selection";
pub const CMD_HIGHLIGHT_VALUE: &str = "code-json-editor.highlight-value";
pub const CMD_JUMP_END: &str = "code-json-editor.jump-end";
pub const CMD_COPY_VALUE: &str = "code-json-editor.copy-value-to-clipboard";
pub const CMD_COPY_KEY: &str = "code-json-editor.copy-key-to-clipboard";
pub const CMD_COPY_PATH: &str = "code-json-editor.copy-path-to-clipboard";

// === 状态提示 ===
pub const STATUS_READY: &str = "就绪";
pub const STATUS_LOADED: &str = "文件加载完成";
pub const STATUS_INELIGIBLE: &str = "当前文档不是 JSON 文件";
pub const STATUS_COPIED: &str = "已复制到剪贴板";
pub const STATUS_ERROR_PREFIX: &str = "错误: ";

/// 树节点上的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SelectNode,
    HighlightValue,
    JumpToEnd,
    CopyValue,
    CopyKey,
    CopyPath,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::SelectNode,
        Command::HighlightValue,
        Command::JumpToEnd,
        Command::CopyValue,
        Command::CopyKey,
        Command::CopyPath,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Command::SelectNode => CMD_TREE_ITEM_SELECTION,
            Command::HighlightValue => CMD_HIGHLIGHT_VALUE,
            Command::JumpToEnd => CMD_JUMP_END,
            Command::CopyValue => CMD_COPY_VALUE,
            Command::CopyKey => CMD_COPY_KEY,
            Command::CopyPath => CMD_COPY_PATH,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("未知命令: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|command| command.id() == s)
            .ok_or_else(|| UnknownCommand(s.to_owned()))
    }
}
