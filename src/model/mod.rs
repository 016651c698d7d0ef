pub mod document;
pub mod parser;
pub mod path;
pub mod performance;
pub mod syntax_tree;
