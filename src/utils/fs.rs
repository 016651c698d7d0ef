//! IO helper: 读取待浏览的 JSON/JSONC 文件

use std::{fs, path::Path};

use crate::model::document::DocumentError;
use crate::vm::ports::DocumentInfo;

/// 读取文件全文（不做 JSON 校验，容错解析交给语法树）
pub fn read_document(p: &Path) -> Result<String, DocumentError> {
    Ok(fs::read_to_string(p)?)
}

/// 按扩展名推断语言：.jsonc 为 jsonc，.json 为 json，其余原样返回扩展名
pub fn language_id_for(p: &Path) -> String {
    match p.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jsonc") => "jsonc".to_string(),
        Some(ext) if ext.eq_ignore_ascii_case("json") => "json".to_string(),
        Some(ext) => ext.to_ascii_lowercase(),
        None => "plaintext".to_string(),
    }
}

/// 本地文件对应的文档信息
pub fn document_info_for(p: &Path) -> DocumentInfo {
    let absolute = fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    DocumentInfo::new(
        format!("file://{}", absolute.display()),
        "file",
        language_id_for(p),
    )
}
