//! 预览通道：把解析后的文档推给预览面板，并在面板请求时执行 JSONPath 查询

use jsonpath_rust::JsonPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::vm::bridge::STATUS_ERROR_PREFIX;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("消息序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("预览面板不可用: {0}")]
    Port(String),
}

/// 发往预览面板的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PreviewMessage {
    Json { payload: Option<Value> },
    Result { expression: String, output: String },
}

/// 预览面板发来的请求
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PreviewRequest {
    GetInitialJson,
    Evaluate { expression: String },
}

pub trait PreviewPort {
    fn post(&mut self, message: &str) -> Result<(), PreviewError>;
}

pub struct PreviewChannel<P> {
    port: P,
    ready: bool,
    document: Option<Value>,
}

impl<P: PreviewPort> PreviewChannel<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            ready: false,
            document: None,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 面板加载完成，推送当前文档
    pub fn on_ready(&mut self, document: Option<Value>) -> Result<(), PreviewError> {
        self.ready = true;
        self.document = document;
        self.push_document()
    }

    /// 文档变化：面板未就绪时只缓存，就绪后再推送
    pub fn on_document_changed(&mut self, document: Option<Value>) -> Result<(), PreviewError> {
        self.document = document;
        if !self.ready {
            tracing::debug!("预览面板尚未就绪，暂缓推送");
            return Ok(());
        }
        self.push_document()
    }

    /// 处理面板发来的原始消息；无法识别的消息记录后丢弃
    pub fn handle_message(&mut self, raw: &str) -> Result<(), PreviewError> {
        let request: PreviewRequest = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("忽略无法识别的预览消息: {}", e);
                return Ok(());
            }
        };
        match request {
            PreviewRequest::GetInitialJson => self.push_document(),
            PreviewRequest::Evaluate { expression } => {
                let output = evaluate(self.document.as_ref(), &expression);
                self.post(&PreviewMessage::Result { expression, output })
            }
        }
    }

    fn push_document(&mut self) -> Result<(), PreviewError> {
        let message = PreviewMessage::Json {
            payload: self.document.clone(),
        };
        self.post(&message)
    }

    fn post(&mut self, message: &PreviewMessage) -> Result<(), PreviewError> {
        let raw = serde_json::to_string(message)?;
        self.port.post(&raw)
    }
}

/// 在文档上执行 JSONPath：单个结果直接输出，多个结果输出为数组；错误渲染为文本
pub fn evaluate(document: Option<&Value>, expression: &str) -> String {
    if expression.trim().is_empty() {
        return String::new();
    }
    let Some(document) = document else {
        return format!("{}没有可查询的文档", STATUS_ERROR_PREFIX);
    };
    let hits: Vec<&Value> = match document.query(expression) {
        Ok(hits) => hits,
        Err(e) => return format!("{}{}", STATUS_ERROR_PREFIX, e),
    };
    let rendered = match hits.as_slice() {
        [single] => serde_json::to_string_pretty(single),
        _ => serde_json::to_string_pretty(&hits),
    };
    rendered.unwrap_or_else(|e| format!("{}{}", STATUS_ERROR_PREFIX, e))
}
