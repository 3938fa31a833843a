//! 错误类型
//!
//! 六种诊断类别（转换、模块未找到、入口缺失、运行时、异步、就绪超时）
//! 加上少量基础设施错误。

use crate::fault::FailureKind;
use thiserror::Error;

/// 预览引擎错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreviewError {
    /// 源码无法解析或降级
    #[error("{path}:{line}:{column}: {message}")]
    Transform {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// 说明符既不是外部库也不是项目文件
    #[error("Cannot find module '{specifier}' (requested from {importer})")]
    UnresolvedModule { specifier: String, importer: String },

    /// 入口模块缺失或没有可调用的默认导出
    #[error("{0}")]
    MissingEntryExport(String),

    /// 渲染或事件处理中抛出的异常
    #[error("{0}")]
    Runtime(String),

    /// 未处理的 Promise 拒绝
    #[error("{0}")]
    Async(String),

    /// 外部依赖在重试预算内没有就绪
    #[error("External libraries not ready after {attempts} attempts: {}", missing.join(", "))]
    ReadinessTimeout { attempts: u32, missing: Vec<String> },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(String),

    /// QuickJS 引擎自身的故障（不是用户代码的错误）
    #[error("engine: {0}")]
    Engine(String),

    #[error("network: {0}")]
    Network(String),

    /// 合成事件找不到目标元素或处理函数
    #[error("event: {0}")]
    Event(String),
}

impl PreviewError {
    pub fn transform(path: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        PreviewError::Transform {
            path: path.to_string(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn unresolved(specifier: &str, importer: &str) -> Self {
        PreviewError::UnresolvedModule {
            specifier: specifier.to_string(),
            importer: importer.to_string(),
        }
    }

    /// 映射到诊断分类；基础设施错误没有对应类别
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            PreviewError::Transform { .. } => Some(FailureKind::Transform),
            PreviewError::UnresolvedModule { .. } => Some(FailureKind::UnresolvedModule),
            PreviewError::MissingEntryExport(_) => Some(FailureKind::MissingEntryExport),
            PreviewError::Runtime(_) => Some(FailureKind::Runtime),
            PreviewError::Async(_) => Some(FailureKind::Async),
            PreviewError::ReadinessTimeout { .. } => Some(FailureKind::ReadinessTimeout),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PreviewError {
    fn from(err: std::io::Error) -> Self {
        PreviewError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        PreviewError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;
