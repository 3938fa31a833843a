//! 故障边界 - 统一的失败分类与诊断
//!
//! 浏览器和无头沙箱中的三个捕获点（渲染边界、同步错误、未处理拒绝）
//! 都汇入同一个 `reportFailure(kind, detail)`，这里定义两边共享的分类表。

use crate::error::PreviewError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Transform,
    UnresolvedModule,
    MissingEntryExport,
    Runtime,
    Async,
    ReadinessTimeout,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::Transform,
        FailureKind::UnresolvedModule,
        FailureKind::MissingEntryExport,
        FailureKind::Runtime,
        FailureKind::Async,
        FailureKind::ReadinessTimeout,
    ];

    /// JS 与 Rust 之间传递的编码
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::Transform => "transform",
            FailureKind::UnresolvedModule => "unresolved-module",
            FailureKind::MissingEntryExport => "missing-entry-export",
            FailureKind::Runtime => "runtime",
            FailureKind::Async => "async",
            FailureKind::ReadinessTimeout => "readiness-timeout",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// 诊断面板标题
    pub fn title(&self) -> &'static str {
        match self {
            FailureKind::Transform => "Transform Error",
            FailureKind::UnresolvedModule => "Module Not Found",
            FailureKind::MissingEntryExport => "Missing Entry Export",
            FailureKind::Runtime => "Runtime Error",
            FailureKind::Async => "Unhandled Promise Rejection",
            FailureKind::ReadinessTimeout => "Preview Timed Out",
        }
    }

    /// 编译阶段发现的错误会中止整个编译，不会挂载任何 UI
    pub fn aborts_compile(&self) -> bool {
        matches!(
            self,
            FailureKind::Transform | FailureKind::UnresolvedModule | FailureKind::MissingEntryExport
        )
    }

    /// 注入到脚手架中的标题表
    pub fn title_table() -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for kind in Self::ALL {
            map.insert(kind.code().to_string(), serde_json::Value::from(kind.title()));
        }
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 渲染到预览表面的诊断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 基础设施错误按运行时错误展示
    pub fn from_error(err: &PreviewError) -> Self {
        Self::new(err.kind().unwrap_or(FailureKind::Runtime), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.message)
    }
}

impl From<&PreviewError> for Diagnostic {
    fn from(err: &PreviewError) -> Self {
        Diagnostic::from_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for kind in FailureKind::ALL {
            assert_eq!(FailureKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(FailureKind::from_code("nope"), None);
    }

    #[test]
    fn test_compile_phase_kinds() {
        assert!(FailureKind::Transform.aborts_compile());
        assert!(!FailureKind::Async.aborts_compile());
    }
}
