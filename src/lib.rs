//! Live Preview Engine - 生成式 React 项目的实时预览引擎
//! 把 (路径, 源码) 快照编译成可执行的预览：浏览器 iframe 文档，或 QuickJS 无头渲染

pub mod config;
pub mod error;
pub mod externals;
pub mod fault;
pub mod project;
pub mod resolver;

// TSX/TS/JSX 转换
pub mod transform;

// 模块注册表与编译
pub mod registry;

// 脚手架片段
pub mod scaffold;

// QuickJS 无头沙箱
pub mod sandbox;

// 宿主入口与刷新协议
pub mod preview;

pub use config::PreviewConfig;
pub use error::{PreviewError, Result};
pub use externals::{Arrival, BindingTable, ExternalLib};
pub use fault::{Diagnostic, FailureKind};
pub use preview::{Epoch, LivePreview};
pub use project::{File, Project};
pub use registry::{compile, CompiledProject};
pub use resolver::{Resolved, Resolver};
pub use sandbox::{Sandbox, Surface};
pub use scaffold::{Scaffold, ScaffoldBuilder, Target};

// FFI 导出
mod ffi;
pub use ffi::*;

// 单元测试
#[cfg(test)]
mod tests;
