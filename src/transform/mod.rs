//! 源码转换器
//!
//! TSX/TS/JSX -> 可在 `new Function('exports', 'require', 'module', 'React', body)`
//! 中执行的 CommonJS 风格 JavaScript。流程：类型擦除与 JSX 降级 -> 词法分析 -> 模块降级 -> 生成。

pub mod emit;
pub mod lexer;
pub mod modules;
pub mod transpile;

use crate::error::Result;
use serde::Serialize;

/// 单个文件的转换结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub path: String,
    pub code: String,
    pub imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
    pub exports: Vec<String>,
    pub has_default_export: bool,
    /// 含 import/export 语法；否则视为 CommonJS，不检查默认导出
    pub is_esm: bool,
}

/// `.ts` 文件不识别 JSX，其余扩展名都按 TSX 处理
pub fn jsx_enabled(path: &str) -> bool {
    !path.ends_with(".ts")
}

pub fn transform(path: &str, source: &str) -> Result<TransformOutput> {
    let js = transpile::transpile(path, source, jsx_enabled(path))?;
    let tokens = lexer::Lexer::new(&js, path).tokenize()?;
    let lowered = modules::lower(tokens, path)?;

    let mut code = String::with_capacity(js.len() + 256);
    code.push_str(&lowered.prologue);
    code.push_str(&emit::emit(&lowered.tokens));
    code.push('\n');
    code.push_str(&lowered.epilogue);

    tracing::trace!(path, bytes = code.len(), imports = lowered.info.imports.len(), "transformed");

    Ok(TransformOutput {
        path: path.to_string(),
        code,
        imports: lowered.info.imports,
        dynamic_imports: lowered.info.dynamic_imports,
        exports: lowered.info.exports,
        has_default_export: lowered.info.has_default_export,
        is_esm: lowered.info.is_esm,
    })
}
