//! 类型擦除与 JSX 降级
//!
//! 交给 deno_ast（swc）完成，输出保留 `import`/`export` 的普通 JavaScript。
//! JSX 使用经典运行时：`React.createElement` 与 `React.Fragment`。

use crate::error::{PreviewError, Result};
use deno_ast::diagnostics::Diagnostic;
use deno_ast::{
    EmitOptions, MediaType, ModuleSpecifier, ParseDiagnostic, ParseParams, SourceMapOption,
    TranspileModuleOptions, TranspileOptions,
};

pub fn transpile(path: &str, source: &str, jsx: bool) -> Result<String> {
    let specifier = ModuleSpecifier::parse(&format!("file:///{}", path))
        .map_err(|e| PreviewError::transform(path, 1, 1, e.to_string()))?;
    let media_type = if jsx { MediaType::Tsx } else { MediaType::TypeScript };

    let parsed = deno_ast::parse_module(ParseParams {
        specifier,
        text: source.into(),
        media_type,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    })
    .map_err(|d| diagnostic_error(path, &d))?;

    // 可恢复的语法错误留在 diagnostics 里，transpile 失败时用它定位
    let located = parsed.diagnostics().first().map(|d| diagnostic_error(path, d));

    let emit = EmitOptions {
        source_map: SourceMapOption::None,
        ..Default::default()
    };
    let transpiled = parsed
        .transpile(&TranspileOptions::default(), &TranspileModuleOptions::default(), &emit)
        .map_err(|e| located.unwrap_or_else(|| PreviewError::transform(path, 1, 1, e.to_string())))?;

    Ok(transpiled.into_source().text)
}

fn diagnostic_error(path: &str, diagnostic: &ParseDiagnostic) -> PreviewError {
    let position = diagnostic.display_position();
    PreviewError::transform(
        path,
        position.line_number,
        position.column_number,
        diagnostic.message().to_string(),
    )
}
