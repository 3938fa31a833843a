//! 代码生成：token 流 -> 普通 JavaScript
//!
//! `import(x)` 降级为基于 require 的 Promise，其余 token 原样拼接。

use super::lexer::{matching, next_sig, TemplatePart, Token, TokenKind};

pub fn emit(tokens: &[Token]) -> String {
    let mut out = String::new();
    emit_into(tokens, &mut out);
    out
}

fn emit_into(tokens: &[Token], out: &mut String) {
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        match &tok.kind {
            TokenKind::Template(parts) => {
                out.push('`');
                for part in parts {
                    match part {
                        TemplatePart::Raw(raw) => out.push_str(raw),
                        TemplatePart::Expr(expr) => {
                            out.push_str("${");
                            emit_into(expr, out);
                            out.push('}');
                        }
                    }
                }
                out.push('`');
            }
            TokenKind::Ident if tok.text == "import" && is_dynamic_import(tokens, i) => {
                if let Some(open) = next_sig(tokens, i + 1) {
                    if let Some(close) = matching(tokens, open) {
                        out.push_str("Promise.resolve().then(function () { return require");
                        emit_into(&tokens[open..=close], out);
                        out.push_str("; })");
                        i = close + 1;
                        continue;
                    }
                }
                out.push_str(&tok.text);
            }
            _ => out.push_str(&tok.text),
        }
        i += 1;
    }
}

/// `import(` 但不是 `import.meta` 或属性名
fn is_dynamic_import(tokens: &[Token], i: usize) -> bool {
    let prev_is_dot = tokens[..i]
        .iter()
        .rev()
        .find(|t| !t.is_trivia())
        .map(|t| t.is_punct(".") || t.is_punct("?."))
        .unwrap_or(false);
    !prev_is_dot
        && next_sig(tokens, i + 1)
            .map(|j| tokens[j].is_punct("("))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn emit_src(src: &str) -> String {
        emit(&Lexer::new(src, "a.js").tokenize().unwrap())
    }

    #[test]
    fn test_tokens_are_kept_verbatim() {
        let src = "const a = /* n */ b >= 1 ? `x${c + `y${d}`}` : /re/g;";
        assert_eq!(emit_src(src), src);
    }

    #[test]
    fn test_dynamic_import() {
        assert_eq!(
            emit_src("import('./Lazy')"),
            "Promise.resolve().then(function () { return require('./Lazy'); })"
        );
    }

    #[test]
    fn test_import_meta_and_member_are_untouched() {
        assert_eq!(emit_src("loader.import('x')"), "loader.import('x')");
    }
}
