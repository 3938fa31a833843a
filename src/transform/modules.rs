//! 模块语法降级
//!
//! 顶层 `import`/`export` 改写为 `require` 调用和 `exports` 赋值。
//! 命名导入在导入时取快照；`export ... from` 的再导出使用 getter 保持实时。

use super::lexer::{matching, next_sig, TemplatePart, Token, TokenKind};
use crate::error::{PreviewError, Result};
use std::collections::BTreeSet;

/// 从模块语法中提取的元数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleInfo {
    pub imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
    pub exports: Vec<String>,
    pub has_default_export: bool,
    pub is_esm: bool,
}

#[derive(Debug)]
pub struct Lowered {
    pub tokens: Vec<Token>,
    pub prologue: String,
    pub epilogue: String,
    pub info: ModuleInfo,
}

struct Specifier {
    imported: String,
    local: String,
}

pub fn lower(tokens: Vec<Token>, path: &str) -> Result<Lowered> {
    let mut info = ModuleInfo::default();
    collect_dynamic_imports(&tokens, &mut info.dynamic_imports);

    let mut lowerer = Lowerer {
        toks: tokens,
        out: Vec::new(),
        path,
        counter: 0,
        prologue: Vec::new(),
        epilogue: Vec::new(),
        terminate_after: BTreeSet::new(),
        info,
    };
    lowerer.run()?;

    let mut prologue = String::new();
    if lowerer.info.is_esm {
        prologue.push_str("Object.defineProperty(exports, \"__esModule\", { value: true }); ");
    }
    for line in &lowerer.prologue {
        prologue.push_str(line);
        prologue.push(' ');
    }
    let epilogue = if lowerer.epilogue.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", lowerer.epilogue.join("\n"))
    };

    Ok(Lowered {
        tokens: lowerer.out,
        prologue,
        epilogue,
        info: lowerer.info,
    })
}

struct Lowerer<'a> {
    toks: Vec<Token>,
    out: Vec<Token>,
    path: &'a str,
    counter: usize,
    prologue: Vec<String>,
    epilogue: Vec<String>,
    /// 匿名默认导出函数/类的函数体结尾，之后补一个 ';'
    terminate_after: BTreeSet<usize>,
    info: ModuleInfo,
}

impl<'a> Lowerer<'a> {
    fn run(&mut self) -> Result<()> {
        let mut depth = 0usize;
        let mut i = 0;
        while i < self.toks.len() {
            let tok = &self.toks[i];
            if depth == 0 && !self.after_dot(i) {
                if tok.is_ident("import") && self.is_import_statement(i) {
                    i = self.import(i)?;
                    continue;
                }
                if tok.is_ident("export") {
                    i = self.export(i)?;
                    continue;
                }
            }
            if tok.kind == TokenKind::Punct {
                match tok.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            self.out.push(tok.clone());
            if self.terminate_after.contains(&i) {
                self.out.push(Token::synthetic(";", tok.line, tok.column));
            }
            i += 1;
        }
        Ok(())
    }

    fn after_dot(&self, i: usize) -> bool {
        self.toks[..i]
            .iter()
            .rev()
            .find(|t| !t.is_trivia())
            .map(|t| t.is_punct(".") || t.is_punct("?."))
            .unwrap_or(false)
    }

    fn is_import_statement(&self, i: usize) -> bool {
        match self.sig(i + 1) {
            Some(j) => !(self.toks[j].is_punct("(") || self.toks[j].is_punct(".")),
            None => false,
        }
    }

    fn sig(&self, from: usize) -> Option<usize> {
        next_sig(&self.toks, from)
    }

    fn error(&self, at: usize, message: impl Into<String>) -> PreviewError {
        let tok = &self.toks[at.min(self.toks.len().saturating_sub(1))];
        PreviewError::transform(self.path, tok.line, tok.column, message)
    }

    fn expect_sig(&self, from: usize, at: usize, what: &str) -> Result<usize> {
        self.sig(from)
            .ok_or_else(|| self.error(at, format!("Unexpected end of input, expected {}", what)))
    }

    fn end_statement(&self, j: usize) -> usize {
        match self.sig(j) {
            Some(k) if self.toks[k].is_punct(";") => k + 1,
            _ => j,
        }
    }

    fn string_at(&self, j: usize, what: &str) -> Result<String> {
        let tok = &self.toks[j];
        if tok.kind != TokenKind::Str {
            return Err(self.error(j, format!("Expected {} string, found '{}'", what, tok.text)));
        }
        Ok(unquote(&tok.text))
    }

    fn next_import_var(&mut self) -> String {
        let name = format!("__import{}", self.counter);
        self.counter += 1;
        name
    }

    fn emit(&mut self, at: usize, code: String) {
        let tok = &self.toks[at];
        let synthetic = Token::synthetic(code, tok.line, tok.column);
        self.out.push(synthetic);
    }

    fn import(&mut self, i: usize) -> Result<usize> {
        self.info.is_esm = true;
        let mut j = self.expect_sig(i + 1, i, "import clause")?;

        if self.toks[j].kind == TokenKind::Str {
            let spec = self.string_at(j, "module")?;
            self.info.imports.push(spec.clone());
            self.emit(i, format!("require({});", quote(&spec)));
            return Ok(self.end_statement(j + 1));
        }

        let mut default = None;
        let mut namespace = None;
        let mut named: Vec<Specifier> = Vec::new();
        let mut had_named_clause = false;

        if self.toks[j].kind == TokenKind::Ident && !self.toks[j].is_ident("from") {
            default = Some(self.toks[j].text.clone());
            j = self.expect_sig(j + 1, j, "'from'")?;
            if self.toks[j].is_punct(",") {
                j = self.expect_sig(j + 1, j, "import specifiers")?;
            }
        }
        if self.toks[j].is_punct("*") {
            let as_kw = self.expect_sig(j + 1, j, "'as'")?;
            let name = self.expect_sig(as_kw + 1, as_kw, "namespace name")?;
            if !self.toks[as_kw].is_ident("as") || self.toks[name].kind != TokenKind::Ident {
                return Err(self.error(j, "Expected '* as name' in import statement"));
            }
            namespace = Some(self.toks[name].text.clone());
            j = self.expect_sig(name + 1, name, "'from'")?;
        }
        if self.toks[j].is_punct("{") {
            let close = matching(&self.toks, j).ok_or_else(|| self.error(j, "Unclosed '{' in import"))?;
            named = self.specifiers(j, close)?;
            had_named_clause = true;
            j = self.expect_sig(close + 1, close, "'from'")?;
        }

        if !self.toks[j].is_ident("from") {
            return Err(self.error(j, format!("Expected 'from' in import statement, found '{}'", self.toks[j].text)));
        }
        let s = self.expect_sig(j + 1, j, "module specifier")?;
        let spec = self.string_at(s, "module")?;
        let end = self.end_statement(s + 1);

        // `import {} from 'x'` 不产生依赖
        if default.is_none() && namespace.is_none() && had_named_clause && named.is_empty() {
            return Ok(end);
        }

        self.info.imports.push(spec.clone());
        let var = self.next_import_var();
        let mut code = format!("var {} = require({});", var, quote(&spec));
        if let Some(name) = default {
            code.push_str(&format!(
                " var {name} = {v} && {v}.__esModule ? {v}[\"default\"] : {v};",
                name = name,
                v = var
            ));
        }
        if let Some(name) = namespace {
            code.push_str(&format!(" var {} = {};", name, var));
        }
        for spec in named {
            code.push_str(&format!(" var {} = {}[{}];", spec.local, var, quote(&spec.imported)));
        }
        self.emit(i, code);
        Ok(end)
    }

    /// `{ a, b as c }`
    fn specifiers(&self, open: usize, close: usize) -> Result<Vec<Specifier>> {
        let mut groups: Vec<Vec<&Token>> = vec![Vec::new()];
        for tok in self.toks[open + 1..close].iter().filter(|t| !t.is_trivia()) {
            if tok.is_punct(",") {
                groups.push(Vec::new());
            } else if let Some(g) = groups.last_mut() {
                g.push(tok);
            }
        }

        let mut specs = Vec::new();
        for rest in groups.into_iter().filter(|g| !g.is_empty()) {
            let valid = match rest.len() {
                1 => true,
                3 => rest[1].is_ident("as"),
                _ => false,
            };
            if !valid {
                return Err(self.error(open, "Malformed import/export specifier list"));
            }
            let imported = unquote(&rest[0].text);
            let local = if rest.len() == 3 { unquote(&rest[2].text) } else { imported.clone() };
            specs.push(Specifier { imported, local });
        }
        Ok(specs)
    }

    fn export(&mut self, i: usize) -> Result<usize> {
        self.info.is_esm = true;
        let j = self.expect_sig(i + 1, i, "export declaration")?;
        let tok = self.toks[j].clone();

        match (tok.kind.clone(), tok.text.as_str()) {
            (TokenKind::Ident, "default") => self.export_default(j),
            (TokenKind::Punct, "*") => self.export_star(i, j),
            (TokenKind::Punct, "{") => self.export_list(i, j),
            (TokenKind::Ident, "const") | (TokenKind::Ident, "let") | (TokenKind::Ident, "var") => {
                for name in self.declared_names(j)? {
                    self.export_name(&name, &name);
                }
                Ok(j)
            }
            (TokenKind::Ident, "function") | (TokenKind::Ident, "async") => {
                let name = self.declaration_name(j, "function")?;
                self.prologue.push(format!("exports.{} = {};", name, name));
                self.info.exports.push(name);
                Ok(j)
            }
            (TokenKind::Ident, "class") => {
                let name = self.declaration_name(j, "class")?;
                self.export_name(&name, &name);
                Ok(j)
            }
            _ => Err(self.error(j, format!("Unexpected '{}' after export", tok.text))),
        }
    }

    fn export_name(&mut self, exported: &str, local: &str) {
        if exported == "default" {
            self.info.has_default_export = true;
        }
        self.epilogue.push(format!("exports[{}] = {};", quote(exported), local));
        self.info.exports.push(exported.to_string());
    }

    /// `function`/`class` 后面的名字（跳过 async 与 `*`）
    fn declaration_name(&self, j: usize, keyword: &str) -> Result<String> {
        let mut k = j;
        while !self.toks[k].is_ident(keyword) {
            k = self.expect_sig(k + 1, k, keyword)?;
        }
        let mut n = self.expect_sig(k + 1, k, "declaration name")?;
        if self.toks[n].is_punct("*") {
            n = self.expect_sig(n + 1, n, "declaration name")?;
        }
        let name = &self.toks[n];
        if name.kind != TokenKind::Ident {
            return Err(self.error(n, format!("Expected a name after '{}'", keyword)));
        }
        Ok(name.text.clone())
    }

    fn export_default(&mut self, j: usize) -> Result<usize> {
        self.info.has_default_export = true;
        self.info.exports.push("default".to_string());
        let k = self.expect_sig(j + 1, j, "default export")?;
        let tok = self.toks[k].clone();

        let is_function = tok.is_ident("function")
            || (tok.is_ident("async")
                && self.sig(k + 1).map(|n| self.toks[n].is_ident("function")).unwrap_or(false));
        let is_class = tok.is_ident("class");

        if is_function || is_class {
            let keyword = if is_function { "function" } else { "class" };
            let mut kw = k;
            while !self.toks[kw].is_ident(keyword) {
                kw = self.expect_sig(kw + 1, kw, keyword)?;
            }
            let mut n = self.expect_sig(kw + 1, kw, "declaration")?;
            if self.toks[n].is_punct("*") {
                n = self.expect_sig(n + 1, n, "declaration")?;
            }
            let named = self.toks[n].is_name() && !self.toks[n].is_ident("extends");
            if named {
                let name = self.toks[n].text.clone();
                let line = format!("exports[\"default\"] = {};", name);
                if is_function {
                    self.prologue.push(line);
                } else {
                    self.epilogue.push(line);
                }
                return Ok(k);
            }

            self.emit(j, "exports[\"default\"] = ".to_string());
            if let Some(body_close) = self.body_end(n, is_function) {
                self.terminate_after.insert(body_close);
            }
            return Ok(k);
        }

        self.emit(j, "exports[\"default\"] = ".to_string());
        Ok(k)
    }

    /// 匿名函数/类主体的右花括号
    fn body_end(&self, from: usize, is_function: bool) -> Option<usize> {
        let mut j = from;
        if is_function {
            let open = (from..self.toks.len()).find(|&p| self.toks[p].is_punct("("))?;
            j = matching(&self.toks, open)? + 1;
        }
        let brace = (j..self.toks.len()).find(|&p| self.toks[p].is_punct("{"))?;
        matching(&self.toks, brace)
    }

    fn export_star(&mut self, i: usize, j: usize) -> Result<usize> {
        let mut k = self.expect_sig(j + 1, j, "'from'")?;
        let mut alias = None;
        if self.toks[k].is_ident("as") {
            let n = self.expect_sig(k + 1, k, "namespace name")?;
            alias = Some(unquote(&self.toks[n].text));
            k = self.expect_sig(n + 1, n, "'from'")?;
        }
        if !self.toks[k].is_ident("from") {
            return Err(self.error(k, "Expected 'from' in export statement"));
        }
        let s = self.expect_sig(k + 1, k, "module specifier")?;
        let spec = self.string_at(s, "module")?;
        self.info.imports.push(spec.clone());
        let var = self.next_import_var();

        let code = match alias {
            Some(name) => {
                if name == "default" {
                    self.info.has_default_export = true;
                }
                self.info.exports.push(name.clone());
                format!("var {v} = require({s}); exports[{n}] = {v};", v = var, s = quote(&spec), n = quote(&name))
            }
            None => format!(
                "var {v} = require({s}); Object.keys({v}).forEach(function (k) {{ if (k !== \"default\" && k !== \"__esModule\" && !Object.prototype.hasOwnProperty.call(exports, k)) Object.defineProperty(exports, k, {{ enumerable: true, get: function () {{ return {v}[k]; }} }}); }});",
                v = var,
                s = quote(&spec)
            ),
        };
        self.emit(i, code);
        Ok(self.end_statement(s + 1))
    }

    fn export_list(&mut self, i: usize, j: usize) -> Result<usize> {
        let close = matching(&self.toks, j).ok_or_else(|| self.error(j, "Unclosed '{' in export"))?;
        let specs = self.specifiers(j, close)?;

        let from = self
            .sig(close + 1)
            .filter(|&k| self.toks[k].is_ident("from"));
        let Some(from) = from else {
            for spec in &specs {
                self.export_name(&spec.local, &spec.imported);
            }
            return Ok(self.end_statement(close + 1));
        };

        let s = self.expect_sig(from + 1, from, "module specifier")?;
        let spec_path = self.string_at(s, "module")?;
        self.info.imports.push(spec_path.clone());
        let var = self.next_import_var();
        let mut code = format!("var {} = require({});", var, quote(&spec_path));
        for spec in &specs {
            if spec.local == "default" {
                self.info.has_default_export = true;
            }
            self.info.exports.push(spec.local.clone());
            code.push_str(&format!(
                " Object.defineProperty(exports, {name}, {{ enumerable: true, get: function () {{ return {v}[{imported}]; }} }});",
                name = quote(&spec.local),
                v = var,
                imported = quote(&spec.imported)
            ));
        }
        self.emit(i, code);
        Ok(self.end_statement(s + 1))
    }

    /// `const a = 1, { b, c: d } = obj` 声明的绑定名
    fn declared_names(&self, j: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut k = self.expect_sig(j + 1, j, "declaration")?;

        loop {
            let tok = &self.toks[k];
            let after = if tok.kind == TokenKind::Ident {
                names.push(tok.text.clone());
                k + 1
            } else if tok.is_punct("{") || tok.is_punct("[") {
                let close = matching(&self.toks, k).ok_or_else(|| self.error(k, "Unclosed binding pattern"))?;
                pattern_names(&self.toks[k + 1..close], &mut names);
                close + 1
            } else {
                return Err(self.error(k, format!("Unexpected '{}' in declaration", tok.text)));
            };

            let Some(next) = self.sig(after) else {
                return Ok(names);
            };
            let next = if self.toks[next].is_punct("=") {
                match self.initializer_end(next + 1) {
                    Some(n) => n,
                    None => return Ok(names),
                }
            } else {
                next
            };
            if !self.toks[next].is_punct(",") {
                return Ok(names);
            }
            k = self.expect_sig(next + 1, next, "declaration")?;
        }
    }

    /// 初始化表达式之后的 token（`,` `;` 或下一条语句）；到达末尾返回 None
    fn initializer_end(&self, from: usize) -> Option<usize> {
        let mut j = from;
        let mut prev: Option<usize> = None;
        while j < self.toks.len() {
            let tok = &self.toks[j];
            if tok.is_trivia() {
                j += 1;
                continue;
            }
            if tok.is_punct(",") || tok.is_punct(";") {
                return Some(j);
            }
            if let Some(p) = prev {
                let newline = self.toks[p + 1..j].iter().any(|t| t.has_newline());
                let starts_statement = matches!(tok.kind, TokenKind::Ident | TokenKind::Str | TokenKind::Number)
                    && !matches!(tok.text.as_str(), "instanceof" | "in");
                if newline && starts_statement && self.toks[p].ends_expression() {
                    return Some(j);
                }
            }
            if tok.is_punct("(") || tok.is_punct("[") || tok.is_punct("{") {
                let close = matching(&self.toks, j)?;
                prev = Some(close);
                j = close + 1;
                continue;
            }
            prev = Some(j);
            j += 1;
        }
        None
    }
}

/// 解构模式里真正引入绑定的标识符
fn pattern_names(tokens: &[Token], names: &mut Vec<String>) {
    let sig: Vec<&Token> = tokens.iter().filter(|t| !t.is_trivia()).collect();
    for (idx, tok) in sig.iter().enumerate() {
        if tok.kind != TokenKind::Ident {
            continue;
        }
        let next = sig.get(idx + 1);
        let prev = if idx > 0 { sig.get(idx - 1) } else { None };
        let ends_binding = next
            .map(|n| n.is_punct(",") || n.is_punct("}") || n.is_punct("]") || n.is_punct("="))
            .unwrap_or(true);
        let is_default_value = prev.map(|p| p.is_punct("=")).unwrap_or(false);
        if ends_binding && !is_default_value {
            names.push(tok.text.clone());
        }
    }
}

fn collect_dynamic_imports(tokens: &[Token], out: &mut Vec<String>) {
    for (i, tok) in tokens.iter().enumerate() {
        match &tok.kind {
            TokenKind::Ident if tok.text == "import" => {
                let open = next_sig(tokens, i + 1).filter(|&j| tokens[j].is_punct("("));
                let arg = open.and_then(|j| next_sig(tokens, j + 1));
                let close = arg.and_then(|a| next_sig(tokens, a + 1));
                if let (Some(a), Some(c)) = (arg, close) {
                    if tokens[a].kind == TokenKind::Str && tokens[c].is_punct(")") {
                        out.push(unquote(&tokens[a].text));
                    }
                }
            }
            TokenKind::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Expr(expr) = part {
                        collect_dynamic_imports(expr, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn unquote(text: &str) -> String {
    let quoted = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"')) || (text.starts_with('\'') && text.ends_with('\'')));
    if quoted {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::super::emit::emit;
    use super::super::lexer::Lexer;
    use super::*;

    fn lower_src(src: &str) -> Lowered {
        lower(Lexer::new(src, "a.js").tokenize().unwrap(), "a.js").unwrap()
    }

    #[test]
    fn test_default_and_named_imports() {
        let lowered = lower_src("import React, { useState as useS } from 'react';");
        let code = emit(&lowered.tokens);
        assert!(code.contains("var __import0 = require(\"react\");"));
        assert!(code.contains("var React = __import0 && __import0.__esModule ? __import0[\"default\"] : __import0;"));
        assert!(code.contains("var useS = __import0[\"useState\"];"));
        assert_eq!(lowered.info.imports, vec!["react"]);
    }

    #[test]
    fn test_side_effect_and_namespace_imports() {
        let lowered = lower_src("import './styles.css';\nimport * as Icons from 'lucide-react';");
        let code = emit(&lowered.tokens);
        assert!(code.contains("require(\"./styles.css\");"));
        assert!(code.contains("var Icons = __import0;"));
        assert_eq!(lowered.info.imports, vec!["./styles.css", "lucide-react"]);
    }

    #[test]
    fn test_export_forms() {
        let lowered = lower_src(
            "export const a = {}, { b } = { b: 2 };\nexport function f() {}\nexport default function App() {}",
        );
        assert_eq!(lowered.info.exports, vec!["a", "b", "f", "default"]);
        assert!(lowered.info.has_default_export);
        assert!(lowered.prologue.contains("exports.f = f;"));
        assert!(lowered.prologue.contains("exports[\"default\"] = App;"));
        assert!(lowered.epilogue.contains("exports[\"a\"] = a;"));
    }

    #[test]
    fn test_anonymous_default_gets_terminated() {
        let lowered = lower_src("export default function () { return 1 }\nfoo()");
        let code = emit(&lowered.tokens);
        assert!(code.starts_with("exports[\"default\"] = function () { return 1 };"));
    }

    #[test]
    fn test_reexport_and_dynamic() {
        let lowered = lower_src("export { default as Button } from './Button';\nconst L = import('./Lazy');");
        assert_eq!(lowered.info.imports, vec!["./Button"]);
        assert_eq!(lowered.info.dynamic_imports, vec!["./Lazy"]);
        assert!(lowered.info.has_default_export == false);
        assert!(emit(&lowered.tokens).contains("get: function () { return __import0[\"default\"]; }"));
    }

    #[test]
    fn test_missing_from_is_an_error() {
        let err = lower(Lexer::new("import { a } 'x';", "m.js").tokenize().unwrap(), "m.js").unwrap_err();
        assert!(matches!(err, PreviewError::Transform { line: 1, .. }));
    }
}
