//! 词法分析
//!
//! 输入是已擦除类型的 JavaScript。区分正则与除法；模板中的表达式递归切分成子 token 列表。

use crate::error::{PreviewError, Result};

/// token 类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident,
    Punct,
    Str,
    Number,
    Regex,
    Template(Vec<TemplatePart>),
    /// 降级过程中生成的代码，原样输出
    Synthetic,
    Whitespace,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Raw(String),
    Expr(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn synthetic(text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind: TokenKind::Synthetic,
            text: text.into(),
            line,
            column,
        }
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Ident && !is_reserved(&self.text)
    }

    pub fn has_newline(&self) -> bool {
        self.is_trivia() && self.text.contains('\n')
    }

    /// 能结束一个表达式的 token（其后的 `/` 是除法）
    pub fn ends_expression(&self) -> bool {
        match &self.kind {
            TokenKind::Ident => !is_expression_keyword(&self.text),
            TokenKind::Punct => matches!(self.text.as_str(), ")" | "]" | "}" | "++" | "--"),
            TokenKind::Str
            | TokenKind::Number
            | TokenKind::Regex
            | TokenKind::Template(_) => true,
            _ => false,
        }
    }
}

/// 之后可以直接跟表达式的关键字
pub fn is_expression_keyword(word: &str) -> bool {
    matches!(
        word,
        "return" | "typeof" | "instanceof" | "in" | "of" | "new" | "delete" | "void" | "throw"
            | "case" | "do" | "else" | "yield" | "await" | "default" | "extends"
    )
}

pub fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "break" | "case" | "catch" | "class" | "const" | "continue" | "debugger" | "default"
            | "delete" | "do" | "else" | "export" | "extends" | "finally" | "for" | "function"
            | "if" | "import" | "in" | "instanceof" | "new" | "return" | "super" | "switch"
            | "this" | "throw" | "try" | "typeof" | "var" | "void" | "while" | "with" | "yield"
            | "let" | "await" | "null" | "true" | "false"
    )
}

const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "<<=", "&&=", "||=", "??=", "=>", "==", "!=", "<=", "+=", "-=",
    "*=", "%=", "&=", "|=", "^=", "&&", "||", "??", "?.", "++", "--", "**", "<<", ">>>=", ">>=",
    ">>>", ">>", ">=",
];

/// 词法分析器
pub struct Lexer<'a> {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    path: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, path: &'a str) -> Self {
        Self {
            input: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            path,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        self.tokens_until(None)
    }

    /// 切分 token 直到遇到与 `close` 匹配的括号（消耗它）或输入结束
    fn tokens_until(&mut self, close: Option<char>) -> Result<Vec<Token>> {
        let open_line = self.line;
        let open_column = self.column.saturating_sub(1).max(1);
        let mut tokens: Vec<Token> = Vec::new();
        let mut stack: Vec<(char, usize, usize)> = Vec::new();

        loop {
            if self.at_end() {
                if let Some((c, line, column)) = stack.last() {
                    return Err(self.error_at(*line, *column, format!("Unclosed '{}'", c)));
                }
                if let Some(c) = close {
                    let open = opening_of(c);
                    return Err(self.error_at(open_line, open_column, format!("Unclosed '{}'", open)));
                }
                return Ok(tokens);
            }

            let c = self.current_char();
            let line = self.line;
            let column = self.column;

            if c.is_whitespace() {
                let text = self.take_while(|ch| ch.is_whitespace());
                tokens.push(self.token(TokenKind::Whitespace, text, line, column));
                continue;
            }

            if self.starts_with("//") {
                let text = self.take_while(|ch| ch != '\n');
                tokens.push(self.token(TokenKind::Comment, text, line, column));
                continue;
            }

            if self.starts_with("/*") {
                let text = self.block_comment()?;
                tokens.push(self.token(TokenKind::Comment, text, line, column));
                continue;
            }

            let prev = last_significant(&tokens);
            let expr_allowed = prev.map(|t| !t.ends_expression()).unwrap_or(true);

            match c {
                '(' | '[' | '{' => {
                    self.advance();
                    stack.push((c, line, column));
                    tokens.push(self.token(TokenKind::Punct, c.to_string(), line, column));
                }
                ')' | ']' | '}' => {
                    match stack.pop() {
                        Some((open, _, _)) if open == opening_of(c) => {
                            self.advance();
                            tokens.push(self.token(TokenKind::Punct, c.to_string(), line, column));
                        }
                        Some((open, _, _)) => {
                            return Err(self.error_at(
                                line,
                                column,
                                format!("Unexpected '{}', expected closing for '{}'", c, open),
                            ));
                        }
                        None if close == Some(c) => {
                            self.advance();
                            return Ok(tokens);
                        }
                        None => {
                            return Err(self.error_at(line, column, format!("Unexpected '{}'", c)));
                        }
                    }
                }
                '"' | '\'' => {
                    let text = self.string_literal(c)?;
                    tokens.push(self.token(TokenKind::Str, text, line, column));
                }
                '`' => {
                    let parts = self.template_literal()?;
                    tokens.push(self.token(TokenKind::Template(parts), String::new(), line, column));
                }
                '/' if expr_allowed => {
                    let text = self.regex_literal()?;
                    tokens.push(self.token(TokenKind::Regex, text, line, column));
                }
                _ if c.is_ascii_digit() || (c == '.' && self.peek_char(1).is_ascii_digit()) => {
                    let text = self.number_literal();
                    tokens.push(self.token(TokenKind::Number, text, line, column));
                }
                _ if is_ident_start(c) || (c == '#' && is_ident_start(self.peek_char(1))) => {
                    let mut text = String::new();
                    if c == '#' {
                        text.push('#');
                        self.advance();
                    }
                    text.push_str(&self.take_while(is_ident_part));
                    tokens.push(self.token(TokenKind::Ident, text, line, column));
                }
                _ => {
                    let text = self.punctuator();
                    tokens.push(self.token(TokenKind::Punct, text, line, column));
                }
            }
        }
    }

    fn token(&self, kind: TokenKind, text: String, line: usize, column: usize) -> Token {
        Token { kind, text, line, column }
    }

    fn error_at(&self, line: usize, column: usize, message: impl Into<String>) -> PreviewError {
        PreviewError::transform(self.path, line, column, message)
    }

    fn punctuator(&mut self) -> String {
        for p in PUNCTUATORS {
            if self.starts_with(p) {
                // `a?.5:1` 是三元表达式
                if *p == "?." && self.peek_char(2).is_ascii_digit() {
                    continue;
                }
                for _ in 0..p.chars().count() {
                    self.advance();
                }
                return p.to_string();
            }
        }
        let c = self.current_char();
        self.advance();
        // 单独的 '/' 后面跟 '=' 是除法赋值
        if c == '/' && self.current_char() == '=' {
            self.advance();
            return "/=".to_string();
        }
        c.to_string()
    }

    fn block_comment(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        text.push_str("/*");
        self.advance();
        self.advance();
        while !self.at_end() {
            if self.starts_with("*/") {
                self.advance();
                self.advance();
                text.push_str("*/");
                return Ok(text);
            }
            text.push(self.current_char());
            self.advance();
        }
        Err(self.error_at(line, column, "Unterminated comment"))
    }

    fn string_literal(&mut self, quote: char) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        text.push(quote);
        self.advance();
        loop {
            if self.at_end() {
                return Err(self.error_at(line, column, "Unterminated string literal"));
            }
            let c = self.current_char();
            if c == '\\' {
                text.push(c);
                self.advance();
                if !self.at_end() {
                    text.push(self.current_char());
                    self.advance();
                }
                continue;
            }
            if c == '\n' {
                return Err(self.error_at(line, column, "Unterminated string literal"));
            }
            text.push(c);
            self.advance();
            if c == quote {
                return Ok(text);
            }
        }
    }

    fn template_literal(&mut self) -> Result<Vec<TemplatePart>> {
        let (line, column) = (self.line, self.column);
        self.advance();
        let mut parts = Vec::new();
        let mut raw = String::new();
        loop {
            if self.at_end() {
                return Err(self.error_at(line, column, "Unterminated template literal"));
            }
            let c = self.current_char();
            if c == '\\' {
                raw.push(c);
                self.advance();
                if !self.at_end() {
                    raw.push(self.current_char());
                    self.advance();
                }
                continue;
            }
            if c == '`' {
                self.advance();
                parts.push(TemplatePart::Raw(raw));
                return Ok(parts);
            }
            if self.starts_with("${") {
                self.advance();
                self.advance();
                parts.push(TemplatePart::Raw(std::mem::take(&mut raw)));
                let expr = self.tokens_until(Some('}'))?;
                parts.push(TemplatePart::Expr(expr));
                continue;
            }
            raw.push(c);
            self.advance();
        }
    }

    fn regex_literal(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let mut text = String::from("/");
        self.advance();
        let mut in_class = false;
        loop {
            if self.at_end() || self.current_char() == '\n' {
                return Err(self.error_at(line, column, "Unterminated regular expression"));
            }
            let c = self.current_char();
            text.push(c);
            self.advance();
            match c {
                '\\' => {
                    if !self.at_end() {
                        text.push(self.current_char());
                        self.advance();
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        text.push_str(&self.take_while(is_ident_part));
        Ok(text)
    }

    fn number_literal(&mut self) -> String {
        let mut text = String::new();
        let hex = self.starts_with("0x") || self.starts_with("0X");
        while !self.at_end() {
            let c = self.current_char();
            let exponent_sign = (c == '+' || c == '-')
                && !hex
                && matches!(text.chars().last(), Some('e') | Some('E'));
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                // `1..toString()` 之类的第二个点不属于数字
                if c == '.' && text.contains('.') {
                    break;
                }
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn current_char(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn peek_char(&self, offset: usize) -> char {
        self.input.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        for (i, c) in s.chars().enumerate() {
            if self.pos + i >= self.input.len() || self.input[self.pos + i] != c {
                return false;
            }
        }
        true
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while !self.at_end() && pred(self.current_char()) {
            text.push(self.current_char());
            self.advance();
        }
        text
    }
}

fn opening_of(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

pub fn last_significant(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().rev().find(|t| !t.is_trivia())
}

/// 下一个非空白 token 的下标
pub fn next_sig(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_trivia())
}

/// 括号 token 的匹配下标（同一层列表内）
pub fn matching(tokens: &[Token], open: usize) -> Option<usize> {
    let (o, c) = match tokens.get(open)?.text.as_str() {
        "(" => ("(", ")"),
        "[" => ("[", "]"),
        "{" => ("{", "}"),
        _ => return None,
    };
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.kind != TokenKind::Punct {
            continue;
        }
        if tok.text == o {
            depth += 1;
        } else if tok.text == c {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<String> {
        Lexer::new(src, "t.js")
            .tokenize()
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| match t.kind {
                TokenKind::Regex => format!("re:{}", t.text),
                _ => t.text,
            })
            .collect()
    }

    #[test]
    fn test_regex_vs_division() {
        assert_eq!(kinds("a / b"), vec!["a", "/", "b"]);
        assert_eq!(kinds("x = /ab+c/g"), vec!["x", "=", "re:/ab+c/g"]);
    }

    #[test]
    fn test_regex_after_keyword() {
        assert_eq!(kinds("return /x/.test(s)"), vec!["return", "re:/x/", ".", "test", "(", "s", ")"]);
    }

    #[test]
    fn test_shift_and_comparison() {
        assert_eq!(kinds("a >>> 1 >= b"), vec!["a", ">>>", "1", ">=", "b"]);
    }

    #[test]
    fn test_unbalanced_bracket() {
        let err = Lexer::new("foo(1, 2", "x.js").tokenize().unwrap_err();
        assert!(err.to_string().contains("Unclosed '('"));
    }
}
