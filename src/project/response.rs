//! 生成结果解析
//!
//! 结构化格式：`<file name="...">内容</file>` 与 `<delete name="..." />`；
//! 没有任何结构化标签时才回退到旧的 ```tsx 代码块格式。

use super::File;

/// 一次生成带来的变更
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub files: Vec<File>,
    pub deletions: Vec<String>,
    pub explanation: String,
    /// 是否来自旧的代码块格式
    pub legacy: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletions.is_empty()
    }
}

pub fn parse_response(text: &str) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut explanation = String::new();
    let mut rest = text;

    loop {
        let next_file = rest.find("<file ");
        let next_delete = rest.find("<delete ");
        let start = match (next_file, next_delete) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => break,
        };

        explanation.push_str(&rest[..start]);
        let tail = &rest[start..];

        if tail.starts_with("<file ") {
            match parse_file_tag(tail) {
                Some((file, consumed)) => {
                    changes.files.push(file);
                    rest = &tail[consumed..];
                }
                None => {
                    // 不完整的标签按普通文本保留
                    explanation.push_str("<file ");
                    rest = &tail["<file ".len()..];
                }
            }
        } else {
            match parse_delete_tag(tail) {
                Some((path, consumed)) => {
                    changes.deletions.push(path);
                    rest = &tail[consumed..];
                }
                None => {
                    explanation.push_str("<delete ");
                    rest = &tail["<delete ".len()..];
                }
            }
        }
    }
    explanation.push_str(rest);

    if changes.is_empty() {
        if let Some(code) = first_fenced_block(&explanation, "tsx") {
            tracing::warn!("response has no <file> tags, falling back to fenced code block");
            changes.files.push(File::new("App.tsx", code.trim()));
            changes.legacy = true;
        }
    }

    changes.explanation = strip_fenced_blocks(&explanation, "tsx").trim().to_string();
    changes
}

/// 返回 (文件, 消耗的字节数)
fn parse_file_tag(tail: &str) -> Option<(File, usize)> {
    let open_end = tail.find('>')?;
    let name = attribute(&tail[..open_end], "name").or_else(|| attribute(&tail[..open_end], "path"))?;
    let body_start = open_end + 1;
    let close = tail[body_start..].find("</file>")?;
    let content = tail[body_start..body_start + close].trim();
    let file = File::new(name.trim(), content);
    Some((file, body_start + close + "</file>".len()))
}

fn parse_delete_tag(tail: &str) -> Option<(String, usize)> {
    let end = tail.find("/>")?;
    let name = attribute(&tail[..end], "name").or_else(|| attribute(&tail[..end], "path"))?;
    Some((super::normalize_path(name.trim()), end + 2))
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

fn first_fenced_block<'a>(text: &'a str, lang: &str) -> Option<&'a str> {
    let fence = format!("```{}", lang);
    let start = text.find(&fence)? + fence.len();
    let len = text[start..].find("```")?;
    let code = &text[start..start + len];
    if code.trim().is_empty() {
        None
    } else {
        Some(code)
    }
}

fn strip_fenced_blocks(text: &str, lang: &str) -> String {
    let fence = format!("```{}", lang);
    let mut out = String::new();
    let mut rest = text;
    while let Some(start) = rest.find(&fence) {
        let after = start + fence.len();
        match rest[after..].find("```") {
            Some(len) => {
                out.push_str(&rest[..start]);
                rest = &rest[after + len + 3..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
