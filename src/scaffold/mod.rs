//! 预览脚手架
//!
//! 把编译结果（或编译错误）包装成可执行的片段序列。浏览器目标输出一份
//! 自包含的 HTML（iframe srcdoc），无头目标只取其中的经典脚本交给沙箱执行。

pub mod fragments;

use crate::config::PreviewConfig;
use crate::error::Result;
use crate::externals::{BindingTable, IMPORT_MAP};
use crate::fault::{Diagnostic, FailureKind};
use crate::registry::CompiledProject;
use serde_json::{json, Value};

/// 目标宿主
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Browser,
    Headless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// 内联经典脚本
    Script,
    /// 内联 ES 模块脚本
    ModuleScript,
    ImportMap,
    Style,
    StyleSheetLink,
    /// 外部脚本（样式 CDN）
    ScriptLink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub name: &'static str,
    pub kind: FragmentKind,
    pub source: String,
}

impl Fragment {
    fn new(name: &'static str, kind: FragmentKind, source: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            source: source.into(),
        }
    }

    fn in_head(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::ImportMap
                | FragmentKind::Style
                | FragmentKind::StyleSheetLink
                | FragmentKind::ScriptLink
        )
    }

    fn render(&self) -> String {
        match self.kind {
            FragmentKind::Script => format!("<script data-fragment=\"{}\">{}</script>", self.name, self.source),
            FragmentKind::ModuleScript => {
                format!("<script type=\"module\" data-fragment=\"{}\">{}</script>", self.name, self.source)
            }
            FragmentKind::ImportMap => format!("<script type=\"importmap\">{}</script>", self.source),
            FragmentKind::Style => format!("<style>{}</style>", self.source),
            FragmentKind::StyleSheetLink => {
                format!("<link rel=\"stylesheet\" href=\"{}\" />", escape_html(&self.source))
            }
            FragmentKind::ScriptLink => format!("<script src=\"{}\"></script>", escape_html(&self.source)),
        }
    }
}

/// 嵌入 `<script>` 的 JSON：`</` 写成 `<\/`，`<!--` 写成 `\u003c!--`，字符串内容不变
pub fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "\\u003c!--")
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 构建好的脚手架
#[derive(Debug, Clone)]
pub struct Scaffold {
    pub target: Target,
    pub title: String,
    fragments: Vec<Fragment>,
}

impl Scaffold {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.name == name)
    }

    /// 按顺序返回内联经典脚本，供无头沙箱逐个求值
    pub fn scripts(&self) -> Vec<(&'static str, &str)> {
        self.fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Script)
            .map(|f| (f.name, f.source.as_str()))
            .collect()
    }

    /// 完整的 HTML 文档
    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\" />\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        for fragment in self.fragments.iter().filter(|f| f.in_head()) {
            html.push_str(&fragment.render());
            html.push('\n');
        }
        html.push_str("</head>\n<body>\n<div id=\"root\"></div>\n");
        for fragment in self.fragments.iter().filter(|f| !f.in_head()) {
            html.push_str(&fragment.render());
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

pub struct ScaffoldBuilder<'a> {
    config: &'a PreviewConfig,
    target: Target,
    bindings: BindingTable,
    compiled: Option<&'a CompiledProject>,
    compile_error: Option<Diagnostic>,
}

impl<'a> ScaffoldBuilder<'a> {
    pub fn new(config: &'a PreviewConfig, target: Target) -> Self {
        Self {
            config,
            target,
            bindings: BindingTable::standard(),
            compiled: None,
            compile_error: None,
        }
    }

    pub fn bindings(mut self, bindings: BindingTable) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn compiled(mut self, compiled: &'a CompiledProject) -> Self {
        self.compiled = Some(compiled);
        self.compile_error = None;
        self
    }

    pub fn compile_error(mut self, diagnostic: Diagnostic) -> Self {
        self.compile_error = Some(diagnostic);
        self.compiled = None;
        self
    }

    /// 编译失败时脚手架只负责展示诊断
    pub fn result(self, result: &'a Result<CompiledProject>) -> Self {
        match result {
            Ok(compiled) => self.compiled(compiled),
            Err(err) => self.compile_error(Diagnostic::from_error(err)),
        }
    }

    fn payload(&self) -> Value {
        let readiness = &self.config.readiness;
        let mut payload = json!({
            "entry": self.config.entry_specifier(),
            "entryKey": Value::Null,
            "modules": [],
            "links": {},
            "required": self.bindings.required(),
            "readiness": {
                "intervalMs": readiness.interval_ms,
                "maxAttempts": readiness.max_attempts,
                "backoff": readiness.backoff,
                "maxIntervalMs": readiness.max_interval_ms,
            },
            "compileError": Value::Null,
            "fingerprint": Value::Null,
        });

        if let Some(compiled) = self.compiled {
            payload["entryKey"] = Value::from(compiled.entry_key.as_str());
            payload["modules"] = json!(compiled.modules);
            payload["links"] = json!(compiled.links);
            payload["fingerprint"] = Value::from(format!("{:016x}", compiled.fingerprint));
        } else {
            let diagnostic = self.compile_error.clone().unwrap_or_else(|| {
                Diagnostic::new(FailureKind::Runtime, "Nothing has been compiled yet")
            });
            payload["compileError"] = json!({
                "kind": diagnostic.kind.code(),
                "message": diagnostic.message,
            });
        }
        payload
    }

    pub fn build(self) -> Scaffold {
        let mut parts = Vec::new();

        if self.target == Target::Browser {
            parts.push(Fragment::new("styling", FragmentKind::ScriptLink, self.config.tailwind_url.as_str()));
            for url in &self.config.stylesheets {
                parts.push(Fragment::new("styling", FragmentKind::StyleSheetLink, url.as_str()));
            }
            parts.push(Fragment::new("base-style", FragmentKind::Style, fragments::BASE_CSS));
            parts.push(Fragment::new(
                "binding-map",
                FragmentKind::ImportMap,
                escape_script(&IMPORT_MAP.to_string()),
            ));
            parts.push(Fragment::new("binding-table", FragmentKind::Script, fragments::BINDINGS_INIT));
        }

        parts.push(Fragment::new("fault-boundary", FragmentKind::Script, fragments::FAULT));
        parts.push(Fragment::new("registry", FragmentKind::Script, fragments::REGISTRY));
        match self.target {
            Target::Browser => parts.push(Fragment::new("static-host", FragmentKind::Script, fragments::STATIC_HOST)),
            Target::Headless => parts.push(Fragment::new("native-host", FragmentKind::Script, fragments::NATIVE_HOST)),
        }

        let payload = format!(
            "window.__preview.titles = {};\nwindow.__preview.payload = {};\n",
            escape_script(&FailureKind::title_table().to_string()),
            escape_script(&self.payload().to_string()),
        );
        parts.push(Fragment::new("payload", FragmentKind::Script, payload));
        parts.push(Fragment::new("bootstrap", FragmentKind::Script, fragments::BOOTSTRAP));

        if self.target == Target::Browser {
            let loader = fragments::BINDINGS_LOADER.replace(
                "__SOURCES__",
                &escape_script(&self.bindings.source_table().to_string()),
            );
            parts.push(Fragment::new("bindings", FragmentKind::ModuleScript, loader));
        }

        tracing::debug!(kind = ?self.target, fragments = parts.len(), "built scaffold");

        Scaffold {
            target: self.target,
            title: self.config.title.clone(),
            fragments: parts,
        }
    }
}
