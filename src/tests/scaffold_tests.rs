//! 脚手架测试

use super::project;
use crate::config::PreviewConfig;
use crate::externals::{BindingTable, ExternalLib};
use crate::registry::compile;
use crate::scaffold::{escape_html, escape_script, FragmentKind, Scaffold, ScaffoldBuilder, Target};
use serde_json::Value;

fn hello() -> crate::Project {
    project(&[("App.tsx", "export default function App() { return <main><h1 className=\"text-xl\">Hi</h1></main>; }")])
}

fn build(target: Target, config: &PreviewConfig, p: &crate::Project) -> Scaffold {
    let result = compile(p, config);
    ScaffoldBuilder::new(config, target).result(&result).build()
}

/// 从 payload 片段中取出注入的 JSON
fn payload(scaffold: &Scaffold) -> Value {
    let source = &scaffold.fragment("payload").unwrap().source;
    let line = source
        .lines()
        .find(|l| l.starts_with("window.__preview.payload = "))
        .unwrap();
    let json = line.trim_start_matches("window.__preview.payload = ").trim_end_matches(';');
    serde_json::from_str(json).unwrap()
}

fn names(scaffold: &Scaffold) -> Vec<&'static str> {
    scaffold.fragments().iter().map(|f| f.name).collect()
}

#[test]
fn test_browser_fragment_order() {
    let config = PreviewConfig::default();
    let scaffold = build(Target::Browser, &config, &hello());
    assert_eq!(
        names(&scaffold),
        vec![
            "styling",
            "base-style",
            "binding-map",
            "binding-table",
            "fault-boundary",
            "registry",
            "static-host",
            "payload",
            "bootstrap",
            "bindings",
        ]
    );
    assert_eq!(scaffold.fragment("bindings").unwrap().kind, FragmentKind::ModuleScript);
    assert_eq!(scaffold.fragment("binding-map").unwrap().kind, FragmentKind::ImportMap);
}

#[test]
fn test_headless_fragment_order() {
    let config = PreviewConfig::default();
    let scaffold = build(Target::Headless, &config, &hello());
    assert_eq!(
        names(&scaffold),
        vec!["fault-boundary", "registry", "native-host", "payload", "bootstrap"]
    );
    let scripts: Vec<&str> = scaffold.scripts().into_iter().map(|(name, _)| name).collect();
    assert_eq!(scripts, names(&scaffold));
}

#[test]
fn test_extra_stylesheets() {
    let config = PreviewConfig {
        stylesheets: vec!["https://example.com/a.css?x=1&y=2".to_string()],
        ..PreviewConfig::default()
    };
    let html = build(Target::Browser, &config, &hello()).to_html();
    assert!(html.contains("<link rel=\"stylesheet\" href=\"https://example.com/a.css?x=1&amp;y=2\" />"));
    assert!(html.contains(&format!("<script src=\"{}\"></script>", config.tailwind_url)));
}

#[test]
fn test_document_structure() {
    let config = PreviewConfig {
        title: "My <App>".to_string(),
        ..PreviewConfig::default()
    };
    let html = build(Target::Browser, &config, &hello()).to_html();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>My &lt;App&gt;</title>"));

    let head_end = html.find("</head>").unwrap();
    let import_map = html.find("<script type=\"importmap\">").unwrap();
    let module_script = html.find("<script type=\"module\"").unwrap();
    let root = html.find("<div id=\"root\"></div>").unwrap();
    assert!(import_map < head_end);
    assert!(import_map < module_script);
    assert!(root < module_script);
}

#[test]
fn test_script_breakout_is_escaped() {
    let p = project(&[(
        "App.tsx",
        "const s = '</script><script>alert(1)</script>';\nexport default function App() { return <p>{s}</p>; }",
    )]);
    let config = PreviewConfig::default();
    let scaffold = build(Target::Browser, &config, &p);
    let html = scaffold.to_html();
    let script_fragments = scaffold
        .fragments()
        .iter()
        .filter(|f| {
            matches!(
                f.kind,
                FragmentKind::Script | FragmentKind::ModuleScript | FragmentKind::ImportMap | FragmentKind::ScriptLink
            )
        })
        .count();
    assert_eq!(html.matches("</script>").count(), script_fragments);
    assert!(!html.contains("alert(1)</script>"));

    // 转义后模块源码保持原样
    let payload = payload(&scaffold);
    let source = payload["modules"][0]["source"].as_str().unwrap();
    assert!(source.contains("</script><script>alert(1)</script>"));
}

#[test]
fn test_payload_contents() {
    let config = PreviewConfig::from_json(r#"{"readiness": {"intervalMs": 75, "maxAttempts": 4, "backoff": 2.0}}"#).unwrap();
    let p = hello();
    let scaffold = build(Target::Headless, &config, &p);
    let payload = payload(&scaffold);
    assert_eq!(payload["entry"], "./App");
    assert_eq!(payload["entryKey"], "App.tsx");
    assert_eq!(payload["readiness"]["intervalMs"], 75);
    assert_eq!(payload["readiness"]["maxAttempts"], 4);
    assert_eq!(payload["readiness"]["backoff"], 2.0);
    assert_eq!(payload["links"]["<root>"]["./App"]["module"], "App.tsx");
    assert_eq!(payload["fingerprint"], format!("{:016x}", p.fingerprint()));
    assert!(payload["compileError"].is_null());
    assert_eq!(payload["required"].as_array().unwrap().len(), ExternalLib::ALL.len());
}

#[test]
fn test_compile_error_payload() {
    let p = project(&[("App.tsx", "export default function App() { return <div><span>hi</div>; }")]);
    let config = PreviewConfig::default();
    let scaffold = build(Target::Browser, &config, &p);
    let payload = payload(&scaffold);
    assert_eq!(payload["compileError"]["kind"], "transform");
    assert!(payload["compileError"]["message"].as_str().unwrap().contains("App.tsx"));
    assert!(payload["entryKey"].is_null());
    assert_eq!(payload["modules"].as_array().unwrap().len(), 0);
}

#[test]
fn test_bindings_loader_sources() {
    let config = PreviewConfig::default();
    let result = compile(&hello(), &config);
    let scaffold = ScaffoldBuilder::new(&config, Target::Browser)
        .bindings(BindingTable::standard())
        .result(&result)
        .build();
    let loader = &scaffold.fragment("bindings").unwrap().source;
    assert!(!loader.contains("__SOURCES__"));
    assert!(loader.contains(ExternalLib::Clsx.source_url()));
    assert!(loader.contains(ExternalLib::HeadlessUi.specifier()));
}

#[test]
fn test_escape_helpers() {
    assert_eq!(escape_script(r#"{"a":"</script>"}"#), r#"{"a":"<\/script>"}"#);
    assert_eq!(
        escape_script(r#"{"a":"<!--<script>"}"#),
        r#"{"a":"\u003c!--<script>"}"#
    );
    let escaped = escape_script(&serde_json::json!({ "code": "x = '<!-- <script></script>';" }).to_string());
    assert!(!escaped.contains("<!--") && !escaped.contains("</"));
    let back: serde_json::Value = serde_json::from_str(&escaped).unwrap();
    assert_eq!(back["code"], "x = '<!-- <script></script>';");
    assert_eq!(escape_html("a\"<b>&"), "a&quot;&lt;b&gt;&amp;");
}
