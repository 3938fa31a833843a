//! 路径解析测试

use crate::externals::ExternalLib;
use crate::resolver::{join_relative, Resolved, Resolver, ROOT_IMPORTER};
use crate::PreviewError;

fn resolver(keys: &[&str]) -> Resolver {
    let exts: Vec<String> = [".tsx", ".ts", ".js", ".jsx"].iter().map(|s| s.to_string()).collect();
    Resolver::new(keys.iter().copied(), &exts)
}

#[test]
fn test_resolution_is_deterministic() {
    let r = resolver(&["App.tsx", "components/Card.tsx", "lib/utils.ts"]);
    let first = r.resolve("./components/Card", "App.tsx").unwrap();
    for _ in 0..10 {
        assert_eq!(r.resolve("./components/Card", "App.tsx").unwrap(), first);
    }
    assert_eq!(first, Resolved::Module("components/Card.tsx".to_string()));
}

#[test]
fn test_relative_addressing() {
    let r = resolver(&["a/d.tsx", "a/b/e.ts", "a/b/c.tsx"]);
    assert_eq!(r.resolve("../d", "a/b/c.tsx").unwrap(), Resolved::Module("a/d.tsx".to_string()));
    assert_eq!(r.resolve("./e", "a/b/c.tsx").unwrap(), Resolved::Module("a/b/e.ts".to_string()));
    assert_eq!(join_relative("a/b/c.tsx", "../d"), "a/d");
}

#[test]
fn test_extension_probe_order() {
    // 原样 > .tsx > .ts > .js > .jsx
    let r = resolver(&["util.ts", "util.tsx", "util.js"]);
    assert_eq!(r.resolve("./util", "App.tsx").unwrap(), Resolved::Module("util.tsx".to_string()));

    let exact = resolver(&["data.json.ts", "data.json"]);
    assert_eq!(exact.resolve("./data.json", "App.tsx").unwrap(), Resolved::Module("data.json".to_string()));
}

#[test]
fn test_index_fallback() {
    let r = resolver(&["components/index.ts", "components/Button.tsx"]);
    assert_eq!(
        r.resolve("./components", "App.tsx").unwrap(),
        Resolved::Module("components/index.ts".to_string())
    );
}

#[test]
fn test_non_relative_specifiers_are_project_rooted() {
    let r = resolver(&["components/ui/Button.tsx"]);
    assert_eq!(
        r.resolve("/components/ui/Button", "deep/nested/File.tsx").unwrap(),
        Resolved::Module("components/ui/Button.tsx".to_string())
    );
    assert_eq!(
        r.resolve("components/ui/Button", "App.tsx").unwrap(),
        Resolved::Module("components/ui/Button.tsx".to_string())
    );
}

#[test]
fn test_externals_win() {
    let r = resolver(&["react.tsx"]);
    assert_eq!(r.resolve("react", "App.tsx").unwrap(), Resolved::External(ExternalLib::React));
    assert_eq!(
        r.resolve("@headlessui/react", "App.tsx").unwrap(),
        Resolved::External(ExternalLib::HeadlessUi)
    );
}

#[test]
fn test_unresolved_names_specifier_and_importer() {
    let r = resolver(&["App.tsx"]);
    let err = r.resolve("./Missing", "App.tsx").unwrap_err();
    assert_eq!(err, PreviewError::unresolved("./Missing", "App.tsx"));
    let text = err.to_string();
    assert!(text.contains("./Missing"));
    assert!(text.contains("App.tsx"));

    // 不在固定集合中的包名
    assert!(r.resolve("lodash", "App.tsx").is_err());
}

#[test]
fn test_entry_from_root() {
    let r = resolver(&["App.tsx"]);
    assert_eq!(r.resolve("./App", ROOT_IMPORTER).unwrap(), Resolved::Module("App.tsx".to_string()));
}

#[test]
fn test_resolved_wire_format() {
    let module = serde_json::to_value(Resolved::Module("App.tsx".to_string())).unwrap();
    assert_eq!(module, serde_json::json!({ "module": "App.tsx" }));
    let external = serde_json::to_value(Resolved::External(ExternalLib::ReactDomClient)).unwrap();
    assert_eq!(external, serde_json::json!({ "external": "react-dom/client" }));
}
