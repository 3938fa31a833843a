//! 生成结果解析与快照操作测试

use super::project;
use crate::project::{parse_response, File, Project};

#[test]
fn test_file_and_delete_tags() {
    let text = r#"I added a card component.

<file name="components/Card.tsx">
export function Card() { return <div />; }
</file>
<delete name="./components/Old.tsx" />

Done."#;
    let changes = parse_response(text);
    assert!(!changes.legacy);
    assert_eq!(changes.files.len(), 1);
    assert_eq!(changes.files[0].path, "components/Card.tsx");
    assert!(changes.files[0].content.starts_with("export function Card()"));
    assert_eq!(changes.deletions, vec!["components/Old.tsx"]);
    assert!(changes.explanation.starts_with("I added a card component."));
    assert!(changes.explanation.ends_with("Done."));
    assert!(!changes.explanation.contains("<file"));
}

#[test]
fn test_legacy_code_block() {
    let text = "Here you go:\n```tsx\nexport default function App() { return <p>hi</p>; }\n```\nEnjoy";
    let changes = parse_response(text);
    assert!(changes.legacy);
    assert_eq!(changes.files, vec![File::new("App.tsx", "export default function App() { return <p>hi</p>; }")]);
    assert!(!changes.explanation.contains("```"));
}

#[test]
fn test_structured_tags_win_over_code_blocks() {
    let text = "```tsx\nconst a = 1;\n```\n<file name=\"App.tsx\">export default () => null;</file>";
    let changes = parse_response(text);
    assert!(!changes.legacy);
    assert_eq!(changes.files.len(), 1);
    assert_eq!(changes.files[0].content, "export default () => null;");
}

#[test]
fn test_unterminated_tag_is_text() {
    let changes = parse_response("<file name=\"App.tsx\">no closing tag");
    assert!(changes.is_empty());
    assert!(changes.explanation.contains("no closing tag"));
}

#[test]
fn test_apply_changes() {
    let base = project(&[("App.tsx", "v1"), ("components/Old.tsx", "old")]);
    let changes = parse_response(
        "<file name=\"App.tsx\">v2</file><file name=\"components/New.tsx\">new</file><delete name=\"components/Old.tsx\" />",
    );
    let next = base.apply(&changes);
    assert_eq!(next.get("App.tsx").unwrap().content, "v2");
    assert!(next.get("components/New.tsx").is_some());
    assert!(next.get("components/Old.tsx").is_none());
    assert_ne!(next.fingerprint(), base.fingerprint());
    // 原快照不变
    assert_eq!(base.get("App.tsx").unwrap().content, "v1");
}

#[test]
fn test_fingerprint_is_content_sensitive() {
    let a = project(&[("App.tsx", "x")]);
    let b = project(&[("App.tsx", "x")]);
    let c = project(&[("App.tsx", "y")]);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn test_dir_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    Project::starter().write_to_dir(dir.path()).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
    std::fs::write(dir.path().join("node_modules/x/index.js"), "ignored").unwrap();

    let loaded = Project::from_dir(dir.path()).unwrap();
    assert_eq!(loaded.len(), Project::starter().len());
    assert!(loaded.get("App.tsx").is_some());
    assert!(loaded.get("components/ui/Button.tsx").is_some());
    assert!(loaded.get("node_modules/x/index.js").is_none());
}

#[test]
fn test_response_paths_cannot_leave_project_dir() {
    let base = tempfile::tempdir().unwrap();
    let dir = base.path().join("proj");
    std::fs::create_dir_all(&dir).unwrap();

    let changes = parse_response(
        "<file name=\"../escaped.txt\">pwned</file>\n<delete name=\"../../keep.txt\" />",
    );
    assert_eq!(changes.files[0].path, "escaped.txt");
    assert_eq!(changes.deletions, vec!["keep.txt"]);

    Project::new(changes.files.clone()).write_to_dir(&dir).unwrap();
    assert!(!base.path().join("escaped.txt").exists());
    assert_eq!(std::fs::read_to_string(dir.join("escaped.txt")).unwrap(), "pwned");
}
