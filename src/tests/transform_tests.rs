//! 转换器测试
//! 转换结果直接放进 QuickJS 执行，检查降级后的语义

use crate::sandbox::runtime::JsRuntime;
use crate::transform::{jsx_enabled, transform};
use crate::PreviewError;

/// 用最小的 React 桩执行模块，返回 `probe` 表达式的 JSON
fn run_module(path: &str, source: &str, probe: &str) -> String {
    let out = transform(path, source).unwrap();
    let harness = format!(
        r#"(function () {{
  var React = {{
    Fragment: 'Fragment',
    createElement: function (type, props) {{
      var children = Array.prototype.slice.call(arguments, 2);
      return {{ type: typeof type === 'string' ? type : (type.displayName || type.name || 'anonymous'), props: props, children: children }};
    }},
    useState: function (v) {{ return [v, function () {{}}]; }}
  }};
  var deps = {{ react: React, './util': {{ double: function (n) {{ return n * 2; }}, __esModule: true }} }};
  var module = {{ exports: {{}} }};
  new Function('exports', 'require', 'module', 'React', {code})(module.exports, function (s) {{ return deps[s]; }}, module, React);
  var exports = module.exports;
  return JSON.stringify({probe});
}})()"#,
        code = serde_json::Value::from(out.code),
        probe = probe
    );
    JsRuntime::new().unwrap().eval(&harness).unwrap()
}

#[test]
fn test_tsx_component_executes() {
    let source = r#"
import React, { useState } from 'react';

interface CardProps {
  title: string;
  count?: number;
}

export default function Card({ title, count = 1 }: CardProps) {
  const [open] = useState<boolean>(false);
  return (
    <section className="card" data-open={open}>
      <h2>{title}</h2>
      {count > 0 && <span>{count as number}</span>}
    </section>
  );
}
"#;
    let json = run_module("components/Card.tsx", source, "exports['default']({ title: 'Hi', count: 2 })");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "section");
    assert_eq!(value["props"]["className"], "card");
    assert_eq!(value["props"]["data-open"], false);
    assert_eq!(value["children"][0]["children"][0], "Hi");
    assert_eq!(value["children"][1]["children"][0], 2);
}

#[test]
fn test_named_exports_and_imports() {
    let source = r#"
import { double } from './util';
export const LIMIT: number = 3;
export function triple(n: number): number { return n * 3; }
export const both = (n: number) => double(n) + triple(n);
"#;
    let json = run_module("lib/math.ts", source, "[exports.LIMIT, exports.triple(2), exports.both(1)]");
    assert_eq!(json, "[3,6,5]");

    let out = transform("lib/math.ts", source).unwrap();
    assert_eq!(out.imports, vec!["./util"]);
    assert!(out.exports.contains(&"LIMIT".to_string()));
    assert!(out.is_esm);
    assert!(!out.has_default_export);
}

#[test]
fn test_ts_generics_and_comparisons() {
    let source = r#"
function first<T>(items: T[]): T | undefined { return items[0]; }
const small = (a: number, b: number): boolean => a < b && b > 0;
export default { first, small };
"#;
    let json = run_module("lib/generic.ts", source, "[exports['default'].small(1, 2), exports['default'].small(3, 2)]");
    assert_eq!(json, "[true,false]");

    let json = run_module("lib/generic.ts", source, "exports['default'].first([7, 8])");
    assert_eq!(json, "7");
}

#[test]
fn test_enum_and_class_members() {
    let source = r#"
enum Status { Idle, Busy = 4, Done }
class Counter {
  private count: number = 0;
  readonly label!: string;
  bump = (): number => ++this.count;
}
const c = new Counter();
c.bump();
export const result = [Status.Busy, Status[5], c.bump()];
"#;
    let json = run_module("lib/status.ts", source, "exports.result");
    assert_eq!(json, "[4,\"Done\",2]");
}

#[test]
fn test_parameter_properties_are_assigned() {
    let source = r#"
class Base {
  constructor(public kind: string) {}
}
class Person extends Base {
  constructor(public readonly name: string, private age?: number) {
    super('person');
  }
  get years(): number { return this.age ?? 0; }
}
export const p = new Person('zed', 3);
"#;
    let json = run_module("lib/person.ts", source, "[exports.p.name, exports.p.kind, exports.p.years]");
    assert_eq!(json, "[\"zed\",\"person\",3]");
}

#[test]
fn test_abstract_class_and_annotated_arrow_in_ternary() {
    let source = r#"
abstract class Shape {
  abstract area(): number;
  describe(): string { return 'area ' + this.area(); }
}
class Square extends Shape {
  constructor(private side: number) { super(); }
  area(): number { return this.side * this.side; }
}
const ok = true;
const f = ok ? (x: number) => x * 3 : null;
export default function App() {
  return <p>{new Square(2).describe()} {f!(2)}</p>;
}
"#;
    let json = run_module("App.tsx", source, "exports['default']()");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "p");
    assert_eq!(value["children"][0], "area 4");
    assert_eq!(value["children"][2], 6);
}

#[test]
fn test_fragment_and_spread() {
    let source = r#"
const Item = (props: { label: string }) => <li {...props}>{props.label}</li>;
export default function List() {
  return <><Item label="a" /><Item label="b" /></>;
}
"#;
    let json = run_module("List.tsx", source, "exports['default']()");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["type"], "Fragment");
    assert_eq!(value["children"].as_array().unwrap().len(), 2);
    assert_eq!(value["children"][1]["props"]["label"], "b");
}

#[test]
fn test_type_only_imports_are_not_dependencies() {
    let out = transform(
        "App.tsx",
        "import type { Props } from './types';\nimport { type A, b } from './b';\nexport default function App(p: Props): A { return b(p); }",
    )
    .unwrap();
    assert_eq!(out.imports, vec!["./b"]);
    assert!(out.has_default_export);
}

#[test]
fn test_export_star_is_an_import() {
    let out = transform("components/index.ts", "export * from './Button';\nexport { Card } from './Card';").unwrap();
    assert_eq!(out.imports, vec!["./Button", "./Card"]);
}

#[test]
fn test_commonjs_module_is_not_esm() {
    let out = transform("legacy.js", "module.exports = function () { return 1; };").unwrap();
    assert!(!out.is_esm);
    assert!(out.imports.is_empty());
}

#[test]
fn test_mismatched_tag_reports_location() {
    let err = transform("App.tsx", "export default function App() {\n  return <div><span>hi</div>;\n}").unwrap_err();
    match &err {
        PreviewError::Transform { path, line, .. } => {
            assert_eq!(path, "App.tsx");
            assert_eq!(*line, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().starts_with("App.tsx:2:"));
}

#[test]
fn test_unterminated_string_is_a_transform_error() {
    let err = transform("a.ts", "const s = 'oops;\n").unwrap_err();
    assert!(matches!(err, PreviewError::Transform { .. }));
}

#[test]
fn test_jsx_enabled_by_extension() {
    assert!(jsx_enabled("App.tsx"));
    assert!(jsx_enabled("App.jsx"));
    assert!(jsx_enabled("App.js"));
    assert!(!jsx_enabled("util.ts"));
}
