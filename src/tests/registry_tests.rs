//! 模块注册表与编译测试

use super::project;
use crate::config::PreviewConfig;
use crate::registry::{compile, Begin, ModuleExecutor, ModuleRegistry, ModuleState};
use crate::resolver::{Resolved, Resolver, ROOT_IMPORTER};
use crate::{FailureKind, PreviewError, Result};
use std::collections::BTreeMap;

/// 记录执行顺序的执行者
struct Recorder {
    graph: BTreeMap<&'static str, Vec<&'static str>>,
    log: Vec<String>,
    fail_on: Option<&'static str>,
}

impl ModuleExecutor for Recorder {
    fn execute(&mut self, key: &str, registry: &mut ModuleRegistry, resolver: &Resolver) -> Result<()> {
        self.log.push(key.to_string());
        if self.fail_on == Some(key) {
            return Err(PreviewError::Runtime(format!("{} threw", key)));
        }
        let deps = self.graph.get(key).cloned().unwrap_or_default();
        for dep in deps {
            registry.require(dep, key, resolver, self)?;
        }
        Ok(())
    }
}

fn resolver(keys: &[&str]) -> Resolver {
    Resolver::new(keys.iter().copied(), &PreviewConfig::default().extensions)
}

#[test]
fn test_begin_state_machine() {
    let mut registry = ModuleRegistry::new();
    assert_eq!(registry.begin("a.ts"), Begin::Execute);
    assert_eq!(registry.state("a.ts"), Some(ModuleState::Executing));
    assert_eq!(registry.begin("a.ts"), Begin::InFlight);
    registry.finish("a.ts");
    assert_eq!(registry.begin("a.ts"), Begin::Ready);
    assert_eq!(registry.executions("a.ts"), 1);
    assert_eq!(registry.order(), &["a.ts".to_string()]);

    assert_eq!(registry.begin("b.ts"), Begin::Execute);
    registry.fail("b.ts");
    assert_eq!(registry.begin("b.ts"), Begin::Failed);
    assert_eq!(Begin::Failed.code(), "failed");
    assert_eq!(Begin::InFlight.code(), "ready");
}

#[test]
fn test_shared_module_executes_once() {
    let r = resolver(&["App.tsx", "A.tsx", "B.tsx", "shared.ts"]);
    let mut exec = Recorder {
        graph: BTreeMap::from([
            ("App.tsx", vec!["./A", "./B"]),
            ("A.tsx", vec!["./shared"]),
            ("B.tsx", vec!["./shared"]),
        ]),
        log: Vec::new(),
        fail_on: None,
    };
    let mut registry = ModuleRegistry::new();
    registry.require("./App", ROOT_IMPORTER, &r, &mut exec).unwrap();
    assert_eq!(registry.executions("shared.ts"), 1);
    assert_eq!(exec.log, vec!["App.tsx", "A.tsx", "shared.ts", "B.tsx"]);
    // 依赖先于依赖者完成
    assert_eq!(registry.order(), &["shared.ts", "A.tsx", "B.tsx", "App.tsx"]);
}

#[test]
fn test_cycle_terminates() {
    let r = resolver(&["App.tsx", "components/A.tsx"]);
    let mut exec = Recorder {
        graph: BTreeMap::from([("App.tsx", vec!["./components/A"]), ("components/A.tsx", vec!["../App"])]),
        log: Vec::new(),
        fail_on: None,
    };
    let mut registry = ModuleRegistry::new();
    registry.require("./App", ROOT_IMPORTER, &r, &mut exec).unwrap();
    assert_eq!(exec.log.len(), 2);
    assert_eq!(registry.state("App.tsx"), Some(ModuleState::Ready));
    assert_eq!(registry.state("components/A.tsx"), Some(ModuleState::Ready));
}

#[test]
fn test_failed_module_stays_failed() {
    let r = resolver(&["App.tsx", "bad.ts"]);
    let mut exec = Recorder {
        graph: BTreeMap::from([("App.tsx", vec!["./bad"])]),
        log: Vec::new(),
        fail_on: Some("bad.ts"),
    };
    let mut registry = ModuleRegistry::new();
    let err = registry.require("./App", ROOT_IMPORTER, &r, &mut exec).unwrap_err();
    assert_eq!(err, PreviewError::Runtime("bad.ts threw".to_string()));
    assert_eq!(registry.state("bad.ts"), Some(ModuleState::Failed));
    assert_eq!(registry.state("App.tsx"), Some(ModuleState::Failed));

    let again = registry.require("./bad", "App.tsx", &r, &mut exec).unwrap_err();
    assert!(again.to_string().contains("failed to initialize"));
    assert_eq!(registry.executions("bad.ts"), 1);
}

#[test]
fn test_compile_builds_link_table() {
    let p = project(&[
        ("App.tsx", "import React from 'react';\nimport { Button } from './components/ui/Button';\nexport default function App() { return <Button />; }"),
        ("components/ui/Button.tsx", "import { cn } from '../../lib/utils';\nexport function Button() { return <button className={cn('a')} />; }"),
        ("lib/utils.ts", "import { clsx } from 'clsx';\nexport const cn = (...a: any[]) => clsx(a);"),
        ("readme.md", "# not source"),
    ]);
    let compiled = compile(&p, &PreviewConfig::default()).unwrap();
    assert_eq!(compiled.entry_key, "App.tsx");
    assert_eq!(compiled.modules.len(), 3);
    assert_eq!(compiled.order, vec!["lib/utils.ts", "components/ui/Button.tsx", "App.tsx"]);
    assert_eq!(
        compiled.links["App.tsx"]["./components/ui/Button"],
        Resolved::Module("components/ui/Button.tsx".to_string())
    );
    assert_eq!(compiled.links[ROOT_IMPORTER]["./App"], Resolved::Module("App.tsx".to_string()));
    assert!(matches!(compiled.links["lib/utils.ts"]["clsx"], Resolved::External(_)));
    assert_eq!(compiled.fingerprint, p.fingerprint());
}

#[test]
fn test_compile_unresolved_import() {
    let p = project(&[("App.tsx", "import Missing from './Missing';\nexport default function App() { return <Missing />; }")]);
    let err = compile(&p, &PreviewConfig::default()).unwrap_err();
    assert_eq!(err, PreviewError::unresolved("./Missing", "App.tsx"));
    assert_eq!(err.kind(), Some(FailureKind::UnresolvedModule));
}

#[test]
fn test_compile_missing_entry() {
    let p = project(&[("Main.tsx", "export default function Main() { return null; }")]);
    let err = compile(&p, &PreviewConfig::default()).unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::MissingEntryExport));

    let p = project(&[("App.tsx", "export function App() { return null; }")]);
    let err = compile(&p, &PreviewConfig::default()).unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::MissingEntryExport));
    assert!(err.to_string().contains("App.tsx"));
}

#[test]
fn test_compile_custom_entry() {
    let config = PreviewConfig {
        entry: "src/Main".to_string(),
        ..PreviewConfig::default()
    };
    let p = project(&[("src/Main.tsx", "export default () => null;")]);
    let compiled = compile(&p, &config).unwrap();
    assert_eq!(compiled.entry_key, "src/Main.tsx");
}

#[test]
fn test_transform_error_aborts_compile() {
    let p = project(&[
        ("App.tsx", "export default function App() { return <div>ok</div>; }"),
        ("Broken.tsx", "export const X = <div><span>hi</div>;"),
    ]);
    let err = compile(&p, &PreviewConfig::default()).unwrap_err();
    assert_eq!(err.kind(), Some(FailureKind::Transform));
    assert!(err.to_string().starts_with("Broken.tsx"));
}
