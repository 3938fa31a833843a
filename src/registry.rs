//! 模块注册表
//!
//! 每个模块键一条记录；第一次 `begin` 获得执行权，执行中被再次请求（循环依赖）
//! 时直接返回未完成的导出，所以每个模块最多执行一次，循环也不会发散。

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::project::Project;
use crate::resolver::{Resolved, Resolver, ROOT_IMPORTER};
use crate::transform::{transform, TransformOutput};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    Pending,
    Executing,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub key: String,
    pub state: ModuleState,
    pub executions: u32,
}

/// `begin` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// 调用者负责执行模块体
    Execute,
    /// 模块正在执行（循环依赖），返回当前的部分导出
    InFlight,
    Ready,
    Failed,
}

impl Begin {
    pub fn code(&self) -> &'static str {
        match self {
            Begin::Execute => "execute",
            Begin::InFlight => "ready",
            Begin::Ready => "ready",
            Begin::Failed => "failed",
        }
    }
}

/// 模块体的执行者：静态链接时只递归处理导入，沙箱里则真正运行代码
pub trait ModuleExecutor {
    fn execute(&mut self, key: &str, registry: &mut ModuleRegistry, resolver: &Resolver) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: BTreeMap<String, ModuleRecord>,
    order: Vec<String>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &str) -> Option<&ModuleRecord> {
        self.records.get(key)
    }

    pub fn state(&self, key: &str) -> Option<ModuleState> {
        self.records.get(key).map(|r| r.state)
    }

    pub fn executions(&self, key: &str) -> u32 {
        self.records.get(key).map(|r| r.executions).unwrap_or(0)
    }

    /// 完成初始化的顺序
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 记录在执行前就标记为 Executing
    pub fn begin(&mut self, key: &str) -> Begin {
        let record = self.records.entry(key.to_string()).or_insert_with(|| ModuleRecord {
            key: key.to_string(),
            state: ModuleState::Pending,
            executions: 0,
        });
        match record.state {
            ModuleState::Pending => {
                record.state = ModuleState::Executing;
                record.executions += 1;
                tracing::debug!(key, "executing module");
                Begin::Execute
            }
            ModuleState::Executing => {
                tracing::debug!(key, "circular require, returning partial exports");
                Begin::InFlight
            }
            ModuleState::Ready => Begin::Ready,
            ModuleState::Failed => Begin::Failed,
        }
    }

    pub fn finish(&mut self, key: &str) {
        if let Some(record) = self.records.get_mut(key) {
            if record.state == ModuleState::Executing {
                record.state = ModuleState::Ready;
                self.order.push(key.to_string());
            }
        }
    }

    pub fn fail(&mut self, key: &str) {
        if let Some(record) = self.records.get_mut(key) {
            record.state = ModuleState::Failed;
            tracing::debug!(key, "module failed");
        }
    }

    /// 解析说明符；项目模块在第一次请求时执行
    pub fn require<E: ModuleExecutor + ?Sized>(
        &mut self,
        specifier: &str,
        importer: &str,
        resolver: &Resolver,
        executor: &mut E,
    ) -> Result<Resolved> {
        let resolved = resolver.resolve(specifier, importer)?;
        if let Resolved::Module(key) = &resolved {
            match self.begin(key) {
                Begin::Execute => match executor.execute(key, self, resolver) {
                    Ok(()) => self.finish(key),
                    Err(err) => {
                        self.fail(key);
                        return Err(err);
                    }
                },
                Begin::Failed => {
                    return Err(PreviewError::Runtime(format!(
                        "Module '{}' failed to initialize",
                        key
                    )));
                }
                Begin::InFlight | Begin::Ready => {}
            }
        }
        Ok(resolved)
    }
}

/// 编译期的空执行：只沿静态导入递归，发现第一个无法解析的导入
struct StaticLinker<'a> {
    imports: BTreeMap<&'a str, &'a [String]>,
}

impl<'a> ModuleExecutor for StaticLinker<'a> {
    fn execute(&mut self, key: &str, registry: &mut ModuleRegistry, resolver: &Resolver) -> Result<()> {
        let specifiers: Vec<String> = self.imports.get(key).map(|s| s.to_vec()).unwrap_or_default();
        for specifier in &specifiers {
            registry.require(specifier, key, resolver, self)?;
        }
        Ok(())
    }
}

/// 转换后的模块
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledModule {
    pub key: String,
    pub source: String,
}

/// 导入者 -> (说明符 -> 解析结果)
pub type LinkTable = BTreeMap<String, BTreeMap<String, Resolved>>;

/// 一次成功的编译
#[derive(Debug, Clone)]
pub struct CompiledProject {
    pub modules: Vec<CompiledModule>,
    pub outputs: Vec<TransformOutput>,
    pub entry_key: String,
    pub links: LinkTable,
    /// 静态导入图的初始化顺序
    pub order: Vec<String>,
    pub fingerprint: u64,
}

impl CompiledProject {
    pub fn output(&self, key: &str) -> Option<&TransformOutput> {
        self.outputs.iter().find(|o| o.path == key)
    }

    pub fn resolver(&self, extensions: &[String]) -> Resolver {
        Resolver::new(self.modules.iter().map(|m| m.key.clone()), extensions)
    }
}

/// 同步编译：转换、解析入口、静态链接、检查默认导出、生成链接表
pub fn compile(project: &Project, config: &PreviewConfig) -> Result<CompiledProject> {
    let sources = project.source_files(&config.extensions);

    let mut outputs = Vec::with_capacity(sources.len());
    for file in &sources {
        outputs.push(transform(&file.path, &file.content)?);
    }

    let resolver = Resolver::new(outputs.iter().map(|o| o.path.clone()), &config.extensions);
    let entry_specifier = config.entry_specifier();
    let entry_key = match resolver.resolve(&entry_specifier, ROOT_IMPORTER) {
        Ok(Resolved::Module(key)) => key,
        _ => {
            return Err(PreviewError::MissingEntryExport(format!(
                "No module resolves to '{}'; add {}.tsx with a default export",
                config.entry, config.entry
            )));
        }
    };

    let order = {
        let mut linker = StaticLinker {
            imports: outputs.iter().map(|o| (o.path.as_str(), o.imports.as_slice())).collect(),
        };
        let mut registry = ModuleRegistry::new();
        registry.require(&entry_specifier, ROOT_IMPORTER, &resolver, &mut linker)?;
        registry.order().to_vec()
    };

    if let Some(entry) = outputs.iter().find(|o| o.path == entry_key) {
        if entry.is_esm && !entry.has_default_export {
            return Err(PreviewError::MissingEntryExport(format!(
                "{} has no default export; export the root component with `export default`",
                entry_key
            )));
        }
    }

    let mut links = LinkTable::new();
    links
        .entry(ROOT_IMPORTER.to_string())
        .or_default()
        .insert(entry_specifier.clone(), Resolved::Module(entry_key.clone()));
    for output in &outputs {
        let table = links.entry(output.path.clone()).or_default();
        for specifier in output.imports.iter().chain(output.dynamic_imports.iter()) {
            if let Ok(resolved) = resolver.resolve(specifier, &output.path) {
                table.insert(specifier.clone(), resolved);
            }
        }
    }

    let modules = outputs
        .iter()
        .map(|o| CompiledModule {
            key: o.path.clone(),
            source: o.code.clone(),
        })
        .collect::<Vec<_>>();

    tracing::info!(modules = modules.len(), entry = %entry_key, "compiled project");

    Ok(CompiledProject {
        modules,
        outputs,
        entry_key,
        links,
        order,
        fingerprint: project.fingerprint(),
    })
}
