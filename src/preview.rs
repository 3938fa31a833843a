//! 宿主侧入口与刷新协议
//!
//! 宿主给出一个快照和一个刷新令牌。令牌变化或快照指纹变化时丢弃整个沙箱重建；
//! 相同令牌加相同快照直接返回当前表面。不做增量更新。

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::externals::BindingTable;
use crate::project::Project;
use crate::registry::compile;
use crate::sandbox::{Sandbox, Surface};
use crate::scaffold::{ScaffoldBuilder, Target};
use serde_json::Value;

/// 刷新令牌
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0.wrapping_add(1))
    }
}

pub struct LivePreview {
    config: PreviewConfig,
    bindings: BindingTable,
    sandbox: Option<Sandbox>,
}

impl LivePreview {
    pub fn new(config: PreviewConfig) -> Self {
        Self::with_bindings(config, BindingTable::standard())
    }

    pub fn with_bindings(config: PreviewConfig, bindings: BindingTable) -> Self {
        Self {
            config,
            bindings,
            sandbox: None,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// 浏览器文档（iframe srcdoc）
    pub fn document(&self, project: &Project) -> String {
        let result = compile(project, &self.config);
        ScaffoldBuilder::new(&self.config, Target::Browser)
            .bindings(self.bindings.clone())
            .result(&result)
            .build()
            .to_html()
    }

    /// 无头渲染
    pub fn render(&mut self, project: &Project, epoch: Epoch) -> Result<Surface> {
        if let Some(sandbox) = &self.sandbox {
            if sandbox.epoch() == epoch && sandbox.fingerprint() == Some(project.fingerprint()) {
                return Ok(sandbox.surface().clone());
            }
        }

        // 旧沙箱先整体销毁，新实例不继承任何状态
        if let Some(old) = self.sandbox.take() {
            tracing::info!(from = old.epoch().0, to = epoch.0, "discarding sandbox");
        }

        let mut sandbox = Sandbox::new(&self.config, epoch, self.bindings.clone())?;
        sandbox.load(project)?;
        let surface = sandbox.run()?;
        self.sandbox = Some(sandbox);
        Ok(surface)
    }

    pub fn fire_event(&mut self, target: &str, event: &str, value: Option<Value>) -> Result<Surface> {
        match self.sandbox.as_mut() {
            Some(sandbox) => sandbox.fire_event(target, event, value),
            None => Err(PreviewError::Event("nothing has been rendered".to_string())),
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.sandbox.as_ref().map(|s| s.surface())
    }

    pub fn sandbox(&self) -> Option<&Sandbox> {
        self.sandbox.as_ref()
    }
}
