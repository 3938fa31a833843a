//! 无头执行沙箱
//!
//! 每个实例独占一个 QuickJS 运行时、一个模块注册表和一张绑定表。
//! 执行和浏览器相同的脚手架脚本，然后在虚拟时钟上跑事件循环直到空闲。

pub mod bridge;
pub mod event_loop;
pub mod host;
pub mod runtime;
pub mod shims;

use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::externals::{Arrival, BindingTable};
use crate::fault::Diagnostic;
use crate::preview::Epoch;
use crate::project::Project;
use crate::registry::compile;
use crate::resolver::Resolver;
use crate::scaffold::{ScaffoldBuilder, Target};
use bridge::{Bridge, BridgeEvent, ConsoleLevel, ModuleHost};
use event_loop::{EventLoop, Halt, TimerTask};
use host::HostApi;
use runtime::JsRuntime;
use serde::Deserialize;
use serde_json::Value;

/// 预览表面
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// 还没有挂载任何东西
    Blank,
    Mounted { html: String },
    Diagnostic(Diagnostic),
}

impl Surface {
    pub fn is_mounted(&self) -> bool {
        matches!(self, Surface::Mounted { .. })
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Surface::Mounted { html } => Some(html),
            _ => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Surface::Diagnostic(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SurfaceState {
    html: String,
    mounted: bool,
}

#[derive(Debug, Deserialize)]
struct FireResult {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct Sandbox {
    config: PreviewConfig,
    epoch: Epoch,
    bindings: BindingTable,
    runtime: JsRuntime,
    bridge: Bridge,
    host: ModuleHost,
    event_loop: EventLoop,
    scripts: Vec<(&'static str, String)>,
    started: bool,
    fingerprint: Option<u64>,
    failure: Option<Diagnostic>,
    diagnostics: Vec<Diagnostic>,
    surface: Surface,
}

impl Sandbox {
    pub fn new(config: &PreviewConfig, epoch: Epoch, bindings: BindingTable) -> Result<Self> {
        let runtime = JsRuntime::new()?;
        let bridge = Bridge::new();
        let host = ModuleHost::new(Resolver::new(Vec::<String>::new(), &config.extensions));
        let mut event_loop = EventLoop::new();

        bridge.init(&runtime, &host)?;
        HostApi::new(&runtime, event_loop.clock()).init()?;
        shims::install(&runtime)?;

        for binding in bindings.bindings() {
            match binding.arrival {
                Arrival::After(ms) => event_loop.set_timer(TimerTask::Binding(binding.lib), ms, false),
                Arrival::Never => {
                    tracing::debug!(lib = binding.lib.specifier(), "binding withheld");
                }
            }
        }

        tracing::info!(epoch = epoch.0, "sandbox created");

        Ok(Self {
            config: config.clone(),
            epoch,
            bindings,
            runtime,
            bridge,
            host,
            event_loop,
            scripts: Vec::new(),
            started: false,
            fingerprint: None,
            failure: None,
            diagnostics: Vec::new(),
            surface: Surface::Blank,
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// 已载入快照的指纹
    pub fn fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// 所有上报过的失败，第一条是终止性的
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// 虚拟时钟（毫秒）
    pub fn now(&self) -> u64 {
        self.event_loop.now()
    }

    pub fn registry(&self) -> std::cell::Ref<'_, crate::registry::ModuleRegistry> {
        self.host.registry.borrow()
    }

    /// 编译快照并生成无头脚手架；编译错误作为诊断嵌入，不在这里返回
    pub fn load(&mut self, project: &Project) -> Result<()> {
        if self.started {
            return Err(PreviewError::Engine("sandbox already started; create a new one".to_string()));
        }
        let result = compile(project, &self.config);
        match &result {
            Ok(compiled) => {
                *self.host.resolver.borrow_mut() = compiled.resolver(&self.config.extensions);
            }
            Err(err) => tracing::warn!(error = %err, "compile failed"),
        }

        let scaffold = ScaffoldBuilder::new(&self.config, Target::Headless)
            .bindings(self.bindings.clone())
            .result(&result)
            .build();
        self.scripts = scaffold
            .scripts()
            .into_iter()
            .map(|(name, source)| (name, source.to_string()))
            .collect();
        self.fingerprint = Some(project.fingerprint());
        Ok(())
    }

    /// 执行脚手架并跑到空闲
    pub fn run(&mut self) -> Result<Surface> {
        if !self.started {
            self.started = true;
            for (name, source) in &self.scripts {
                self.runtime.eval_named(name, source)?;
            }
        }
        self.pump()?;
        self.refresh_surface()
    }

    /// 向 id / data-testid 匹配的元素派发事件，然后继续跑事件循环
    pub fn fire_event(&mut self, target: &str, event: &str, value: Option<Value>) -> Result<Surface> {
        let value = value.unwrap_or(Value::Null);
        let code = format!(
            "__preview_fire({}, {}, {})",
            Value::from(target),
            Value::from(event),
            value
        );
        let raw = self.runtime.eval(&code)?;
        let result: FireResult =
            serde_json::from_str(&raw).map_err(|e| PreviewError::Engine(format!("bad event result: {}", e)))?;
        if !result.ok {
            return Err(PreviewError::Event(result.error.unwrap_or_default()));
        }
        tracing::debug!(target_id = target, event, "event dispatched");
        self.pump()?;
        self.refresh_surface()
    }

    fn pump(&mut self) -> Result<()> {
        let deadline = self.event_loop.now() + self.config.headless.idle_budget_ms;
        loop {
            if !self.event_loop.step(self.config.headless.max_steps) {
                tracing::warn!(steps = self.event_loop.steps(), "event loop step limit reached");
                return Ok(());
            }

            if let Err(err) = self.runtime.run_jobs() {
                self.runtime.eval(&format!(
                    "__preview.reportFailure('async', {})",
                    Value::from(err.to_string())
                ))?;
            }

            let events = self.bridge.drain_events();
            if !events.is_empty() {
                for event in events {
                    self.process_bridge_event(event);
                }
                continue;
            }
            if self.runtime.has_pending_jobs() {
                continue;
            }

            match self.event_loop.next_due(deadline) {
                Ok(TimerTask::Script(id)) => self.bridge.trigger_timer(&self.runtime, id)?,
                Ok(TimerTask::Binding(lib)) => {
                    tracing::debug!(lib = lib.specifier(), at = self.event_loop.now(), "binding arrived");
                    self.runtime.call_function("__install_binding", &[lib.specifier()])?;
                }
                Err(Halt::Idle) => return Ok(()),
                Err(halt) => {
                    tracing::debug!(?halt, pending = self.event_loop.pending(), "event loop halted");
                    return Ok(());
                }
            }
        }
    }

    fn process_bridge_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Console { level, message } => match level {
                ConsoleLevel::Error => tracing::error!(target: "preview::console", "{}", message),
                ConsoleLevel::Warn => tracing::warn!(target: "preview::console", "{}", message),
                ConsoleLevel::Debug => tracing::debug!(target: "preview::console", "{}", message),
                ConsoleLevel::Log | ConsoleLevel::Info => tracing::info!(target: "preview::console", "{}", message),
            },
            BridgeEvent::SetTimer { id, delay, repeat } => {
                self.event_loop.set_timer(TimerTask::Script(id), delay, repeat);
            }
            BridgeEvent::ClearTimer(id) => {
                self.event_loop.clear_timer(TimerTask::Script(id));
            }
            BridgeEvent::Failure { diagnostic, terminal } => {
                if terminal && self.failure.is_none() {
                    tracing::warn!(kind = %diagnostic.kind, message = %diagnostic.message, "preview failed");
                    self.failure = Some(diagnostic.clone());
                } else {
                    tracing::debug!(kind = %diagnostic.kind, "additional failure after terminal one");
                }
                self.diagnostics.push(diagnostic);
            }
        }
    }

    fn refresh_surface(&mut self) -> Result<Surface> {
        let surface = match &self.failure {
            Some(diagnostic) => Surface::Diagnostic(diagnostic.clone()),
            None => {
                let raw = self.runtime.eval("__preview_surface()")?;
                let state: SurfaceState = serde_json::from_str(&raw)
                    .map_err(|e| PreviewError::Engine(format!("bad surface state: {}", e)))?;
                if state.mounted || !state.html.is_empty() {
                    Surface::Mounted { html: state.html }
                } else {
                    Surface::Blank
                }
            }
        };
        self.surface = surface.clone();
        Ok(surface)
    }
}

/// 单次无头渲染
pub fn render_headless(project: &Project, config: &PreviewConfig, bindings: BindingTable) -> Result<Surface> {
    let mut sandbox = Sandbox::new(config, Epoch::default(), bindings)?;
    sandbox.load(project)?;
    sandbox.run()
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("epoch", &self.epoch)
            .field("started", &self.started)
            .field("now", &self.event_loop.now())
            .field("surface", &self.surface)
            .finish()
    }
}
