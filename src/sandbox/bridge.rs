//! JS 与 Native 桥接层
//!
//! native 函数只往事件队列里推事件，真正的处理留给事件循环；
//! 模块解析和注册表状态是同步查询，直接返回结果。

use super::runtime::JsRuntime;
use crate::error::Result;
use crate::fault::{Diagnostic, FailureKind};
use crate::registry::ModuleRegistry;
use crate::resolver::Resolver;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// 控制台级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    fn parse(level: &str) -> Self {
        match level {
            "info" => ConsoleLevel::Info,
            "warn" => ConsoleLevel::Warn,
            "error" => ConsoleLevel::Error,
            "debug" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Log,
        }
    }
}

/// 桥接事件
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    Console { level: ConsoleLevel, message: String },
    SetTimer { id: u32, delay: u32, repeat: bool },
    ClearTimer(u32),
    /// 失败通道的上报；只有第一条是终止性的
    Failure { diagnostic: Diagnostic, terminal: bool },
}

pub type EventQueue = Rc<RefCell<Vec<BridgeEvent>>>;

/// 模块宿主共享的状态
#[derive(Clone)]
pub struct ModuleHost {
    pub registry: Rc<RefCell<ModuleRegistry>>,
    pub resolver: Rc<RefCell<Resolver>>,
}

impl ModuleHost {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            registry: Rc::new(RefCell::new(ModuleRegistry::new())),
            resolver: Rc::new(RefCell::new(resolver)),
        }
    }
}

/// JS 桥接器
pub struct Bridge {
    event_queue: EventQueue,
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            event_queue: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// 初始化 native 函数
    pub fn init(&self, rt: &JsRuntime, host: &ModuleHost) -> Result<()> {
        self.register_console_function(rt)?;
        self.register_timer_functions(rt)?;
        self.register_failure_function(rt)?;
        self.register_module_functions(rt, host)?;
        Ok(())
    }

    fn register_console_function(&self, rt: &JsRuntime) -> Result<()> {
        let q = self.event_queue.clone();
        rt.register_function("__native_console", move |args| {
            let level = ConsoleLevel::parse(args.first().map(String::as_str).unwrap_or("log"));
            let message = args.get(1).cloned().unwrap_or_default();
            q.borrow_mut().push(BridgeEvent::Console { level, message });
            "undefined".to_string()
        })
    }

    fn register_timer_functions(&self, rt: &JsRuntime) -> Result<()> {
        let q = self.event_queue.clone();
        rt.register_function("__native_set_timer", move |args| {
            if args.len() >= 3 {
                let id: u32 = args[0].parse().unwrap_or(0);
                let delay: u32 = args[1].parse().unwrap_or(0);
                let repeat = args[2] == "true";
                q.borrow_mut().push(BridgeEvent::SetTimer { id, delay, repeat });
            }
            "undefined".to_string()
        })?;

        let q = self.event_queue.clone();
        rt.register_function("__native_clear_timer", move |args| {
            if let Some(id) = args.first().and_then(|s| s.parse().ok()) {
                q.borrow_mut().push(BridgeEvent::ClearTimer(id));
            }
            "undefined".to_string()
        })
    }

    fn register_failure_function(&self, rt: &JsRuntime) -> Result<()> {
        let q = self.event_queue.clone();
        rt.register_function("__native_report_failure", move |args| {
            let kind = args
                .first()
                .and_then(|code| FailureKind::from_code(code))
                .unwrap_or(FailureKind::Runtime);
            let message = args.get(1).cloned().unwrap_or_default();
            let terminal = args.get(2).map(|s| s == "true").unwrap_or(false);
            q.borrow_mut().push(BridgeEvent::Failure {
                diagnostic: Diagnostic::new(kind, message),
                terminal,
            });
            "undefined".to_string()
        })
    }

    fn register_module_functions(&self, rt: &JsRuntime, host: &ModuleHost) -> Result<()> {
        let resolver = host.resolver.clone();
        rt.register_function("__native_resolve", move |args| {
            let specifier = args.first().map(String::as_str).unwrap_or("");
            let importer = args.get(1).map(String::as_str).unwrap_or("");
            match resolver.borrow().resolve(specifier, importer) {
                Ok(resolved) => serde_json::to_string(&resolved).unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string()),
                Err(e) => json!({ "error": e.to_string() }).to_string(),
            }
        })?;

        let registry = host.registry.clone();
        rt.register_function("__native_begin", move |args| {
            let key = args.first().map(String::as_str).unwrap_or("");
            registry.borrow_mut().begin(key).code().to_string()
        })?;

        let registry = host.registry.clone();
        rt.register_function("__native_finish", move |args| {
            if let Some(key) = args.first() {
                registry.borrow_mut().finish(key);
            }
            "undefined".to_string()
        })?;

        let registry = host.registry.clone();
        rt.register_function("__native_fail", move |args| {
            if let Some(key) = args.first() {
                registry.borrow_mut().fail(key);
            }
            "undefined".to_string()
        })
    }

    /// 取出所有待处理事件
    pub fn drain_events(&self) -> Vec<BridgeEvent> {
        std::mem::take(&mut *self.event_queue.borrow_mut())
    }

    pub fn has_events(&self) -> bool {
        !self.event_queue.borrow().is_empty()
    }

    /// 触发 JS 侧定时器回调
    pub fn trigger_timer(&self, rt: &JsRuntime, id: u32) -> Result<()> {
        rt.eval(&format!("__trigger_timer({})", id))?;
        Ok(())
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}
