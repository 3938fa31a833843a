//! 外部依赖注入表
//!
//! 固定的一组可解析外部库。浏览器目标从固定版本的 ESM 源加载；
//! 无头目标安装进程内的同名替身。

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// 固定的外部库集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExternalLib {
    React,
    ReactDom,
    ReactDomClient,
    LucideReact,
    Clsx,
    TailwindMerge,
    HeadlessUi,
}

const REACT_VERSION: &str = "18.3.1";

impl ExternalLib {
    pub const ALL: [ExternalLib; 7] = [
        ExternalLib::React,
        ExternalLib::ReactDom,
        ExternalLib::ReactDomClient,
        ExternalLib::LucideReact,
        ExternalLib::Clsx,
        ExternalLib::TailwindMerge,
        ExternalLib::HeadlessUi,
    ];

    /// 导入说明符，同时也是绑定表中的键
    pub fn specifier(&self) -> &'static str {
        match self {
            ExternalLib::React => "react",
            ExternalLib::ReactDom => "react-dom",
            ExternalLib::ReactDomClient => "react-dom/client",
            ExternalLib::LucideReact => "lucide-react",
            ExternalLib::Clsx => "clsx",
            ExternalLib::TailwindMerge => "tailwind-merge",
            ExternalLib::HeadlessUi => "@headlessui/react",
        }
    }

    pub fn from_specifier(specifier: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|lib| lib.specifier() == specifier)
    }

    /// 固定版本的 ESM 源；依赖 React 的库把 react 外置，由 import map 指回同一个实例
    pub fn source_url(&self) -> &'static str {
        match self {
            ExternalLib::React => "https://esm.sh/react@18.3.1",
            ExternalLib::ReactDom => "https://esm.sh/react-dom@18.3.1?external=react",
            ExternalLib::ReactDomClient => "https://esm.sh/react-dom@18.3.1/client?external=react",
            ExternalLib::LucideReact => "https://esm.sh/lucide-react@0.263.1?external=react",
            ExternalLib::Clsx => "https://esm.sh/clsx@2.1.1",
            ExternalLib::TailwindMerge => "https://esm.sh/tailwind-merge@2.5.4",
            ExternalLib::HeadlessUi => {
                "https://esm.sh/@headlessui/react@1.7.19?external=react,react-dom"
            }
        }
    }

    /// 库的用途，用于 CLI 列表
    pub fn role(&self) -> &'static str {
        match self {
            ExternalLib::React => "UI framework",
            ExternalLib::ReactDom | ExternalLib::ReactDomClient => "DOM renderer",
            ExternalLib::LucideReact => "icon components",
            ExternalLib::Clsx | ExternalLib::TailwindMerge => "class-name utility",
            ExternalLib::HeadlessUi => "headless UI primitives",
        }
    }
}

/// 浏览器 import map：外置的 react/react-dom 裸导入都指向同一个源
pub static IMPORT_MAP: Lazy<Value> = Lazy::new(|| {
    let react = format!("https://esm.sh/react@{}", REACT_VERSION);
    let react_dom = format!("https://esm.sh/react-dom@{}?external=react", REACT_VERSION);
    json!({
        "imports": {
            "react": react,
            "react/": format!("{}/", react),
            "react-dom": react_dom,
            "react-dom/": format!("https://esm.sh/react-dom@{}/", REACT_VERSION),
        }
    })
});

/// 依赖到达时间（只对无头目标有意义）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// 在虚拟时钟上延迟若干毫秒后到达
    After(u32),
    /// 永远不会到达（模拟网络失败）
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub lib: ExternalLib,
    pub arrival: Arrival,
}

/// 单个沙箱实例的外部绑定表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    /// 全部外部库，立即到达
    pub fn standard() -> Self {
        Self {
            bindings: ExternalLib::ALL
                .iter()
                .map(|&lib| Binding { lib, arrival: Arrival::After(0) })
                .collect(),
        }
    }

    pub fn delay(mut self, lib: ExternalLib, ms: u32) -> Self {
        self.set_arrival(lib, Arrival::After(ms));
        self
    }

    pub fn withhold(mut self, lib: ExternalLib) -> Self {
        self.set_arrival(lib, Arrival::Never);
        self
    }

    fn set_arrival(&mut self, lib: ExternalLib, arrival: Arrival) {
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.lib == lib) {
            binding.arrival = arrival;
        }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn arrival(&self, lib: ExternalLib) -> Arrival {
        self.bindings
            .iter()
            .find(|b| b.lib == lib)
            .map(|b| b.arrival)
            .unwrap_or(Arrival::Never)
    }

    /// 就绪门需要等待的说明符
    pub fn required(&self) -> Vec<&'static str> {
        self.bindings.iter().map(|b| b.lib.specifier()).collect()
    }

    /// 说明符 -> 源地址，供浏览器加载脚本使用
    pub fn source_table(&self) -> Value {
        let mut map = serde_json::Map::new();
        for binding in &self.bindings {
            map.insert(
                binding.lib.specifier().to_string(),
                Value::from(binding.lib.source_url()),
            );
        }
        Value::Object(map)
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::standard()
    }
}
