//! 路径解析器
//!
//! 纯函数：(说明符, 导入者键) -> 模块键。不访问真实文件系统。

use crate::error::{PreviewError, Result};
use crate::externals::ExternalLib;
use serde::Serialize;
use std::collections::BTreeSet;

/// 入口模块使用的合成导入者
pub const ROOT_IMPORTER: &str = "<root>";

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolved {
    /// 外部绑定，直接注入
    External(#[serde(serialize_with = "serialize_lib")] ExternalLib),
    /// 项目模块键
    Module(String),
}

fn serialize_lib<S: serde::Serializer>(lib: &ExternalLib, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(lib.specifier())
}

impl Resolved {
    pub fn module_key(&self) -> Option<&str> {
        match self {
            Resolved::Module(key) => Some(key),
            Resolved::External(_) => None,
        }
    }
}

pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// 相对路径拼接：去掉导入者文件名后逐段应用说明符
pub fn join_relative(importer: &str, specifier: &str) -> String {
    let mut stack: Vec<&str> = importer.split('/').filter(|s| !s.is_empty()).collect();
    stack.pop();

    for part in specifier.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// 非相对说明符的兜底：去掉开头的 '.' 和 '/'
pub fn strip_leading(specifier: &str) -> String {
    specifier.trim_start_matches(['.', '/']).to_string()
}

/// 模块键解析器
#[derive(Debug, Clone)]
pub struct Resolver {
    modules: BTreeSet<String>,
    extensions: Vec<String>,
}

impl Resolver {
    pub fn new<I, S>(modules: I, extensions: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
            extensions: extensions.to_vec(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains(key)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|s| s.as_str())
    }

    /// 基础键的探测顺序：原样、加扩展名、index + 扩展名
    pub fn candidates(&self, base: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.extensions.len() * 2);
        out.push(base.to_string());
        for ext in &self.extensions {
            out.push(format!("{}{}", base, ext));
        }
        for ext in &self.extensions {
            if base.is_empty() {
                out.push(format!("index{}", ext));
            } else {
                out.push(format!("{}/index{}", base, ext));
            }
        }
        out
    }

    pub fn resolve(&self, specifier: &str, importer: &str) -> Result<Resolved> {
        if let Some(lib) = ExternalLib::from_specifier(specifier) {
            return Ok(Resolved::External(lib));
        }

        let base = if is_relative(specifier) {
            join_relative(importer, specifier)
        } else {
            strip_leading(specifier)
        };

        for candidate in self.candidates(&base) {
            if !candidate.is_empty() && self.modules.contains(&candidate) {
                tracing::debug!(specifier, importer, key = %candidate, "resolved module");
                return Ok(Resolved::Module(candidate));
            }
        }

        Err(PreviewError::unresolved(specifier, importer))
    }
}
