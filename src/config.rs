//! 预览配置
//!
//! `preview.json` 的结构；所有字段都有默认值。

use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// preview.json 配置结构
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// 入口模块的规范键（不带扩展名）
    #[serde(default = "default_entry")]
    pub entry: String,
    /// 无扩展名说明符的探测顺序，同时也是识别源文件的列表
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_tailwind_url")]
    pub tailwind_url: String,
    /// 额外的样式表地址
    #[serde(default)]
    pub stylesheets: Vec<String>,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub headless: HeadlessConfig,
}

/// 就绪门的轮询参数
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u32,
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// 每次重试后间隔的倍数，1.0 即固定间隔
    #[serde(default = "default_backoff")]
    pub backoff: f64,
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u32,
}

/// 无头沙箱的事件循环预算
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessConfig {
    /// 虚拟时钟上允许推进的最长时间
    #[serde(default = "default_idle_budget")]
    pub idle_budget_ms: u64,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_entry() -> String { "App".to_string() }
fn default_extensions() -> Vec<String> {
    [".tsx", ".ts", ".js", ".jsx"].iter().map(|s| s.to_string()).collect()
}
fn default_title() -> String { "Preview".to_string() }
fn default_tailwind_url() -> String { "https://cdn.tailwindcss.com/3.4.5".to_string() }
fn default_interval() -> u32 { 50 }
fn default_attempts() -> u32 { 100 }
fn default_backoff() -> f64 { 1.0 }
fn default_max_interval() -> u32 { 1000 }
fn default_idle_budget() -> u64 { 10_000 }
fn default_max_steps() -> u32 { 10_000 }

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            extensions: default_extensions(),
            title: default_title(),
            tailwind_url: default_tailwind_url(),
            stylesheets: Vec::new(),
            readiness: ReadinessConfig::default(),
            headless: HeadlessConfig::default(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            max_attempts: default_attempts(),
            backoff: default_backoff(),
            max_interval_ms: default_max_interval(),
        }
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            idle_budget_ms: default_idle_budget(),
            max_steps: default_max_steps(),
        }
    }
}

impl PreviewConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PreviewConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry.trim().is_empty() {
            return Err(PreviewError::Config("entry must not be empty".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(PreviewError::Config("at least one extension is required".to_string()));
        }
        if let Some(bad) = self.extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(PreviewError::Config(format!("extension '{}' must start with '.'", bad)));
        }
        if self.readiness.max_attempts == 0 {
            return Err(PreviewError::Config("readiness.maxAttempts must be at least 1".to_string()));
        }
        if !(self.readiness.backoff >= 1.0) {
            return Err(PreviewError::Config("readiness.backoff must be >= 1.0".to_string()));
        }
        Ok(())
    }

    /// 入口说明符，从合成的 `<root>` 导入者解析
    pub fn entry_specifier(&self) -> String {
        format!("./{}", self.entry.trim_start_matches("./"))
    }
}
