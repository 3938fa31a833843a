//! 单元测试模块
//! 覆盖路径解析、源码转换、模块注册表、脚手架（含浏览器脚本的执行）、无头沙箱、生成结果解析和配置

pub mod browser_tests;
pub mod registry_tests;
pub mod resolver_tests;
pub mod response_tests;
pub mod scaffold_tests;
pub mod transform_tests;

use crate::project::{File, Project};

/// 由 (路径, 源码) 列表构造快照
pub fn project(files: &[(&str, &str)]) -> Project {
    Project::new(files.iter().map(|(path, content)| File::new(path, content)).collect())
}
