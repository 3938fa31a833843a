//! 项目文件快照
//!
//! 外部协作者提供的 (路径, 源码) 列表；每个渲染周期视为不可变。

pub mod response;

pub use response::{parse_response, ChangeSet};

use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// 单个源文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    #[serde(default)]
    pub language: String,
    pub content: String,
}

impl File {
    pub fn new(path: &str, content: &str) -> Self {
        let path = normalize_path(path);
        let language = language_for(&path).to_string();
        Self {
            path,
            language,
            content: content.to_string(),
        }
    }

    /// 扩展名（含 '.'），没有则为空
    pub fn extension(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or("");
        match name.rfind('.') {
            Some(i) if i > 0 => &name[i..],
            _ => "",
        }
    }

    pub fn is_source(&self, extensions: &[String]) -> bool {
        let ext = self.extension();
        !ext.is_empty() && extensions.iter().any(|e| e == ext)
    }
}

/// 路径规范化：统一分隔符，去掉 "." 和空段；".." 回退一级，到项目根为止
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    parts.join("/")
}

/// 项目内相对路径在磁盘上的位置；任何可能离开 `root` 的路径都会被拒绝
pub fn contained_path(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let inside = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if relative.as_os_str().is_empty() || !inside {
        return Err(PreviewError::Io(format!(
            "path escapes project directory: {}",
            relative.display()
        )));
    }
    Ok(root.join(relative))
}

fn language_for(path: &str) -> &'static str {
    if path.ends_with(".json") {
        "json"
    } else if path.ends_with(".md") {
        "markdown"
    } else if path.ends_with(".css") {
        "css"
    } else {
        "typescript"
    }
}

/// 项目快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    files: Vec<File>,
}

impl Project {
    pub fn new(files: Vec<File>) -> Self {
        let mut project = Project::default();
        for file in files {
            project.upsert(file);
        }
        project
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&File> {
        let path = normalize_path(path);
        self.files.iter().find(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 同名文件原位替换，新文件追加到末尾
    pub fn upsert(&mut self, file: File) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    pub fn remove(&mut self, path: &str) -> bool {
        let path = normalize_path(path);
        let before = self.files.len();
        self.files.retain(|f| f.path != path);
        before != self.files.len()
    }

    /// 只保留可识别的源文件，顺序不变
    pub fn source_files(&self, extensions: &[String]) -> Vec<&File> {
        self.files.iter().filter(|f| f.is_source(extensions)).collect()
    }

    /// 应用变更集：先删除，再更新/新建
    pub fn apply(&self, changes: &ChangeSet) -> Project {
        let mut next = self.clone();
        for path in &changes.deletions {
            next.remove(path);
        }
        for file in &changes.files {
            next.upsert(file.clone());
        }
        next
    }

    /// 快照指纹（FNV-1a），用于判断快照是否变化
    pub fn fingerprint(&self) -> u64 {
        const OFFSET: u64 = 0xcbf29ce484222325;
        const PRIME: u64 = 0x100000001b3;
        let mut hash = OFFSET;
        for file in &self.files {
            for byte in file.path.bytes().chain([0u8]).chain(file.content.bytes()).chain([0xffu8]) {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(PRIME);
            }
        }
        hash
    }

    /// 从磁盘目录读取（跳过 node_modules 和隐藏目录）
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Project> {
        let root = dir.as_ref();
        let mut paths = Vec::new();
        collect_files(root, root, &mut paths)?;
        paths.sort();

        let mut files = Vec::new();
        for rel in paths {
            let content = std::fs::read_to_string(root.join(&rel))?;
            files.push(File::new(&rel, &content));
        }
        tracing::debug!(dir = %root.display(), files = files.len(), "loaded project");
        Ok(Project::new(files))
    }

    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let root = dir.as_ref();
        for file in &self.files {
            let target = contained_path(root, &file.path)?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, &file.content)?;
        }
        Ok(())
    }

    /// 内置的起始项目
    pub fn starter() -> Project {
        Project::new(vec![
            File::new("App.tsx", include_str!("../../demos/starter/App.tsx")),
            File::new("lib/utils.ts", include_str!("../../demos/starter/lib/utils.ts")),
            File::new(
                "components/ui/Button.tsx",
                include_str!("../../demos/starter/components/ui/Button.tsx"),
            ),
            File::new("package.json", include_str!("../../demos/starter/package.json")),
            File::new("readme.md", include_str!("../../demos/starter/readme.md")),
        ])
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if name == "node_modules" || name.starts_with('.') {
                continue;
            }
            collect_files(root, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}
