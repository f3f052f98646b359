//! # 运行目录收集器
//!
//! 在作业根目录下查找含有 Cassandra 性质文件的运行目录。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多模式）
//! - 可选递归搜索
//! - 每个目录只取一个性质文件（优先 `.out.prp`，其次 `.box1.prp`）
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/analyze/isotherm.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 一个模拟运行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    /// 运行名（相对根目录的路径）
    pub name: String,
    /// 运行目录
    pub dir: PathBuf,
    /// 选中的性质文件
    pub property_file: PathBuf,
}

impl RunDir {
    /// 运行目录中的 Cassandra 输入文件（按文件名排序取第一个）
    pub fn input_file(&self) -> Option<PathBuf> {
        let mut inputs: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("inp"))
                    .unwrap_or(false)
            })
            .collect();
        inputs.sort();
        inputs.into_iter().next()
    }
}

/// 运行目录收集器
pub struct RunCollector {
    /// 输入路径
    root: PathBuf,
    /// 匹配模式列表
    patterns: Vec<glob::Pattern>,
    /// 是否递归
    recursive: bool,
}

impl RunCollector {
    /// 创建新的收集器，默认匹配 `*.prp`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: vec![glob::Pattern::new("*.prp").expect("static pattern")],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式），无效模式被忽略
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        let patterns: Vec<glob::Pattern> = pattern
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| glob::Pattern::new(s).ok())
            .collect();
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有运行
    pub fn collect(&self) -> Vec<RunDir> {
        if self.root.is_file() {
            let dir = self
                .root
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return vec![RunDir {
                name: self.run_name(&dir),
                dir,
                property_file: self.root.clone(),
            }];
        }

        if !self.root.is_dir() {
            return vec![];
        }

        // 根目录本身 + 直接子目录
        let max_depth = if self.recursive { usize::MAX } else { 2 };

        let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for entry in WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches_patterns(e.path()))
        {
            if let Some(parent) = entry.path().parent() {
                by_dir
                    .entry(parent.to_path_buf())
                    .or_default()
                    .push(entry.path().to_path_buf());
            }
        }

        by_dir
            .into_iter()
            .filter_map(|(dir, files)| {
                let property_file = Self::preferred_file(files)?;
                Some(RunDir {
                    name: self.run_name(&dir),
                    dir,
                    property_file,
                })
            })
            .collect()
    }

    /// 运行名：相对根目录的路径，根目录本身取目录名
    fn run_name(&self, dir: &Path) -> String {
        match dir.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
            _ => dir
                .file_name()
                .or_else(|| self.root.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| ".".to_string()),
        }
    }

    /// 同一目录多个性质文件时的选择
    fn preferred_file(mut files: Vec<PathBuf>) -> Option<PathBuf> {
        files.sort();
        let ends_with = |p: &PathBuf, suffix: &str| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(suffix))
                .unwrap_or(false)
        };
        files
            .iter()
            .find(|p| ends_with(p, ".out.prp"))
            .or_else(|| files.iter().find(|p| ends_with(p, ".box1.prp")))
            .or_else(|| files.first())
            .cloned()
    }

    /// 检查文件是否匹配任一模式
    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "# MC_STEP Pressure\n1 1.0\n").unwrap();
    }

    #[test]
    fn test_collect_one_run_per_directory() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("mu_-30/gcmc.out.prp"));
        touch(&root.path().join("mu_-30/gcmc.out.box2.prp"));
        touch(&root.path().join("mu_-34/equil.out.prp"));
        touch(&root.path().join("deep/nested/run.out.prp"));
        fs::write(root.path().join("mu_-34/equil.out.log"), "log").unwrap();

        let runs = RunCollector::new(root.path()).collect();
        let names: Vec<_> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["mu_-30", "mu_-34"]);
        assert!(runs[0].property_file.ends_with("gcmc.out.prp"));

        let all = RunCollector::new(root.path()).recursive(true).collect();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_single_file_input() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("p_1bar/gcmc.out.prp");
        touch(&file);
        let runs = RunCollector::new(&file).collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "p_1bar");
        assert_eq!(runs[0].property_file, file);
    }

    #[test]
    fn test_custom_pattern() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("a/x.box1.prp"));
        touch(&root.path().join("b/x.dat"));
        let runs = RunCollector::new(root.path())
            .with_pattern("*.dat, *.prp")
            .collect();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].property_file.ends_with("x.box1.prp"));
    }

    #[test]
    fn test_input_file_lookup() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("mu_-30/gcmc.out.prp"));
        fs::write(root.path().join("mu_-30/gcmc.inp"), "END\n").unwrap();
        fs::write(root.path().join("mu_-30/a.INP.bak"), "END\n").unwrap();

        let runs = RunCollector::new(root.path()).collect();
        assert_eq!(
            runs[0].input_file().unwrap(),
            root.path().join("mu_-30/gcmc.inp")
        );
    }

    #[test]
    fn test_missing_root() {
        assert!(RunCollector::new("/nonexistent/cassutil/runs").collect().is_empty());
    }
}
