//! # 批量执行器
//!
//! 并行解析多个运行目录。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，结果保持输入顺序
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/analyze/isotherm.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::batch::RunDir;
use crate::error::Result;
use crate::utils::progress;

use rayon::prelude::*;

/// 批量处理结果
#[derive(Debug)]
pub struct BatchResult<T> {
    /// 成功结果（按输入顺序）
    pub successes: Vec<T>,
    /// 失败详情 (运行名, 错误信息)
    pub failures: Vec<(String, String)>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// 合并单个运行的处理结果
    pub fn merge(&mut self, run: &str, result: Result<T>) {
        match result {
            Ok(value) => self.successes.push(value),
            Err(e) => self.failures.push((run.to_string(), e.to_string())),
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 并行处理运行列表
    pub fn run<T, F>(&self, runs: &[RunDir], message: &str, processor: F) -> BatchResult<T>
    where
        T: Send,
        F: Fn(&RunDir) -> Result<T> + Sync + Send,
    {
        let pb = progress::create_progress_bar(runs.len() as u64, message);

        let work = || -> Vec<Result<T>> {
            runs.par_iter()
                .map(|run| {
                    let result = processor(run);
                    pb.inc(1);
                    result
                })
                .collect()
        };

        // 线程池创建失败时退回全局池
        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(_) => work(),
        };

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for (run, result) in runs.iter().zip(results) {
            batch_result.merge(&run.name, result);
        }

        batch_result
    }
}
