//! # 解析器模块
//!
//! Cassandra 输入/输出文件和文献数据的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: prp, inp, literature

pub mod inp;
pub mod literature;
pub mod prp;
