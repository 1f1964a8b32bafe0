//! 批量转换 - 编排层
//!
//! ## 职责
//!
//! 按编号顺序把 Markdown 实验文件转换为 DOCX。
//!
//! ## 失败分类
//!
//! - **整批致命**：模板文件不存在（不做任何转换）、转换程序不可用（第一次出现即停止）
//! - **单项可恢复**：源文件不存在（跳过）、转换程序返回失败、其他意外错误
//!
//! 单项失败只记录日志，继续处理下一个编号。

use std::ops::RangeInclusive;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::ConvertError;
use crate::models::{docx_file_name, docx_path, markdown_file_name, markdown_path};
use crate::services::{Cleanup, DocumentConverter};
use crate::utils::logging::{log_batch_start, print_final_stats};

/// 一次批量转换任务
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Markdown 源目录
    pub source_dir: PathBuf,
    /// DOCX 输出目录（不存在时自动创建）
    pub dest_dir: PathBuf,
    /// 样式参考文档
    pub template: PathBuf,
    /// 连续的实验编号范围
    pub numbers: RangeInclusive<u32>,
}

/// 单个编号的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 转换成功
    Converted { source: PathBuf, output: PathBuf },
    /// 源文件不存在，已跳过
    Skipped { source: PathBuf },
    /// 转换失败，继续下一个
    Failed { reason: String },
}

/// 中止整批的原因
#[derive(Debug, Error)]
pub enum BatchHalt {
    #[error("模板文件不存在: {}", .path.display())]
    MissingTemplate { path: PathBuf },
    #[error("无法创建输出目录 {}: {source}", .path.display())]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("处理实验 {number} 时转换程序不可用: {source}")]
    ConverterUnavailable {
        number: u32,
        #[source]
        source: ConvertError,
    },
}

/// 批量转换报告
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 按处理顺序记录的结果
    pub items: Vec<(u32, ItemOutcome)>,
    /// 致命错误（最多一个）
    pub halt: Option<BatchHalt>,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Converted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// 单项处理的结果：继续或中止
enum ItemStep {
    Done(ItemOutcome),
    Halt(BatchHalt),
}

/// 执行批量转换
///
/// 同步顺序执行，每个编号独立处理
pub fn convert_batch(
    job: &ConversionJob,
    cleanup: &Cleanup,
    converter: &dyn DocumentConverter,
) -> BatchReport {
    let mut report = BatchReport::default();

    info!("🚀 开始转换...");

    if !job.template.is_file() {
        error!(
            "❌ 模板文件 '{}' 不存在，请先准备好样式参考文档",
            job.template.display()
        );
        report.halt = Some(BatchHalt::MissingTemplate {
            path: job.template.clone(),
        });
        return report;
    }

    if let Err(source) = std::fs::create_dir_all(&job.dest_dir) {
        error!("❌ 无法创建输出目录 {}: {}", job.dest_dir.display(), source);
        report.halt = Some(BatchHalt::OutputDirUnavailable {
            path: job.dest_dir.clone(),
            source,
        });
        return report;
    }

    log_batch_start(
        *job.numbers.start(),
        *job.numbers.end(),
        &job.source_dir,
        &job.dest_dir,
    );

    for number in job.numbers.clone() {
        match convert_item(job, number, cleanup, converter) {
            ItemStep::Done(outcome) => report.items.push((number, outcome)),
            ItemStep::Halt(halt) => {
                error!("⛔ {}，停止后续转换", halt);
                report.halt = Some(halt);
                break;
            }
        }
    }

    print_final_stats(
        report.converted(),
        report.skipped(),
        report.failed(),
        report.is_halted(),
    );
    report
}

fn convert_item(
    job: &ConversionJob,
    number: u32,
    cleanup: &Cleanup,
    converter: &dyn DocumentConverter,
) -> ItemStep {
    let md_name = markdown_file_name(number);
    let docx_name = docx_file_name(number);
    let source = markdown_path(&job.source_dir, number);
    let output = docx_path(&job.dest_dir, number);

    if !source.exists() {
        warn!("⚠️  跳过: {} 不存在", md_name);
        return ItemStep::Done(ItemOutcome::Skipped { source });
    }

    let content = match std::fs::read_to_string(&source) {
        Ok(content) => content,
        Err(e) => {
            error!("❌ 读取 {} 失败: {}", md_name, e);
            return ItemStep::Done(ItemOutcome::Failed {
                reason: format!("读取失败: {}", e),
            });
        }
    };

    let prepared = cleanup.prepare(number, &content);

    match converter.convert(&prepared, &job.template, &output) {
        Ok(()) => {
            info!("✅ 已将 {} 转换为 {}", md_name, docx_name);
            ItemStep::Done(ItemOutcome::Converted { source, output })
        }
        Err(e) if e.is_fatal() => ItemStep::Halt(BatchHalt::ConverterUnavailable {
            number,
            source: e,
        }),
        Err(e @ ConvertError::Failed { .. }) => {
            error!("❌ 转换 {} 失败: {}", md_name, e);
            ItemStep::Done(ItemOutcome::Failed {
                reason: e.to_string(),
            })
        }
        Err(e) => {
            error!("❌ 处理 {} 时发生意外错误: {}", md_name, e);
            ItemStep::Done(ItemOutcome::Failed {
                reason: e.to_string(),
            })
        }
    }
}
