//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 把命令行输入变成具体的流程：
//!
//! 1. **手动模式**：逐个读取实验目的 → 合成文档 → （可选）转换
//! 2. **推断模式**：读取文本 → 提取实验目的 → （可选）合成文档 → （可选）转换
//! 3. **转换模式**：批量转换已有的 Markdown 文件
//!
//! 不处理单个文档的细节，只负责调度和汇总。

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{error, info, warn};

use crate::cli::{Command, ConvertArgs, DeduceArgs, GenerateArgs, OutputArgs, SubjectArgs};
use crate::clients::{LlmClient, TextGenerator};
use crate::config::Config;
use crate::models::{parse_range, parse_selection, ExperimentItem};
use crate::orchestrator::conversion_batch::{convert_batch, BatchReport, ConversionJob};
use crate::services::{AimExtractor, Cleanup, DocumentSynthesizer, ExtractionRequest, PandocConverter};
use crate::utils::logging::log_startup;
use crate::utils::truncate_text;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 运行一个子命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Generate(args) => self.run_generate(args).await,
            Command::Deduce(args) => self.run_deduce(args).await,
            Command::Convert(args) => self.run_convert(args).await,
        }
    }

    async fn run_generate(&self, args: GenerateArgs) -> Result<()> {
        let subject = &args.subject.subject;
        log_startup(subject, "手动输入实验目的");

        let numbers = parse_selection(&args.select)?;
        if numbers.is_empty() {
            anyhow::bail!("没有选择任何实验编号");
        }
        info!(
            "将为以下实验生成文件: {}",
            numbers
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        // 在读取输入前确认密钥，避免输入完才发现无法调用
        let synthesizer = if args.offline {
            DocumentSynthesizer::offline()
        } else {
            DocumentSynthesizer::new(self.generation_client()?)
        };

        let stdin = BufReader::new(tokio::io::stdin());
        let items = read_manual_aims(&numbers, stdin).await?;
        if items.is_empty() {
            warn!("⚠️ 没有可生成的实验");
            return Ok(());
        }

        let md_dir = self.md_dir(&args.subject);
        let created = self
            .generate_documents(&synthesizer, &items, subject, &md_dir)
            .await;

        if args.convert {
            self.convert_created(&created, subject, &md_dir, &args.output)
                .await?;
        }
        Ok(())
    }

    async fn run_deduce(&self, args: DeduceArgs) -> Result<()> {
        let subject = &args.subject.subject;
        log_startup(subject, "AI 推断实验目的");

        let generator = self.extraction_client()?;
        let text = read_text_blob(args.input.as_deref()).await?;
        if text.trim().is_empty() {
            anyhow::bail!("没有收到任何输入文本");
        }

        let request = ExtractionRequest {
            text: &text,
            system_instruction: args.instruction.as_deref(),
            subject,
        };

        info!("🤖 AI 正在分析文本...");
        let Some(extracted) = AimExtractor::new(generator).extract(&request).await else {
            error!("❌ 无法从文本中推断出实验，请重试或改用手动模式");
            return Ok(());
        };

        info!("✓ 分析完成，找到以下实验 (策略: {}):", extracted.strategy);
        for item in &extracted.items {
            info!("  - 实验 {}: {}", item.number, truncate_text(&item.aim, 100));
        }

        if !args.generate {
            info!("💡 使用 --generate 生成这些文件");
            return Ok(());
        }

        let synthesizer = DocumentSynthesizer::new(self.generation_client()?);
        let md_dir = self.md_dir(&args.subject);
        let created = self
            .generate_documents(&synthesizer, &extracted.items, subject, &md_dir)
            .await;

        if args.convert {
            self.convert_created(&created, subject, &md_dir, &args.output)
                .await?;
        }
        Ok(())
    }

    async fn run_convert(&self, args: ConvertArgs) -> Result<()> {
        let subject = &args.subject.subject;
        log_startup(subject, "转换 Markdown 为 DOCX");

        let numbers = match &args.range {
            Some(range) => parse_range(range)?,
            None => self.config.convert_first..=self.config.convert_last,
        };

        let md_dir = self.md_dir(&args.subject);
        let job = self.conversion_job(subject, &md_dir, &args.output, numbers);
        finish(self.convert(job).await?)
    }

    /// 依次合成并写入文档，返回成功写入的实验编号
    async fn generate_documents(
        &self,
        synthesizer: &DocumentSynthesizer,
        items: &[ExperimentItem],
        subject: &str,
        md_dir: &Path,
    ) -> Vec<u32> {
        info!("📁 Markdown 文件将保存到: {}", md_dir.display());

        let mut created = Vec::new();
        for item in items {
            match synthesizer.write_document(item, subject, md_dir).await {
                Ok(_) => created.push(item.number),
                Err(e) => error!("❌ 实验 {} 写入失败: {}", item.number, e),
            }
        }

        info!("✓ 共生成 {}/{} 个文件", created.len(), items.len());
        created
    }

    /// 转换刚生成的文件，范围取生成编号的最小值到最大值
    async fn convert_created(
        &self,
        created: &[u32],
        subject: &str,
        md_dir: &Path,
        output: &OutputArgs,
    ) -> Result<()> {
        let (Some(&first), Some(&last)) = (created.iter().min(), created.iter().max()) else {
            warn!("⚠️ 没有生成任何文件，跳过转换");
            return Ok(());
        };

        let job = self.conversion_job(subject, md_dir, output, first..=last);
        finish(self.convert(job).await?)
    }

    fn conversion_job(
        &self,
        subject: &str,
        md_dir: &Path,
        output: &OutputArgs,
        numbers: RangeInclusive<u32>,
    ) -> ConversionJob {
        ConversionJob {
            source_dir: md_dir.to_path_buf(),
            dest_dir: output
                .docx_dir
                .clone()
                .unwrap_or_else(|| self.config.docx_dir_for(subject)),
            template: output
                .template
                .clone()
                .unwrap_or_else(|| self.config.template_file.clone()),
            numbers,
        }
    }

    /// 转换批次是同步的，放到阻塞线程池执行
    async fn convert(&self, job: ConversionJob) -> Result<BatchReport> {
        let converter = PandocConverter::new(self.config.converter_program.clone());
        tokio::task::spawn_blocking(move || convert_batch(&job, &Cleanup::default(), &converter))
            .await
            .context("转换任务异常退出")
    }

    fn md_dir(&self, args: &SubjectArgs) -> PathBuf {
        args.md_dir
            .clone()
            .unwrap_or_else(|| self.config.md_dir_for(&args.subject))
    }

    fn generation_client(&self) -> Result<Arc<dyn TextGenerator>> {
        self.client(&self.config.llm_model_name, self.config.llm_temperature)
    }

    fn extraction_client(&self) -> Result<Arc<dyn TextGenerator>> {
        self.client(
            &self.config.llm_extract_model_name,
            self.config.llm_extract_temperature,
        )
    }

    fn client(&self, model: &str, temperature: f32) -> Result<Arc<dyn TextGenerator>> {
        let api_key = self.config.require_api_key()?;
        Ok(Arc::new(LlmClient::new(
            api_key,
            &self.config.llm_api_base_url,
            model,
            temperature,
            self.config.llm_max_retries,
        )))
    }
}

/// 致命错误转成进程的失败退出
fn finish(report: BatchReport) -> Result<()> {
    match report.halt {
        Some(halt) => Err(halt.into()),
        None => {
            info!("\n✨ 全部完成!");
            Ok(())
        }
    }
}

/// 逐个读取实验目的
///
/// 空行沿用上一个目的；没有上一个目的时跳过该编号。输入提前结束时返回已读到的部分。
pub async fn read_manual_aims<R>(numbers: &[u32], reader: R) -> Result<Vec<ExperimentItem>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut previous = String::new();
    let mut items = Vec::new();

    for &number in numbers {
        if previous.is_empty() {
            eprint!("请输入实验 {} 的目的: ", number);
        } else {
            eprint!("请输入实验 {} 的目的 [{}]: ", number, truncate_text(&previous, 40));
        }

        let Some(line) = lines.next_line().await.context("读取输入失败")? else {
            warn!("⚠️ 输入已结束，停止读取");
            break;
        };

        let aim = match line.trim() {
            "" => previous.clone(),
            aim => aim.to_string(),
        };
        if aim.is_empty() {
            info!("跳过实验 {}", number);
            continue;
        }

        items.push(ExperimentItem::new(number, aim.clone()));
        previous = aim;
    }

    Ok(items)
}

/// 从文件或标准输入（直到 EOF）读取整段文本
async fn read_text_blob(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("无法读取输入文件: {}", path.display())),
        None => {
            eprintln!("粘贴包含实验目的的文本，完成后按 Ctrl+D (Windows 为 Ctrl+Z):");
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("读取标准输入失败")?;
            Ok(text)
        }
    }
}
