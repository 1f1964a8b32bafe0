//! # labgen
//!
//! 为实验课生成实验报告 Markdown 文件，并批量转换为 DOCX
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - OpenAI 兼容的 LLM 客户端
//! - `TextGenerator` - 文本生成 / 结构化输出能力，测试中可替换
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个实验
//! - `AimExtractor` - 从文本中提取实验编号和目的（多策略依次尝试）
//! - `DocumentSynthesizer` - 生成实验文档，失败时退回骨架模板
//! - `Cleanup` - 去掉固定的样板行并加上标题
//! - `PandocConverter` - 调用外部程序生成 DOCX
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/app` - 三种运行模式
//! - `orchestrator/conversion_batch` - 批量转换和统计
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ExperimentItem, LabDocument};
pub use orchestrator::{convert_batch, App, BatchReport, ConversionJob};
