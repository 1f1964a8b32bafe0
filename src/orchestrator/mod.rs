//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责流程调度和统计，不做具体的文档处理。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 根据子命令选择手动 / 推断 / 转换流程
//! - 按需创建 LLM 客户端（先确认 API 密钥）
//! - 读取标准输入
//!
//! ### `conversion_batch` - 批量转换
//! - 按编号顺序转换 Markdown 文件
//! - 区分整批致命错误和单项失败
//! - 输出统计信息
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一个子命令)
//!     ↓
//! conversion_batch (处理一段编号范围)
//!     ↓
//! services (能力层：extract / synthesize / cleanup / convert)
//!     ↓
//! clients (LLM 客户端)
//! ```

pub mod app;
pub mod conversion_batch;

// 重新导出主要类型
pub use app::{read_manual_aims, App};
pub use conversion_batch::{convert_batch, BatchHalt, BatchReport, ConversionJob, ItemOutcome};
