/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::path::Path;
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `subject`: 科目名称
/// - `mode`: 运行模式
pub fn log_startup(subject: &str, mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 LabGen 启动 - {}", mode);
    info!("📚 科目: {}", subject);
    info!("{}", "=".repeat(60));
}

/// 记录转换批次开始信息
///
/// # 参数
/// - `first`: 起始实验编号
/// - `last`: 结束实验编号
/// - `source_dir`: Markdown 目录
/// - `dest_dir`: DOCX 输出目录
pub fn log_batch_start(first: u32, last: u32, source_dir: &Path, dest_dir: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始转换实验 {}-{}", first, last);
    info!("📁 源目录: {}", source_dir.display());
    info!("📄 输出目录: {}", dest_dir.display());
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `skipped`: 跳过数量（源文件不存在）
/// - `failed`: 失败数量
/// - `halted`: 是否被致命错误中止
pub fn print_final_stats(success: usize, skipped: usize, failed: usize, halted: bool) {
    info!("\n{}", "=".repeat(60));
    info!("📊 转换完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}", success);
    info!("⚠️  跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    if halted {
        info!("⛔ 批次被中止");
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
        assert_eq!(truncate_text("实验目的说明", 2), "实验...");
    }
}
