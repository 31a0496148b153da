/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::session::SessionSummary;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // 测试中可能被多次调用，忽略重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考试作答模式");
    info!(
        "🕐 启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🌐 考试引擎: {}", config.api_base_url);
    info!("👤 用户: {}", config.user_id);
    match &config.test_id {
        Some(test_id) => info!("📄 考试: {}", test_id),
        None => info!("📄 考试: 新建 {} 整卷", config.test_type),
    }
    info!("{}", "=".repeat(60));
}

/// 打印作答统计
pub fn log_summary(summary: &SessionSummary) {
    info!("\n{}", "=".repeat(60));
    info!("📊 作答统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已答: {}/{}", summary.answered, summary.total);
    info!("🔖 标记: {}", summary.marked);
    info!("👀 未看: {}", summary.not_visited);
    if summary.pending_sync > 0 {
        info!("⚠️ 待同步: {}", summary.pending_sync);
    }
    info!("{}", "=".repeat(60));
}

/// 把秒数格式化为 `HH:MM:SS`
pub fn format_clock(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
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
    fn clock_format() {
        assert_eq!(format_clock(5400), "01:30:00");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(0), "00:00:00");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("物理化学", 2), "物理...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
