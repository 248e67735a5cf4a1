use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{GeneratedPaper, SelectedQuestions, WizardState};

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`，未设置时按 `verbose` 选择 debug 或 info。
/// 重复调用不会报错，测试里可以放心使用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n试卷向导日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 试卷生成向导");
    info!("🌐 生成接口: {}", config.backend_url);
    match config.request_timeout() {
        Some(limit) => info!("⏱️ 请求超时: {} 秒", limit.as_secs()),
        None => info!("⏱️ 请求超时: 不限"),
    }
    info!("📝 草稿文件: {}", config.draft_file);
    info!("{}", "=".repeat(60));
}

/// 记录向导输入摘要
pub fn log_wizard_summary(state: &WizardState) {
    info!("🏫 学校: {}", state.school_name);
    info!(
        "📊 满分: {} | 难度: {}",
        state.max_marks, state.overall_difficulty
    );
    for section in &state.sections {
        let distribution = section
            .marks_distribution
            .iter()
            .map(|(mark, count)| format!("{}分×{}", mark, count))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "  📁 {} ({}): {}",
            section.name, section.difficulty, distribution
        );
    }
    info!("{}", state.marks_budget());
}

/// 打印生成的试卷预览
///
/// 方括号内为全局编号（选题命令使用），`Q<n>` 为大题内编号，
/// `[x]` 表示已选中。
pub fn log_paper_preview(paper: &GeneratedPaper, selected: &SelectedQuestions, show_answers: bool) {
    info!("\n{}", "─".repeat(60));
    info!("📄 {} - {}", paper.school_name, paper.paper_title);
    info!("满分: {}", paper.max_marks);
    info!("{}", "─".repeat(60));

    let mut number = 0;
    for section in &paper.sections {
        info!("📁 {}", section.name);
        for (idx, question) in section.questions.iter().enumerate() {
            number += 1;
            let mark = if selected.contains(question) { "x" } else { " " };
            info!(
                "  [{}] {:>3} Q{}. ({} marks) {}",
                mark,
                number,
                idx + 1,
                question.marks,
                truncate_text(&question.text, 80)
            );
            if show_answers && !question.answer.is_empty() {
                info!("         Answer: {}", truncate_text(&question.answer, 80));
            }
        }
    }
    info!("{}", "─".repeat(60));
    info!("已选 {} 道题，共 {} 分", selected.len(), selected.total_marks());
}

/// 打印最终结果
pub fn print_final_stats(selected: usize, pages: usize, pdf_path: &str, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 导出完成");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已选题目: {}", selected);
    info!("📄 PDF 页数: {}", pages);
    info!("💾 PDF 文件: {}", pdf_path);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
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
