//! 向导会话 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责驱动一次完整的向导流程。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建日志文件、记录启动信息、创建各项服务
//! 2. **加载草稿**：从 TOML 草稿填充前三步的输入
//! 3. **提取大纲**：草稿指定 PDF 时先提取文本
//! 4. **生成试卷**：请求生成接口，Ctrl-C 可取消等待
//! 5. **选题**：自动全选或在终端中交互选择
//! 6. **编辑与导出**：可选地修改试卷表面，然后保存 PDF
//!
//! ## 设计特点
//!
//! - **顶层编排**：不做任何校验，校验全部交给 `WizardController`
//! - **资源所有者**：唯一持有 HTTP 客户端和导出器的模块

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{load_draft, WizardState};
use crate::orchestrator::commands::{
    parse_selection_command, parse_surface_command, Prompt, SelectionCommand, SurfaceCommand,
    SELECTION_HELP, SURFACE_HELP,
};
use crate::services::{Block, PaperGenerationClient, PdfExporter, PdfTextExtractor};
use crate::utils::logging::{
    init_log_file, log_paper_preview, log_startup, log_wizard_summary, print_final_stats,
};
use crate::workflow::{WizardController, WizardStep};

/// 纯文本预览的宽度（字符）
const PREVIEW_WIDTH: usize = 72;

/// 选题阶段结束后的去向
enum SelectionOutcome {
    Continue,
    Regenerate,
}

/// 编辑阶段结束后的去向
enum SurfaceOutcome {
    Export,
    Back,
}

/// 应用主结构
pub struct App {
    config: Config,
    client: PaperGenerationClient,
    extractor: PdfTextExtractor,
    exporter: PdfExporter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;

        log_startup(&config);

        let client = PaperGenerationClient::new(&config);

        Ok(Self {
            config,
            client,
            extractor: PdfTextExtractor::new(),
            exporter: PdfExporter::new(),
        })
    }

    /// 运行应用主逻辑，交互输入来自标准输入
    pub async fn run(&self) -> Result<()> {
        let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()));
        self.run_with(&mut prompt).await
    }

    /// 使用给定的输入源运行
    pub async fn run_with<R>(&self, prompt: &mut Prompt<R>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut controller = self.load_controller().await?;

        // ========== 步骤 1-2: 基本信息与大纲 ==========
        controller
            .next()
            .with_context(|| format!("{} 未通过", WizardStep::BasicInfo))?;
        controller
            .next()
            .with_context(|| format!("{} 未通过", WizardStep::Syllabus))?;

        // ========== 步骤 3-5: 生成、选题、编辑 ==========
        loop {
            match controller.step() {
                WizardStep::Sections => self.generate(&mut controller, prompt).await?,
                WizardStep::SelectQuestions => {
                    if let SelectionOutcome::Regenerate =
                        self.select_questions(&mut controller, prompt).await?
                    {
                        controller.back();
                    }
                }
                WizardStep::FinalizeExport => match self.finalize(&mut controller, prompt).await? {
                    SurfaceOutcome::Export => break,
                    // 回到选题，保留当前试卷和选择
                    SurfaceOutcome::Back => {
                        controller.back();
                    }
                },
                other => bail!("向导停在了意外的步骤: {}", other),
            }
        }

        let output = PathBuf::from(&self.config.output_pdf);
        let summary = controller
            .export(&self.exporter, &output)
            .await
            .map_err(|e| anyhow!(e.user_message()))
            .context("导出 PDF 失败")?;

        print_final_stats(
            controller.selected().len(),
            summary.pages,
            &self.config.output_pdf,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 加载草稿并提取大纲 PDF
    async fn load_controller(&self) -> Result<WizardController> {
        info!("\n📁 正在加载向导草稿...");
        let draft = load_draft(Path::new(&self.config.draft_file)).await?;
        let state = WizardState::default().apply(draft.to_patch());
        let mut controller = WizardController::with_state(state);

        if let Some(path) = &draft.syllabus_file {
            // 提取失败不终止，仍可使用草稿中的文本
            if let Err(e) = controller
                .attach_syllabus_path(path, &self.extractor)
                .await
            {
                warn!("⚠️ {} ({})", e.user_message(), e);
            }
        }

        log_wizard_summary(controller.state());
        Ok(controller)
    }

    /// 提交生成请求，可重试的错误在交互模式下询问是否重试
    async fn generate<R>(&self, controller: &mut WizardController, prompt: &mut Prompt<R>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            info!("⏳ 正在生成试卷，按 Ctrl-C 取消等待...");
            let cancel = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let err = match controller.generate_cancellable(&self.client, cancel).await {
                Ok(_) => return Ok(()),
                Err(e) => e,
            };
            error!("❌ {}", err.user_message());

            if self.config.auto_select_all || !err.is_retryable() {
                bail!("{}", err.user_message());
            }
            let answer = prompt.ask("Retry generation? [y/N]").await?;
            if !matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
                bail!("{}", err.user_message());
            }
        }
    }

    /// 选题阶段，结束时已经进入 Finalize & Export（或要求重新生成）
    async fn select_questions<R>(
        &self,
        controller: &mut WizardController,
        prompt: &mut Prompt<R>,
    ) -> Result<SelectionOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        let paper = controller
            .paper()
            .cloned()
            .context("没有可供选择的试卷")?;

        if self.config.auto_select_all {
            controller.select_all().map_err(|e| anyhow!(e.user_message()))?;
            log_paper_preview(&paper, controller.selected(), self.config.verbose_logging);
            controller.next().context("无法进入导出步骤")?;
            return Ok(SelectionOutcome::Continue);
        }

        let mut show_answers = self.config.verbose_logging;
        log_paper_preview(&paper, controller.selected(), show_answers);
        println!("{}", SELECTION_HELP);

        loop {
            let Some(line) = prompt.ask(WizardStep::SelectQuestions.label()).await? else {
                bail!("输入已结束，未完成选题");
            };
            let command = match parse_selection_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };

            match command {
                SelectionCommand::Toggle(numbers) => {
                    for number in numbers {
                        if let Err(e) = controller.toggle_number(number) {
                            println!("{}", e.user_message());
                        }
                    }
                    println!(
                        "Selected {} question(s), {} marks",
                        controller.selected().len(),
                        controller.selected().total_marks()
                    );
                }
                SelectionCommand::All => {
                    controller.select_all().map_err(|e| anyhow!(e.user_message()))?;
                    log_paper_preview(&paper, controller.selected(), show_answers);
                }
                SelectionCommand::Answers => {
                    show_answers = !show_answers;
                    log_paper_preview(&paper, controller.selected(), show_answers);
                }
                SelectionCommand::Show => {
                    log_paper_preview(&paper, controller.selected(), show_answers);
                }
                SelectionCommand::Regenerate => return Ok(SelectionOutcome::Regenerate),
                SelectionCommand::Done => match controller.next() {
                    Ok(_) => return Ok(SelectionOutcome::Continue),
                    Err(e) => println!("{}", e),
                },
            }
        }
    }

    /// 编辑阶段，预览试卷表面并接受修改命令
    async fn finalize<R>(
        &self,
        controller: &mut WizardController,
        prompt: &mut Prompt<R>,
    ) -> Result<SurfaceOutcome>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.config.auto_select_all {
            return Ok(SurfaceOutcome::Export);
        }

        print_surface(controller);
        println!("{}", SURFACE_HELP);

        loop {
            let Some(line) = prompt.ask(WizardStep::FinalizeExport.label()).await? else {
                return Ok(SurfaceOutcome::Export);
            };
            let command = match parse_surface_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };

            let surface = controller
                .surface_mut()
                .context("试卷表面尚未渲染")?;
            let result = match command {
                SurfaceCommand::Export => return Ok(SurfaceOutcome::Export),
                SurfaceCommand::Back => return Ok(SurfaceOutcome::Back),
                SurfaceCommand::Show => Ok(()),
                SurfaceCommand::Edit(n, text) => surface.edit_text(n - 1, text),
                SurfaceCommand::Insert(n, text) => {
                    surface.insert_block(n - 1, Block::Paragraph(text))
                }
                SurfaceCommand::Remove(n) => surface.remove_block(n - 1).map(|_| ()),
            };
            match result {
                Ok(()) => print_surface(controller),
                Err(e) => println!("{}", e),
            }
        }
    }
}

/// 打印带块编号的纯文本预览
fn print_surface(controller: &WizardController) {
    let Some(surface) = controller.surface() else {
        return;
    };
    println!("{}", "─".repeat(PREVIEW_WIDTH + 5));
    for (idx, line) in surface.to_plain_text(PREVIEW_WIDTH).lines().enumerate() {
        println!("{:>3}  {}", idx + 1, line);
    }
    println!("{}", "─".repeat(PREVIEW_WIDTH + 5));
}
