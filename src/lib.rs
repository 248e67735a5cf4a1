//! # Paper Wizard
//!
//! 一个按步骤收集试卷配置、请求生成服务出题、挑选题目并导出 PDF 的
//! Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 向导输入、生成的试卷、已选题目
//! - `WizardState` - 向导累积的全部输入，只通过补丁整体替换
//! - `SelectedQuestions` - 按题干文本判断是否已选
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心当前步骤
//! - `FormStateStore` - 持有唯一的向导状态
//! - `PdfTextExtractor` - 提取大纲 PDF 的文本
//! - `PaperGenerationClient` - 请求生成接口
//! - `PaperSurface` / `PdfExporter` - 渲染试卷并分页导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义向导的步骤和校验
//! - `WizardStep` - 五个固定顺序的步骤
//! - `WizardController` - 步骤切换（校验 → 前进 / 停留）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/wizard_session` - 一次完整的终端会话
//! - `orchestrator/commands` - 交互命令解析
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GeneratedPaper, Question, SelectedQuestions, WizardState};
pub use orchestrator::App;
pub use services::{FormStateStore, PaperGenerationClient, PaperSurface, PdfExporter, PdfTextExtractor};
pub use workflow::{WizardController, WizardStep};
