//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把一次向导会话从头跑到尾，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `wizard_session` - 向导会话
//! - 管理应用生命周期（初始化、运行）
//! - 加载草稿、提取大纲、请求生成
//! - 驱动选题和编辑两个交互阶段
//! - 导出 PDF 并输出统计信息
//!
//! ### `commands` - 终端命令
//! - 解析选题命令和编辑命令
//! - 从标准输入逐行读取
//!
//! ## 层次关系
//!
//! ```text
//! wizard_session (一次完整会话)
//!     ↓
//! workflow::WizardController (步骤与校验)
//!     ↓
//! services (能力层：表单 / 提取 / 生成 / 渲染 / 导出)
//!     ↓
//! models (数据层)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → models
//! 2. **无业务逻辑**：只做调度和输出，不做具体校验

pub mod commands;
pub mod wizard_session;

// 重新导出主要类型
pub use commands::{parse_selection_command, parse_surface_command, Prompt};
pub use wizard_session::App;
