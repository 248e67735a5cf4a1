//! 流程层（Workflow）
//!
//! 定义向导"一步一步"的推进规则，只依赖业务能力（services）。

pub mod wizard_controller;
pub mod wizard_step;

pub use wizard_controller::WizardController;
pub use wizard_step::WizardStep;
