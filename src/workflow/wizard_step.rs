//! 向导步骤
//!
//! 五个步骤按固定顺序排列，只能在相邻步骤之间移动。

use std::fmt::Display;

/// 向导步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WizardStep {
    #[default]
    BasicInfo,
    Syllabus,
    Sections,
    SelectQuestions,
    FinalizeExport,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::BasicInfo,
        WizardStep::Syllabus,
        WizardStep::Sections,
        WizardStep::SelectQuestions,
        WizardStep::FinalizeExport,
    ];

    /// 步骤条上显示的名称
    pub fn label(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic Info",
            WizardStep::Syllabus => "Syllabus",
            WizardStep::Sections => "Sections",
            WizardStep::SelectQuestions => "Select Questions",
            WizardStep::FinalizeExport => "Finalize & Export",
        }
    }

    /// 从 0 开始的序号
    pub fn index(self) -> usize {
        self as usize
    }

    /// 下一步，最后一步返回 None
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// 上一步，第一步返回 None
    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}] {}", self.index() + 1, Self::ALL.len(), self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_adjacent_only() {
        assert_eq!(WizardStep::BasicInfo.next(), Some(WizardStep::Syllabus));
        assert_eq!(WizardStep::FinalizeExport.next(), None);
        assert_eq!(WizardStep::BasicInfo.prev(), None);
        assert_eq!(
            WizardStep::FinalizeExport.prev(),
            Some(WizardStep::SelectQuestions)
        );
    }

    #[test]
    fn display_shows_position_and_label() {
        assert_eq!(
            WizardStep::FinalizeExport.to_string(),
            "[5/5] Finalize & Export"
        );
        assert_eq!(WizardStep::default(), WizardStep::BasicInfo);
    }
}
