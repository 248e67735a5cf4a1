//! 表单状态存储 - 业务能力层
//!
//! 持有向导的唯一状态值。所有修改都由旧状态计算出一个完整的新状态再
//! 整体替换，不在原地修改嵌套容器。

use tracing::debug;

use crate::error::ValidationError;
use crate::models::wizard_state::{
    parse_mark_value, parse_question_count, Section, SectionPatch, WizardPatch, WizardState,
};
use crate::models::{GeneratedPaper, Question, SelectedQuestions};

/// 表单状态存储
///
/// 除向导输入外，还保存最近一次生成的试卷和已选题目。设置新试卷时
/// 已选题目会被清空。
#[derive(Debug, Clone, Default)]
pub struct FormStateStore {
    state: WizardState,
    paper: Option<GeneratedPaper>,
    selected: SelectedQuestions,
}

impl FormStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: WizardState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// 当前状态
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// 用补丁生成新状态并替换
    pub fn replace(&mut self, patch: WizardPatch) -> &WizardState {
        self.state = self.state.apply(patch);
        &self.state
    }

    /// 以文本形式设置满分，无法解析时为 0
    pub fn set_max_marks_input(&mut self, input: &str) -> &WizardState {
        let max_marks = input.trim().parse::<u32>().unwrap_or(0);
        self.replace(WizardPatch::default().max_marks(max_marks))
    }

    // ========== 大题操作 ==========

    /// 追加一个默认大题
    pub fn add_section(&mut self) -> &WizardState {
        let mut sections = self.state.sections.clone();
        sections.push(Section::default_for_position(sections.len()));
        self.replace(WizardPatch::default().sections(sections))
    }

    /// 按位置删除大题
    pub fn remove_section(&mut self, index: usize) -> Result<&WizardState, ValidationError> {
        self.check_section_index(index)?;
        let sections = self
            .state
            .sections
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, s)| s.clone())
            .collect();
        Ok(self.replace(WizardPatch::default().sections(sections)))
    }

    /// 修改大题名称或难度
    pub fn update_section(
        &mut self,
        index: usize,
        patch: SectionPatch,
    ) -> Result<&WizardState, ValidationError> {
        self.map_section(index, |section| section.apply(patch))
    }

    /// 新增一个分值，默认 1 道题
    ///
    /// 输入不是正整数或分值已存在时不做任何修改。
    pub fn add_mark_value(
        &mut self,
        index: usize,
        input: &str,
    ) -> Result<&WizardState, ValidationError> {
        self.check_section_index(index)?;
        let Some(mark) = parse_mark_value(input) else {
            debug!("忽略非数字分值: {:?}", input);
            return Ok(&self.state);
        };
        if self.state.sections[index].marks_distribution.contains(mark) {
            debug!("分值 {} 已存在，忽略", mark);
            return Ok(&self.state);
        }
        self.map_section(index, |section| Section {
            marks_distribution: section.marks_distribution.with_count(mark, 1),
            ..section.clone()
        })
    }

    /// 设置某个分值的题目数量（文本输入，负数或无法解析时取 0）
    ///
    /// 只修改已有的分值，新分值必须先经 `add_mark_value` 添加。
    pub fn set_mark_count(
        &mut self,
        index: usize,
        mark: u32,
        count_input: &str,
    ) -> Result<&WizardState, ValidationError> {
        self.check_section_index(index)?;
        if !self.state.sections[index].marks_distribution.contains(mark) {
            debug!("分值 {} 不存在，忽略数量修改", mark);
            return Ok(&self.state);
        }
        let count = parse_question_count(count_input);
        self.map_section(index, |section| Section {
            marks_distribution: section.marks_distribution.with_count(mark, count),
            ..section.clone()
        })
    }

    /// 删除一个分值
    pub fn remove_mark_value(
        &mut self,
        index: usize,
        mark: u32,
    ) -> Result<&WizardState, ValidationError> {
        self.map_section(index, |section| Section {
            marks_distribution: section.marks_distribution.without(mark),
            ..section.clone()
        })
    }

    // ========== 试卷与选题 ==========

    pub fn paper(&self) -> Option<&GeneratedPaper> {
        self.paper.as_ref()
    }

    pub fn selected(&self) -> &SelectedQuestions {
        &self.selected
    }

    /// 设置新试卷（整体替换），同时清空已选题目
    pub fn set_paper(&mut self, paper: Option<GeneratedPaper>) {
        self.paper = paper;
        self.selected = SelectedQuestions::new();
    }

    /// 切换一道题的选中状态
    pub fn toggle_question(&mut self, question: &Question) -> &SelectedQuestions {
        self.selected = self.selected.toggle(question);
        &self.selected
    }

    /// 选中当前试卷的全部题目
    pub fn select_all(&mut self) -> Result<&SelectedQuestions, ValidationError> {
        let paper = self.paper.as_ref().ok_or(ValidationError::NoGeneratedPaper)?;
        self.selected = SelectedQuestions::select_all(paper);
        Ok(&self.selected)
    }

    fn check_section_index(&self, index: usize) -> Result<(), ValidationError> {
        let len = self.state.sections.len();
        if index >= len {
            return Err(ValidationError::SectionIndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn map_section(
        &mut self,
        index: usize,
        f: impl FnOnce(&Section) -> Section,
    ) -> Result<&WizardState, ValidationError> {
        self.check_section_index(index)?;
        let mut sections = self.state.sections.clone();
        sections[index] = f(&self.state.sections[index]);
        Ok(self.replace(WizardPatch::default().sections(sections)))
    }
}
