//! 已选题目
//!
//! 按加入顺序保存，按题干文本判断是否已选。两道题干相同的题目无法
//! 区分，会一起被选中或取消。

use crate::models::paper::{GeneratedPaper, Question};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectedQuestions {
    items: Vec<Question>,
}

impl SelectedQuestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换一道题的选中状态，返回新的选择
    ///
    /// 已选（按文本）则移除所有同文本的题，否则追加到末尾。
    pub fn toggle(&self, question: &Question) -> Self {
        if self.contains(question) {
            Self {
                items: self
                    .items
                    .iter()
                    .filter(|q| !q.same_text(question))
                    .cloned()
                    .collect(),
            }
        } else {
            let mut items = self.items.clone();
            items.push(question.clone());
            Self { items }
        }
    }

    /// 选中试卷中的全部题目（大题顺序，再按题目顺序）
    pub fn select_all(paper: &GeneratedPaper) -> Self {
        paper
            .questions()
            .fold(Self::new(), |selected, q| {
                if selected.contains(q) {
                    selected
                } else {
                    selected.toggle(q)
                }
            })
    }

    pub fn contains(&self, question: &Question) -> bool {
        self.items.iter().any(|q| q.same_text(question))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.items
    }

    /// 已选题目的总分
    pub fn total_marks(&self) -> u64 {
        self.items.iter().map(|q| u64::from(q.marks)).sum()
    }
}

impl<'a> IntoIterator for &'a SelectedQuestions {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
