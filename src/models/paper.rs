use serde::{Deserialize, Serialize};

/// 后端生成的一道题
///
/// 没有稳定的 ID，选择时按题干文本判断是否为同一题。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    pub answer: String,
    pub marks: u32,
}

impl Question {
    pub fn new(text: impl Into<String>, answer: impl Into<String>, marks: u32) -> Self {
        Self {
            text: text.into(),
            answer: answer.into(),
            marks,
        }
    }

    /// 题干文本相同即视为同一题
    pub fn same_text(&self, other: &Question) -> bool {
        self.text == other.text
    }
}

/// 生成结果中的一个大题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSection {
    pub name: String,
    pub questions: Vec<Question>,
}

/// 后端返回的整张试卷
///
/// 大题和题目的顺序以后端为准，客户端不重排也不校验分值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPaper {
    pub school_name: String,
    pub paper_title: String,
    pub max_marks: u32,
    pub sections: Vec<PaperSection>,
}

impl GeneratedPaper {
    /// 题目总数
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    /// 按"大题 -> 题目"顺序遍历所有题目
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    /// 按全局序号（从 1 开始）取题
    pub fn question_at(&self, number: usize) -> Option<&Question> {
        number.checked_sub(1).and_then(|idx| self.questions().nth(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "school_name": "Oak High",
        "paper_title": "Final Term Examination: Physics",
        "max_marks": 50,
        "sections": [
            {"name": "A", "questions": [
                {"question": "Define inertia.", "answer": "Resistance to change in motion.", "marks": 5},
                {"question": "State Ohm's law.", "answer": "V = IR", "marks": 5}
            ]},
            {"name": "B", "questions": [
                {"question": "Derive the lens formula.", "answer": "...", "marks": 10}
            ]}
        ]
    }"#;

    #[test]
    fn parses_backend_response() {
        let paper: GeneratedPaper = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(paper.school_name, "Oak High");
        assert_eq!(paper.sections.len(), 2);
        assert_eq!(paper.question_count(), 3);
        assert_eq!(paper.sections[0].questions[1].text, "State Ohm's law.");
    }

    #[test]
    fn global_numbering_runs_across_sections() {
        let paper: GeneratedPaper = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(
            paper.question_at(3).map(|q| q.text.as_str()),
            Some("Derive the lens formula.")
        );
        assert!(paper.question_at(0).is_none());
        assert!(paper.question_at(4).is_none());
    }
}
