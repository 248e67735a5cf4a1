//! 试卷渲染 - 业务能力层
//!
//! 把已选题目渲染成可编辑的试卷表面（`PaperSurface`），并能按给定
//! 倍率"截图"成设备像素坐标下的快照（`Snapshot`），供导出分页使用。
//!
//! 版式：
//! - 居中加粗的学校名（16pt）
//! - 一行表头：左侧科目占位，右侧满分
//! - 一条分隔线
//! - 按选择顺序编号的题目，分值靠右

use crate::error::ValidationError;
use crate::models::SelectedQuestions;

/// 正文字号（12pt，单位 CSS 像素）
const BODY_SIZE: f32 = 16.0;
/// 标题字号（16pt）
const TITLE_SIZE: f32 = 21.333;
const LINE_HEIGHT: f32 = 1.5;
const PADDING: f32 = 32.0;
const HEADER_MARGIN: f32 = 20.0;
const RULE_MARGIN: f32 = 20.0;
const QUESTION_SPACING: f32 = 15.0;
/// 题干与右侧分值之间的间隔
const MARKS_GUTTER: f32 = 12.0;
/// Times 字体的平均字宽（以字号为单位）
const AVG_GLYPH_WIDTH: f32 = 0.5;
const AVG_BOLD_GLYPH_WIDTH: f32 = 0.53;

pub const SUBJECT_PLACEHOLDER: &str = "Subject: __________________";

/// 试卷表面上的一个块
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// 居中标题
    Title(String),
    /// 左右两端对齐的表头
    HeaderRow { left: String, right: String },
    /// 分隔线
    Rule,
    /// 一道题
    Question {
        number: usize,
        text: String,
        marks: u32,
    },
    /// 用户插入的自由文本
    Paragraph(String),
}

/// 可编辑的试卷表面
///
/// 渲染后可以任意修改，修改不会回写到已选题目。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaperSurface {
    blocks: Vec<Block>,
}

impl PaperSurface {
    /// 按固定版式渲染
    pub fn render(school_name: &str, max_marks: u32, selected: &SelectedQuestions) -> Self {
        let mut blocks = vec![
            Block::Title(school_name.to_string()),
            Block::HeaderRow {
                left: SUBJECT_PLACEHOLDER.to_string(),
                right: format!("Max. Marks: {}", max_marks),
            },
            Block::Rule,
        ];
        blocks.extend(
            selected
                .iter()
                .enumerate()
                .map(|(idx, q)| Block::Question {
                    number: idx + 1,
                    text: q.text.clone(),
                    marks: q.marks,
                }),
        );
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 替换某个块的文字
    ///
    /// 表头替换左侧文字；分隔线没有文字可改。
    pub fn edit_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), ValidationError> {
        let len = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(ValidationError::BlockOutOfRange { index, len })?;
        let text = text.into();
        match block {
            Block::Title(current) | Block::Paragraph(current) => *current = text,
            Block::HeaderRow { left, .. } => *left = text,
            Block::Question { text: current, .. } => *current = text,
            Block::Rule => return Err(ValidationError::BlockNotEditable { index }),
        }
        Ok(())
    }

    /// 在指定位置插入块（index 可以等于长度，表示追加）
    pub fn insert_block(&mut self, index: usize, block: Block) -> Result<(), ValidationError> {
        let len = self.blocks.len();
        if index > len {
            return Err(ValidationError::BlockOutOfRange { index, len });
        }
        self.blocks.insert(index, block);
        Ok(())
    }

    pub fn remove_block(&mut self, index: usize) -> Result<Block, ValidationError> {
        let len = self.blocks.len();
        if index >= len {
            return Err(ValidationError::BlockOutOfRange { index, len });
        }
        Ok(self.blocks.remove(index))
    }

    /// 纯文本预览，每个块一行，按 `width` 个字符排版
    pub fn to_plain_text(&self, width: usize) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Title(text) => {
                    let pad = width.saturating_sub(text.chars().count()) / 2;
                    out.push_str(&" ".repeat(pad));
                    out.push_str(text);
                }
                Block::HeaderRow { left, right } => {
                    let gap = width
                        .saturating_sub(left.chars().count() + right.chars().count())
                        .max(1);
                    out.push_str(left);
                    out.push_str(&" ".repeat(gap));
                    out.push_str(right);
                }
                Block::Rule => out.push_str(&"-".repeat(width)),
                Block::Question {
                    number,
                    text,
                    marks,
                } => {
                    out.push_str(&format!("Q{}. {} ({})", number, text, marks));
                }
                Block::Paragraph(text) => out.push_str(text),
            }
            out.push('\n');
        }
        out
    }

    /// 按倍率截图成快照
    ///
    /// `width` 为表面的 CSS 像素宽度，`scale` 为设备像素比。
    pub fn capture(&self, width: f32, scale: f32) -> Snapshot {
        let mut layout = Layout::new(width);
        for block in &self.blocks {
            layout.place(block);
        }
        layout.finish(scale)
    }
}

/// 快照中的一段文字，坐标为设备像素，`baseline` 自顶部量起
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub x: f32,
    pub baseline: f32,
    pub size: f32,
    pub bold: bool,
    pub text: String,
}

/// 快照中的一条水平线
#[derive(Debug, Clone, PartialEq)]
pub struct RuleItem {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
    pub thickness: f32,
}

/// 试卷表面的截图
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub texts: Vec<TextItem>,
    pub rules: Vec<RuleItem>,
}

impl Snapshot {
    /// 宽高比
    pub fn ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// 估算一段文字的宽度（CSS 像素）
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let factor = if bold {
        AVG_BOLD_GLYPH_WIDTH
    } else {
        AVG_GLYPH_WIDTH
    };
    text.chars().count() as f32 * size * factor
}

/// 贪心折行；单个超长单词按字符强制断开，保留原有换行
pub fn wrap_text(text: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if text_width(&candidate, size, bold) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            // 单词本身放不下一行
            for ch in word.chars() {
                line.push(ch);
                if text_width(&line, size, bold) > max_width && line.chars().count() > 1 {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        lines.push(line);
    }
    lines
}

struct Layout {
    width: f32,
    cursor: f32,
    texts: Vec<TextItem>,
    rules: Vec<RuleItem>,
}

impl Layout {
    fn new(width: f32) -> Self {
        Self {
            width,
            cursor: PADDING,
            texts: Vec::new(),
            rules: Vec::new(),
        }
    }

    fn content_width(&self) -> f32 {
        (self.width - 2.0 * PADDING).max(1.0)
    }

    fn baseline_in_line(&self, size: f32) -> f32 {
        let line_height = size * LINE_HEIGHT;
        self.cursor + (line_height - size) / 2.0 + size * 0.8
    }

    fn push_text(&mut self, x: f32, size: f32, bold: bool, text: String) {
        let baseline = self.baseline_in_line(size);
        self.texts.push(TextItem {
            x,
            baseline,
            size,
            bold,
            text,
        });
    }

    fn place(&mut self, block: &Block) {
        let left = PADDING;
        let right = self.width - PADDING;
        match block {
            Block::Title(text) => {
                for line in wrap_text(text, self.content_width(), TITLE_SIZE, true) {
                    let x = left + (self.content_width() - text_width(&line, TITLE_SIZE, true)) / 2.0;
                    self.push_text(x.max(left), TITLE_SIZE, true, line);
                    self.cursor += TITLE_SIZE * LINE_HEIGHT;
                }
            }
            Block::HeaderRow { left: l, right: r } => {
                self.cursor += HEADER_MARGIN;
                let right_width = text_width(r, BODY_SIZE, true);
                self.push_text(left, BODY_SIZE, true, l.clone());
                self.push_text(right - right_width, BODY_SIZE, true, r.clone());
                self.cursor += BODY_SIZE * LINE_HEIGHT + HEADER_MARGIN;
            }
            Block::Rule => {
                self.cursor += RULE_MARGIN;
                self.rules.push(RuleItem {
                    x1: left,
                    x2: right,
                    y: self.cursor,
                    thickness: 1.0,
                });
                self.cursor += 1.0 + RULE_MARGIN;
            }
            Block::Question {
                number,
                text,
                marks,
            } => {
                let label = format!("({})", marks);
                let label_width = text_width(&label, BODY_SIZE, false);
                let available = self.content_width() - label_width - MARKS_GUTTER;
                let numbered = format!("Q{}. {}", number, text);
                let lines = wrap_text(&numbered, available.max(BODY_SIZE), BODY_SIZE, false);

                self.push_text(right - label_width, BODY_SIZE, false, label);
                for line in lines {
                    self.push_text(left, BODY_SIZE, false, line);
                    self.cursor += BODY_SIZE * LINE_HEIGHT;
                }
                self.cursor += QUESTION_SPACING;
            }
            Block::Paragraph(text) => {
                for line in wrap_text(text, self.content_width(), BODY_SIZE, false) {
                    self.push_text(left, BODY_SIZE, false, line);
                    self.cursor += BODY_SIZE * LINE_HEIGHT;
                }
                self.cursor += QUESTION_SPACING;
            }
        }
    }

    fn finish(self, scale: f32) -> Snapshot {
        let height = self.cursor + PADDING;
        Snapshot {
            width: self.width * scale,
            height: height * scale,
            scale,
            texts: self
                .texts
                .into_iter()
                .map(|t| TextItem {
                    x: t.x * scale,
                    baseline: t.baseline * scale,
                    size: t.size * scale,
                    ..t
                })
                .collect(),
            rules: self
                .rules
                .into_iter()
                .map(|r| RuleItem {
                    x1: r.x1 * scale,
                    x2: r.x2 * scale,
                    y: r.y * scale,
                    thickness: r.thickness * scale,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;

    fn selection() -> SelectedQuestions {
        SelectedQuestions::new()
            .toggle(&Question::new("State Newton's first law.", "...", 2))
            .toggle(&Question::new("Explain refraction.", "...", 5))
    }

    #[test]
    fn renders_fixed_layout_in_selection_order() {
        let surface = PaperSurface::render("Oak High", 50, &selection());
        let blocks = surface.blocks();
        assert_eq!(blocks[0], Block::Title("Oak High".into()));
        assert_eq!(
            blocks[1],
            Block::HeaderRow {
                left: SUBJECT_PLACEHOLDER.into(),
                right: "Max. Marks: 50".into(),
            }
        );
        assert_eq!(blocks[2], Block::Rule);
        assert_eq!(
            blocks[4],
            Block::Question {
                number: 2,
                text: "Explain refraction.".into(),
                marks: 5,
            }
        );
    }

    #[test]
    fn edits_stay_on_the_surface() {
        let selected = selection();
        let mut surface = PaperSurface::render("Oak High", 50, &selected);
        surface.edit_text(1, "Subject: Physics").unwrap();
        surface.edit_text(3, "State Newton's first law with an example.").unwrap();

        assert!(surface.to_plain_text(60).contains("Subject: Physics"));
        assert_eq!(selected.as_slice()[0].text, "State Newton's first law.");

        assert_eq!(
            surface.edit_text(2, "x"),
            Err(ValidationError::BlockNotEditable { index: 2 })
        );
        assert_eq!(
            surface.edit_text(9, "x"),
            Err(ValidationError::BlockOutOfRange { index: 9, len: 5 })
        );
    }

    #[test]
    fn insert_and_remove_blocks() {
        let mut surface = PaperSurface::render("Oak High", 50, &selection());
        surface
            .insert_block(3, Block::Paragraph("Answer all questions.".into()))
            .unwrap();
        assert_eq!(surface.blocks().len(), 6);
        let removed = surface.remove_block(3).unwrap();
        assert_eq!(removed, Block::Paragraph("Answer all questions.".into()));
        assert!(surface.insert_block(99, Block::Rule).is_err());
    }

    #[test]
    fn plain_text_preview_numbers_questions() {
        let surface = PaperSurface::render("Oak High", 50, &selection());
        let text = surface.to_plain_text(40);
        assert!(text.contains("Q1. State Newton's first law. (2)"));
        assert!(text.contains("Q2. Explain refraction. (5)"));
        assert!(text.lines().next().unwrap().trim() == "Oak High");
    }

    #[test]
    fn wrap_respects_width_and_long_words() {
        let lines = wrap_text("aaaa bbbb cccc", 9.0 * 8.0 * AVG_GLYPH_WIDTH, 8.0, false);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);

        let lines = wrap_text("abcdefgh", 4.0 * 8.0 * AVG_GLYPH_WIDTH, 8.0, false);
        assert_eq!(lines, vec!["abcd", "efgh"]);
    }

    #[test]
    fn capture_scales_every_coordinate() {
        let surface = PaperSurface::render("Oak High", 50, &selection());
        let one = surface.capture(794.0, 1.0);
        let two = surface.capture(794.0, 2.0);

        assert_eq!(two.width, one.width * 2.0);
        assert_eq!(two.height, one.height * 2.0);
        assert!((one.ratio() - two.ratio()).abs() < f32::EPSILON);
        assert_eq!(two.texts.len(), one.texts.len());
        assert_eq!(two.texts[0].size, one.texts[0].size * 2.0);
        assert_eq!(two.rules.len(), 1);
    }

    #[test]
    fn later_questions_sit_lower() {
        let snapshot = PaperSurface::render("Oak High", 50, &selection()).capture(794.0, 2.0);
        let q1 = snapshot.texts.iter().find(|t| t.text.starts_with("Q1.")).unwrap();
        let q2 = snapshot.texts.iter().find(|t| t.text.starts_with("Q2.")).unwrap();
        assert!(q2.baseline > q1.baseline);
        assert!(snapshot.height > q2.baseline);
    }
}
