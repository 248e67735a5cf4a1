//! 向导表单数据
//!
//! 所有类型都是普通的值类型：修改总是产生新值，旧快照不会被改动。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::models::difficulty::Difficulty;

/// 分值分布：分值 -> 题目数量
///
/// 分值按数字升序排列；序列化时分值写成字符串键（`{"5": 2}`）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarksDistribution(BTreeMap<u32, u32>);

impl MarksDistribution {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 某个分值的题目数量
    pub fn count(&self, mark: u32) -> Option<u32> {
        self.0.get(&mark).copied()
    }

    pub fn contains(&self, mark: u32) -> bool {
        self.0.contains_key(&mark)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按分值升序遍历 (分值, 数量)
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(mark, count)| (*mark, *count))
    }

    /// 返回设置了新数量的分布
    pub fn with_count(&self, mark: u32, count: u32) -> Self {
        let mut next = self.0.clone();
        next.insert(mark, count);
        Self(next)
    }

    /// 返回移除了某个分值的分布
    pub fn without(&self, mark: u32) -> Self {
        let mut next = self.0.clone();
        next.remove(&mark);
        Self(next)
    }

    /// 加权总分：Σ 分值 × 数量
    pub fn weighted_total(&self) -> u64 {
        self.0
            .iter()
            .map(|(mark, count)| u64::from(*mark) * u64::from(*count))
            .sum()
    }
}

impl<const N: usize> From<[(u32, u32); N]> for MarksDistribution {
    fn from(entries: [(u32, u32); N]) -> Self {
        Self(BTreeMap::from(entries))
    }
}

impl Serialize for MarksDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (mark, count) in &self.0 {
            map.serialize_entry(&mark.to_string(), count)?;
        }
        map.end()
    }
}

// 键总是字符串（JSON 对象和 TOML 表都如此），在这里解析成分值
impl<'de> Deserialize<'de> for MarksDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = MarksDistribution;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map from mark value to question count")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                while let Some((key, count)) = access.next_entry::<String, u32>()? {
                    let mark = parse_mark_value(&key).ok_or_else(|| {
                        serde::de::Error::custom(format!("分值必须是正整数: '{}'", key))
                    })?;
                    entries.insert(mark, count);
                }
                Ok(MarksDistribution(entries))
            }
        }

        deserializer.deserialize_map(DistributionVisitor)
    }
}

/// 把用户输入的分值解析为正整数
///
/// 允许首尾空白，不接受小数、负数和 0。
pub fn parse_mark_value(input: &str) -> Option<u32> {
    let pattern = Regex::new(r"^\s*\+?(\d+)\s*$").ok()?;
    let captures = pattern.captures(input)?;
    let mark: u32 = captures.get(1)?.as_str().parse().ok()?;
    (mark > 0).then_some(mark)
}

/// 把题目数量输入解析为非负整数，无法解析或为负时取 0
pub fn parse_question_count(input: &str) -> u32 {
    let trimmed = input.trim();
    // 与 parseInt 一致：只看开头的整数部分
    let end = trimmed
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end]
        .parse::<i64>()
        .ok()
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// 试卷的一个大题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub marks_distribution: MarksDistribution,
}

impl Section {
    pub fn new(
        name: impl Into<String>,
        difficulty: Difficulty,
        marks_distribution: MarksDistribution,
    ) -> Self {
        Self {
            name: name.into(),
            difficulty,
            marks_distribution,
        }
    }

    /// 新增大题时使用的默认值，名称按已有数量取字母
    pub fn default_for_position(position: usize) -> Self {
        let letter = u8::try_from(position)
            .ok()
            .and_then(|p| b'A'.checked_add(p))
            .map(char::from)
            .unwrap_or('?');
        Self::new(
            format!("Section {}", letter),
            Difficulty::Medium,
            MarksDistribution::from([(5, 2)]),
        )
    }

    pub fn weighted_total(&self) -> u64 {
        self.marks_distribution.weighted_total()
    }
}

/// 上传的教学大纲文件
///
/// 内容放在 `Arc` 中，复制状态快照时不会复制文件字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyllabusFile {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl SyllabusFile {
    /// 建议的大小上限（10MB）
    pub const SOFT_LIMIT_BYTES: usize = 10 * 1024 * 1024;

    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn exceeds_soft_limit(&self) -> bool {
        self.len() > Self::SOFT_LIMIT_BYTES
    }
}

/// 向导累积的全部输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub school_name: String,
    pub max_marks: u32,
    pub overall_difficulty: Difficulty,
    pub syllabus_text: String,
    pub syllabus_file: Option<SyllabusFile>,
    pub sections: Vec<Section>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            school_name: String::new(),
            max_marks: 100,
            overall_difficulty: Difficulty::Medium,
            syllabus_text: String::new(),
            syllabus_file: None,
            sections: vec![Section::new(
                "Section A",
                Difficulty::Medium,
                MarksDistribution::from([(2, 5), (5, 5)]),
            )],
        }
    }
}

impl WizardState {
    /// 所有大题的加权总分
    pub fn weighted_total(&self) -> u64 {
        self.sections.iter().map(Section::weighted_total).sum()
    }

    /// 基本信息：学校名非空且满分大于 0
    pub fn validate_basic_info(&self) -> Result<(), ValidationError> {
        if self.school_name.trim().is_empty() {
            return Err(ValidationError::MissingSchoolName);
        }
        if self.max_marks == 0 {
            return Err(ValidationError::NonPositiveMaxMarks);
        }
        Ok(())
    }

    /// 大纲：文本或文件至少提供一个
    pub fn validate_syllabus(&self) -> Result<(), ValidationError> {
        if self.syllabus_text.trim().is_empty() && self.syllabus_file.is_none() {
            return Err(ValidationError::MissingSyllabus);
        }
        Ok(())
    }

    /// 大题：至少一个，且加权总分为正
    ///
    /// 不与满分比较，总分和满分可以不一致。
    pub fn validate_sections(&self) -> Result<(), ValidationError> {
        if self.sections.is_empty() {
            return Err(ValidationError::NoSections);
        }
        if self.weighted_total() == 0 {
            return Err(ValidationError::ZeroWeightedMarks);
        }
        Ok(())
    }

    /// 生成前需要前三步全部通过
    pub fn ready_for_generation(&self) -> bool {
        self.validate_basic_info().is_ok()
            && self.validate_syllabus().is_ok()
            && self.validate_sections().is_ok()
    }

    pub fn marks_budget(&self) -> MarksBudget {
        MarksBudget {
            used: self.weighted_total(),
            max: self.max_marks,
        }
    }

    /// 应用补丁，返回新的状态
    pub fn apply(&self, patch: WizardPatch) -> Self {
        Self {
            school_name: patch.school_name.unwrap_or_else(|| self.school_name.clone()),
            max_marks: patch.max_marks.unwrap_or(self.max_marks),
            overall_difficulty: patch.overall_difficulty.unwrap_or(self.overall_difficulty),
            syllabus_text: patch
                .syllabus_text
                .unwrap_or_else(|| self.syllabus_text.clone()),
            syllabus_file: patch
                .syllabus_file
                .unwrap_or_else(|| self.syllabus_file.clone()),
            sections: patch.sections.unwrap_or_else(|| self.sections.clone()),
        }
    }
}

/// 向导状态的部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct WizardPatch {
    pub school_name: Option<String>,
    pub max_marks: Option<u32>,
    pub overall_difficulty: Option<Difficulty>,
    pub syllabus_text: Option<String>,
    /// `Some(None)` 表示移除已上传的文件
    pub syllabus_file: Option<Option<SyllabusFile>>,
    pub sections: Option<Vec<Section>>,
}

impl WizardPatch {
    pub fn school_name(mut self, value: impl Into<String>) -> Self {
        self.school_name = Some(value.into());
        self
    }

    pub fn max_marks(mut self, value: u32) -> Self {
        self.max_marks = Some(value);
        self
    }

    pub fn overall_difficulty(mut self, value: Difficulty) -> Self {
        self.overall_difficulty = Some(value);
        self
    }

    pub fn syllabus_text(mut self, value: impl Into<String>) -> Self {
        self.syllabus_text = Some(value.into());
        self
    }

    pub fn syllabus_file(mut self, value: Option<SyllabusFile>) -> Self {
        self.syllabus_file = Some(value);
        self
    }

    pub fn sections(mut self, value: Vec<Section>) -> Self {
        self.sections = Some(value);
        self
    }
}

/// 大题字段的部分更新
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl Section {
    pub fn apply(&self, patch: SectionPatch) -> Self {
        Self {
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            difficulty: patch.difficulty.unwrap_or(self.difficulty),
            marks_distribution: self.marks_distribution.clone(),
        }
    }
}

/// 已分配分数与满分的对比，仅作提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarksBudget {
    pub used: u64,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Remaining(u64),
    Over(u64),
    Exact,
}

impl MarksBudget {
    pub fn status(&self) -> BudgetStatus {
        let max = u64::from(self.max);
        if self.used < max {
            BudgetStatus::Remaining(max - self.used)
        } else if self.used > max {
            BudgetStatus::Over(self.used - max)
        } else {
            BudgetStatus::Exact
        }
    }
}

impl fmt::Display for MarksBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marks Used: {} / {}", self.used, self.max)?;
        match self.status() {
            BudgetStatus::Remaining(left) => write!(f, " (Remaining: {})", left),
            BudgetStatus::Over(over) => write!(f, " (Over by {})", over),
            BudgetStatus::Exact => write!(f, " (Perfect!)"),
        }
    }
}
