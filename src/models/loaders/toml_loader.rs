use crate::models::difficulty::Difficulty;
use crate::models::wizard_state::{MarksDistribution, Section, WizardPatch};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// TOML 草稿中的大题
#[derive(Debug, Clone, Deserialize)]
pub struct DraftSection {
    pub name: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub marks_distribution: MarksDistribution,
}

impl From<DraftSection> for Section {
    fn from(draft: DraftSection) -> Self {
        Section::new(draft.name, draft.difficulty, draft.marks_distribution)
    }
}

/// TOML 草稿文件，缺省的字段保持向导默认值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WizardDraft {
    pub school_name: Option<String>,
    pub max_marks: Option<u32>,
    pub overall_difficulty: Option<Difficulty>,
    pub syllabus_text: Option<String>,
    /// 大纲 PDF 路径，相对路径以草稿文件所在目录为基准
    pub syllabus_file: Option<PathBuf>,
    pub sections: Option<Vec<DraftSection>>,
}

impl WizardDraft {
    /// 转换为向导补丁（不含文件，文件需要先经过提取）
    pub fn to_patch(&self) -> WizardPatch {
        WizardPatch {
            school_name: self.school_name.clone(),
            max_marks: self.max_marks,
            overall_difficulty: self.overall_difficulty,
            syllabus_text: self.syllabus_text.clone(),
            syllabus_file: None,
            sections: self
                .sections
                .clone()
                .map(|sections| sections.into_iter().map(Section::from).collect()),
        }
    }
}

/// 从 TOML 文件加载向导草稿
pub async fn load_draft(toml_file_path: &Path) -> Result<WizardDraft> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut draft = parse_draft(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    // 大纲文件路径相对于草稿文件
    if let Some(file) = draft.syllabus_file.take() {
        let resolved = if file.is_relative() {
            toml_file_path
                .parent()
                .map(|dir| dir.join(&file))
                .unwrap_or(file)
        } else {
            file
        };
        draft.syllabus_file = Some(resolved);
    }

    tracing::info!(
        "成功加载草稿: {} ({} 个大题)",
        toml_file_path.display(),
        draft.sections.as_ref().map_or(0, Vec::len)
    );

    Ok(draft)
}

/// 解析 TOML 草稿内容
pub fn parse_draft(content: &str) -> Result<WizardDraft> {
    let draft: WizardDraft = toml::from_str(content)?;
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAFT: &str = r#"
school_name = "Oak High"
max_marks = 50
overall_difficulty = "hard"
syllabus_text = "Kinematics, Optics"

[[sections]]
name = "A"
difficulty = "Easy"

[sections.marks_distribution]
"5" = 2
"10" = 4
"#;

    #[test]
    fn parses_full_draft() {
        let draft = parse_draft(DRAFT).unwrap();
        let patch = draft.to_patch();
        assert_eq!(patch.school_name.as_deref(), Some("Oak High"));
        assert_eq!(patch.max_marks, Some(50));
        assert_eq!(patch.overall_difficulty, Some(Difficulty::Hard));

        let sections = patch.sections.unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].difficulty, Difficulty::Easy);
        assert_eq!(sections[0].weighted_total(), 50);
    }

    #[test]
    fn missing_fields_stay_unset() {
        let draft = parse_draft("school_name = \"Elm Primary\"").unwrap();
        let patch = draft.to_patch();
        assert!(patch.max_marks.is_none());
        assert!(patch.sections.is_none());
    }

    #[test]
    fn rejects_non_numeric_mark_keys() {
        let bad = r#"
[[sections]]
name = "A"
[sections.marks_distribution]
"five" = 2
"#;
        assert!(parse_draft(bad).is_err());
    }

    #[tokio::test]
    async fn resolves_syllabus_path_relative_to_draft() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.toml");
        tokio::fs::write(&path, "syllabus_file = \"syllabus.pdf\"")
            .await
            .unwrap();

        let draft = load_draft(&path).await.unwrap();
        assert_eq!(draft.syllabus_file, Some(dir.path().join("syllabus.pdf")));
    }
}
