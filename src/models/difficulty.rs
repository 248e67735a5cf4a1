use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Difficulty {
    /// 简单
    Easy,
    /// 中等
    #[default]
    Medium,
    /// 困难
    Hard,
}

/// 小写别名 -> 难度
static DIFFICULTY_ALIASES: phf::Map<&'static str, Difficulty> = phf_map! {
    "easy" => Difficulty::Easy,
    "e" => Difficulty::Easy,
    "medium" => Difficulty::Medium,
    "m" => Difficulty::Medium,
    "hard" => Difficulty::Hard,
    "h" => Difficulty::Hard,
};

impl Difficulty {
    /// 获取发送给后端的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// 从字符串解析难度（忽略大小写和首尾空白）
    pub fn parse(s: &str) -> Option<Self> {
        DIFFICULTY_ALIASES
            .get(s.trim().to_lowercase().as_str())
            .copied()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Difficulty::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "未知难度 '{}'，应为 Easy / Medium / Hard",
                raw
            ))
        })
    }
}
