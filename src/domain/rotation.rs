// ==========================================
// 帆船赛计分引擎 - 轮换实体
// ==========================================
// 职责: 帆号轮换请求与分配结果
// 约束: 某场次没有任何分配 = 该场次无轮换
// ==========================================

use crate::domain::regatta::RaceId;
use crate::domain::types::{Division, SailSortMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 轮换中的队伍引用; Bye 为奇数补位的虚拟队伍, 永不计分
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamRef {
    Team(String),
    Bye,
}

impl TeamRef {
    pub fn team(id: &str) -> Self {
        TeamRef::Team(id.to_string())
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, TeamRef::Bye)
    }

    pub fn team_id(&self) -> Option<&str> {
        match self {
            TeamRef::Team(id) => Some(id),
            TeamRef::Bye => None,
        }
    }
}

impl fmt::Display for TeamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamRef::Team(id) => write!(f, "{}", id),
            TeamRef::Bye => write!(f, "BYE"),
        }
    }
}

/// 起始帆号条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEntry {
    pub team: TeamRef,
    pub division: Division,
    pub sail: String,
}

impl RotationEntry {
    pub fn new(team_id: &str, division: Division, sail: &str) -> Self {
        Self {
            team: TeamRef::team(team_id),
            division,
            sail: sail.to_string(),
        }
    }
}

/// 帆号分配
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RotationAssignment {
    pub race: RaceId,
    pub team: TeamRef,
    pub sail: String,
}

// ==========================================
// RotationStyle - 轮换方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RotationStyle {
    /// 每组场次帆号 +1
    Standard,
    /// 蛇形交换
    Swap,
    /// 从源分组平移
    Offset,
    /// 以标准轮换为模板, 其余分组平移
    FrannyStandard,
    /// 以交换轮换为模板, 其余分组平移
    FrannySwap,
}

impl RotationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationStyle::Standard => "STANDARD",
            RotationStyle::Swap => "SWAP",
            RotationStyle::Offset => "OFFSET",
            RotationStyle::FrannyStandard => "FRANNY_STANDARD",
            RotationStyle::FrannySwap => "FRANNY_SWAP",
        }
    }
}

impl fmt::Display for RotationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RotationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(RotationStyle::Standard),
            "SWAP" => Ok(RotationStyle::Swap),
            "OFFSET" => Ok(RotationStyle::Offset),
            "FRANNY_STANDARD" => Ok(RotationStyle::FrannyStandard),
            "FRANNY_SWAP" => Ok(RotationStyle::FrannySwap),
            other => Err(format!("未知轮换方式: {}", other)),
        }
    }
}

impl TryFrom<String> for RotationStyle {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RotationStyle> for String {
    fn from(style: RotationStyle) -> Self {
        style.as_str().to_string()
    }
}

/// 平移参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSpec {
    pub source: Division,
    pub amount: i32,
}

// ==========================================
// RotationRequest - 轮换生成请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationRequest {
    pub style: RotationStyle,
    /// 目标分组; Franny 以第一个分组为模板
    pub divisions: Vec<Division>,
    /// 场次号（按给定顺序分组）
    pub races: Vec<u32>,
    /// 起始帆号
    #[serde(default)]
    pub entries: Vec<RotationEntry>,
    /// 全部船只; 缺省时取起始帆号
    #[serde(default)]
    pub fleet: Option<Vec<String>>,
    /// 连续共享同一分配的场次数
    pub repeat_set_size: u32,
    #[serde(default)]
    pub sort: Option<SailSortMode>,
    #[serde(default)]
    pub allow_bye: Option<bool>,
    /// 仅 Offset 使用
    #[serde(default)]
    pub offset: Option<OffsetSpec>,
}
