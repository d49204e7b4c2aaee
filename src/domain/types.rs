// ==========================================
// 帆船赛计分引擎 - 领域类型定义
// ==========================================
// 职责: 分组、计分制式、罚分/补偿类型等封闭枚举
// 约束: 所有枚举与数据库存储格式一致 (FromStr / Display 互逆)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 分组 (Division)
// ==========================================
// 封闭枚举, 顺序即显示顺序: A < B < C < D
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Division {
    A,
    B,
    C,
    D,
}

impl Division {
    /// 全部分组（按显示顺序）
    pub const ALL: [Division; 4] = [Division::A, Division::B, Division::C, Division::D];

    /// 分组序号 (A=0)
    pub fn index(self) -> usize {
        match self {
            Division::A => 0,
            Division::B => 1,
            Division::C => 2,
            Division::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Division::A => "A",
            Division::B => "B",
            Division::C => "C",
            Division::D => "D",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Division {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Division::A),
            "B" => Ok(Division::B),
            "C" => Ok(Division::C),
            "D" => Ok(Division::D),
            other => Err(format!("未知分组: {}", other)),
        }
    }
}

// ==========================================
// 计分制式 (Scoring Type)
// ==========================================
// Standard: 各分组独立计分, 按队伍总分排名
// Combined: 同场次各分组合并为一个船队计分
// TeamRacing: 两队对抗, 按胜负平战绩排名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringType {
    Standard,
    Combined,
    TeamRacing,
}

impl ScoringType {
    /// 计分时是否将同场次各分组合并为一个船队
    pub fn merges_divisions(self) -> bool {
        matches!(self, ScoringType::Combined | ScoringType::TeamRacing)
    }
}

impl fmt::Display for ScoringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringType::Standard => write!(f, "STANDARD"),
            ScoringType::Combined => write!(f, "COMBINED"),
            ScoringType::TeamRacing => write!(f, "TEAM_RACING"),
        }
    }
}

impl FromStr for ScoringType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "STANDARD" => Ok(ScoringType::Standard),
            "COMBINED" => Ok(ScoringType::Combined),
            "TEAM_RACING" => Ok(ScoringType::TeamRacing),
            other => Err(format!("未知计分制式: {}", other)),
        }
    }
}

// ==========================================
// 罚分类型 (Penalty Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenaltyType {
    Dnc, // 未出发到场
    Dns, // 未起航
    Dnf, // 未完赛
    Ocs, // 抢航
    Bfd, // 黑旗取消
    Ufd, // U旗取消
    Ret, // 退赛
    Dsq, // 取消资格
    Dne, // 不可弃除的取消资格
    Raf, // 事后退赛
}

impl PenaltyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PenaltyType::Dnc => "DNC",
            PenaltyType::Dns => "DNS",
            PenaltyType::Dnf => "DNF",
            PenaltyType::Ocs => "OCS",
            PenaltyType::Bfd => "BFD",
            PenaltyType::Ufd => "UFD",
            PenaltyType::Ret => "RET",
            PenaltyType::Dsq => "DSQ",
            PenaltyType::Dne => "DNE",
            PenaltyType::Raf => "RAF",
        }
    }
}

impl fmt::Display for PenaltyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PenaltyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "DNC" => Ok(PenaltyType::Dnc),
            "DNS" => Ok(PenaltyType::Dns),
            "DNF" => Ok(PenaltyType::Dnf),
            "OCS" => Ok(PenaltyType::Ocs),
            "BFD" => Ok(PenaltyType::Bfd),
            "UFD" => Ok(PenaltyType::Ufd),
            "RET" => Ok(PenaltyType::Ret),
            "DSQ" => Ok(PenaltyType::Dsq),
            "DNE" => Ok(PenaltyType::Dne),
            "RAF" => Ok(PenaltyType::Raf),
            other => Err(format!("未知罚分类型: {}", other)),
        }
    }
}

// ==========================================
// 补偿类型 (Breakdown Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownType {
    Rdg, // 补偿
    Bkd, // 器材故障
    Bye, // 轮空
}

impl BreakdownType {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakdownType::Rdg => "RDG",
            BreakdownType::Bkd => "BKD",
            BreakdownType::Bye => "BYE",
        }
    }
}

impl fmt::Display for BreakdownType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BreakdownType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RDG" => Ok(BreakdownType::Rdg),
            "BKD" => Ok(BreakdownType::Bkd),
            "BYE" => Ok(BreakdownType::Bye),
            other => Err(format!("未知补偿类型: {}", other)),
        }
    }
}

// ==========================================
// 队伍罚分类型 (Team Penalty Type)
// ==========================================
// 每条队伍罚分在该分组总分上固定加分（默认 20）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeamPenaltyType {
    Gdq, // 全面取消资格
    Lop, // 参赛不足
    Mrp, // 缺少名单
    Pfd, // 未穿救生衣
}

impl TeamPenaltyType {
    pub fn as_str(self) -> &'static str {
        match self {
            TeamPenaltyType::Gdq => "GDQ",
            TeamPenaltyType::Lop => "LOP",
            TeamPenaltyType::Mrp => "MRP",
            TeamPenaltyType::Pfd => "PFD",
        }
    }
}

impl fmt::Display for TeamPenaltyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TeamPenaltyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "GDQ" => Ok(TeamPenaltyType::Gdq),
            "LOP" => Ok(TeamPenaltyType::Lop),
            "MRP" => Ok(TeamPenaltyType::Mrp),
            "PFD" => Ok(TeamPenaltyType::Pfd),
            other => Err(format!("未知队伍罚分类型: {}", other)),
        }
    }
}

// ==========================================
// 帆号排序方式 (Sail Sort Mode)
// ==========================================
// 必须在生成第一组轮换之前应用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SailSortMode {
    /// 保持输入顺序
    #[default]
    AsGiven,
    /// 数字帆号升序, 非数字帆号排在其后（按字节序）
    Numeric,
    /// 按字节序排序
    Alphanumeric,
}

impl fmt::Display for SailSortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SailSortMode::AsGiven => write!(f, "AS_GIVEN"),
            SailSortMode::Numeric => write!(f, "NUMERIC"),
            SailSortMode::Alphanumeric => write!(f, "ALPHANUMERIC"),
        }
    }
}

impl FromStr for SailSortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AS_GIVEN" => Ok(SailSortMode::AsGiven),
            "NUMERIC" => Ok(SailSortMode::Numeric),
            "ALPHANUMERIC" => Ok(SailSortMode::Alphanumeric),
            other => Err(format!("未知帆号排序方式: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_round_trip() {
        for division in Division::ALL {
            let parsed: Division = division.to_string().parse().unwrap();
            assert_eq!(parsed, division);
        }
        assert_eq!("b".parse::<Division>().unwrap(), Division::B);
        assert!("E".parse::<Division>().is_err());
    }

    #[test]
    fn test_scoring_type_merges_divisions() {
        assert!(!ScoringType::Standard.merges_divisions());
        assert!(ScoringType::Combined.merges_divisions());
        assert!(ScoringType::TeamRacing.merges_divisions());
        assert_eq!(
            "TEAM_RACING".parse::<ScoringType>().unwrap(),
            ScoringType::TeamRacing
        );
    }
}
