// ==========================================
// 帆船赛计分引擎 - 赛事实体
// ==========================================
// 职责: 赛事、队伍、场次、成绩、修正项、队伍罚分
// 约束: 每个 (已计分场次, 队伍) 恰有一条 Finish
// ==========================================

use crate::domain::types::{BreakdownType, Division, PenaltyType, ScoringType, TeamPenaltyType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 自动计算的修正分值
pub const AUTOMATIC_AMOUNT: i32 = -1;

// ==========================================
// Regatta - 赛事
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regatta {
    pub id: String,
    pub name: String,
    pub scoring: ScoringType,
    pub finalized_at: Option<DateTime<Utc>>,
}

// ==========================================
// Team - 队伍
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub school: String,
    pub name: String,
}

impl Team {
    pub fn new(id: &str, school: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            school: school.to_string(),
            name: name.to_string(),
        }
    }

    /// 显示名称 (学校 + 队名), 字母序排名按此字符串字节比较
    pub fn display_name(&self) -> String {
        format!("{} {}", self.school, self.name)
    }
}

// ==========================================
// RaceId - 场次标识
// ==========================================
// 排序: 先场次号, 再分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaceId {
    pub number: u32,
    pub division: Division,
}

impl RaceId {
    pub fn new(division: Division, number: u32) -> Self {
        Self { number, division }
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.division)
    }
}

// ==========================================
// Race - 场次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub division: Division,
    pub number: u32,
    pub boat: Option<String>,
    /// 对抗赛: 一号队
    pub tr_team1: Option<String>,
    /// 对抗赛: 二号队
    pub tr_team2: Option<String>,
    /// 对抗赛: 不计入战绩
    pub tr_ignore: bool,
}

impl Race {
    pub fn new(division: Division, number: u32) -> Self {
        Self {
            division,
            number,
            boat: None,
            tr_team1: None,
            tr_team2: None,
            tr_ignore: false,
        }
    }

    /// 对抗赛场次
    pub fn matchup(division: Division, number: u32, team1: &str, team2: &str) -> Self {
        Self {
            tr_team1: Some(team1.to_string()),
            tr_team2: Some(team2.to_string()),
            ..Self::new(division, number)
        }
    }

    pub fn id(&self) -> RaceId {
        RaceId::new(self.division, self.number)
    }
}

// ==========================================
// 修正项 (Modifier)
// ==========================================

/// 罚分修正
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyModifier {
    pub penalty_type: PenaltyType,
    /// -1 表示自动 (船队规模 + 1)
    pub amount: i32,
    pub comments: Option<String>,
    /// 仅在 amount > 0 时有意义: 是否让出名次
    pub displace: bool,
}

impl PenaltyModifier {
    /// 自动罚分 (船队规模 + 1)
    pub fn automatic(penalty_type: PenaltyType) -> Self {
        Self {
            penalty_type,
            amount: AUTOMATIC_AMOUNT,
            comments: None,
            displace: false,
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.amount <= 0
    }

    /// 受罚船是否让出名次（其后完赛的船依次前移）
    pub fn vacates_place(&self) -> bool {
        self.is_automatic() || self.displace
    }
}

/// 补偿修正
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownModifier {
    pub breakdown_type: BreakdownType,
    /// -1 表示自动 (分组内平均分)
    pub amount: i32,
    pub comments: Option<String>,
    pub displace: bool,
}

impl BreakdownModifier {
    pub fn automatic(breakdown_type: BreakdownType) -> Self {
        Self {
            breakdown_type,
            amount: AUTOMATIC_AMOUNT,
            comments: None,
            displace: false,
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.amount <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modifier {
    Penalty(PenaltyModifier),
    Breakdown(BreakdownModifier),
}

impl Modifier {
    pub fn amount(&self) -> i32 {
        match self {
            Modifier::Penalty(p) => p.amount,
            Modifier::Breakdown(b) => b.amount,
        }
    }

    pub fn type_code(&self) -> &'static str {
        match self {
            Modifier::Penalty(p) => p.penalty_type.as_str(),
            Modifier::Breakdown(b) => b.breakdown_type.as_str(),
        }
    }
}

// ==========================================
// Finish - 成绩
// ==========================================

/// 成绩键: (场次, 队伍)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FinishKey {
    pub race: RaceId,
    pub team_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finish {
    pub race: RaceId,
    pub team_id: String,
    /// 录入时间, 即完赛顺序
    pub entered_at: DateTime<Utc>,
    /// 计分前为 None
    pub score: Option<i32>,
    pub place: Option<i32>,
    pub explanation: Option<String>,
    pub modifier: Option<Modifier>,
}

impl Finish {
    pub fn new(race: RaceId, team_id: &str, entered_at: DateTime<Utc>) -> Self {
        Self {
            race,
            team_id: team_id.to_string(),
            entered_at,
            score: None,
            place: None,
            explanation: None,
            modifier: None,
        }
    }

    pub fn key(&self) -> FinishKey {
        FinishKey {
            race: self.race,
            team_id: self.team_id.clone(),
        }
    }

    /// 清空计分结果
    pub fn clear_score(&mut self) {
        self.score = None;
        self.place = None;
        self.explanation = None;
    }
}

// ==========================================
// TeamPenalty - 队伍罚分
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPenalty {
    pub team_id: String,
    pub division: Division,
    pub penalty_type: TeamPenaltyType,
    pub comments: Option<String>,
}
