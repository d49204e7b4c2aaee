// ==========================================
// 帆船赛计分引擎 - 排名结果
// ==========================================

use crate::domain::types::Division;
use serde::{Deserialize, Serialize};

/// 船队/合并计分排名结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankResult {
    pub team_id: String,
    /// 分组排名或合并计分时为 Some
    pub division: Option<Division>,
    pub rank: u32,
    /// 总分（含队伍罚分）
    pub total: i32,
    /// 决定名次的加赛规则, 同名次队伍共享; 无并列时为空串
    pub explanation: String,
}

/// 对抗赛排名结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRank {
    pub team_id: String,
    pub rank: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub explanation: String,
}

impl TeamRank {
    pub fn races(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "results", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ranking {
    Fleet(Vec<RankResult>),
    TeamRecord(Vec<TeamRank>),
}

impl Ranking {
    pub fn len(&self) -> usize {
        match self {
            Ranking::Fleet(r) => r.len(),
            Ranking::TeamRecord(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
