// ==========================================
// 帆船赛计分引擎 - 排名器注册表
// ==========================================
// 职责: 按计分制式选择排名策略
// 说明: 有限枚举, 编译期确定, 不做按名称的动态加载
// ==========================================

use crate::domain::rank::Ranking;
use crate::domain::regatta::{Finish, Race, Team, TeamPenalty};
use crate::domain::types::{Division, ScoringType};
use crate::engine::fleet_ranker::FleetRanker;
use crate::engine::team_record_ranker::TeamRecordRanker;
use serde::{Deserialize, Serialize};

/// 排名策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankerKind {
    /// 各队跨分组总分
    FleetOverall,
    /// 每个 (队伍, 分组) 独立排名
    FleetCombined,
    /// 胜负平战绩
    TeamRecord,
}

impl RankerKind {
    pub fn for_scoring(scoring: ScoringType) -> Self {
        match scoring {
            ScoringType::Standard => RankerKind::FleetOverall,
            ScoringType::Combined => RankerKind::FleetCombined,
            ScoringType::TeamRacing => RankerKind::TeamRecord,
        }
    }
}

/// 排名所需的赛事数据
pub struct RankingInput<'a> {
    pub teams: &'a [Team],
    pub races: &'a [Race],
    pub finishes: &'a [Finish],
    pub penalties: &'a [TeamPenalty],
    pub divisions: &'a [Division],
}

// ==========================================
// RankerRegistry - 排名器注册表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RankerRegistry {
    fleet: FleetRanker,
    team_record: TeamRecordRanker,
}

impl RankerRegistry {
    pub fn new(fleet: FleetRanker, team_record: TeamRecordRanker) -> Self {
        Self { fleet, team_record }
    }

    /// 按策略排名
    ///
    /// 对抗赛只以 A 组场次为代表计算战绩
    pub fn rank(&self, kind: RankerKind, input: &RankingInput<'_>) -> Ranking {
        match kind {
            RankerKind::FleetOverall => Ranking::Fleet(self.fleet.rank(
                input.teams,
                input.finishes,
                input.penalties,
                input.divisions,
            )),
            RankerKind::FleetCombined => Ranking::Fleet(self.fleet.rank_combined(
                input.teams,
                input.finishes,
                input.penalties,
                input.divisions,
            )),
            RankerKind::TeamRecord => {
                let representative: Vec<Race> = input
                    .races
                    .iter()
                    .filter(|r| r.division == Division::A)
                    .cloned()
                    .collect();
                Ranking::TeamRecord(self.team_record.rank(
                    input.teams,
                    &representative,
                    input.finishes,
                ))
            }
        }
    }
}
