// ==========================================
// 帆船赛计分引擎 - 船队排名器
// ==========================================
// 职责: 汇总各场分数 + 队伍罚分, 按总分升序排名
// 输入: 已计分成绩 + 队伍罚分
// 输出: RankResult 列表（含并列名次与加赛说明）
// 红线: 相同输入顺序必须产生相同结果与脚注符号
// ==========================================

use crate::domain::rank::RankResult;
use crate::domain::regatta::{Finish, Team, TeamPenalty};
use crate::domain::types::Division;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 默认队伍罚分（每条）
pub const DEFAULT_TEAM_PENALTY_POINTS: i32 = 20;

/// 无法打破的并列
pub const EXPLANATION_UNRESOLVED: &str = "Tie could not be broken";

/// 脚注符号表, 超出后使用 #序号
const FOOTNOTE_SYMBOLS: [&str; 6] = ["*", "**", "†", "‡", "§", "¶"];

/// 场次排序键: (场次号, 分组序号); 合并计分分组序号恒为 0
type RaceKey = (u32, usize);

// ==========================================
// 加赛规则链
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TieBreaker {
    HeadToHead,
    HighPlaceFinishes,
    LastRace,
}

impl TieBreaker {
    const CHAIN: [TieBreaker; 3] = [
        TieBreaker::HeadToHead,
        TieBreaker::HighPlaceFinishes,
        TieBreaker::LastRace,
    ];

    fn explanation(self) -> &'static str {
        match self {
            TieBreaker::HeadToHead => "Head-to-head tiebreaker",
            TieBreaker::HighPlaceFinishes => "Number of high-place finishes",
            TieBreaker::LastRace => "According to last race across all divisions",
        }
    }

    /// 计算并列组内某队的比较键（越小越好）
    fn key(self, entry: &Entry, group: &[&Entry], common: &[RaceKey]) -> Vec<i64> {
        match self {
            TieBreaker::HeadToHead => {
                let mut beaten = 0i64;
                for race in common {
                    let own = entry.scores[race];
                    for other in group {
                        if other.scores[race] > own {
                            beaten += 1;
                        }
                    }
                }
                vec![-beaten]
            }
            TieBreaker::HighPlaceFinishes => {
                let mut all: Vec<i64> = entry.scores.values().map(|s| *s as i64).collect();
                all.sort_unstable();
                all
            }
            TieBreaker::LastRace => common
                .iter()
                .rev()
                .map(|race| entry.scores[race] as i64)
                .collect(),
        }
    }
}

/// 排名条目: 一支队伍（或合并计分下的一个队伍分组）
#[derive(Debug, Clone)]
struct Entry {
    team_id: String,
    division: Option<Division>,
    scores: BTreeMap<RaceKey, i32>,
    total: i32,
}

// ==========================================
// FleetRanker - 船队排名器
// ==========================================
#[derive(Debug, Clone)]
pub struct FleetRanker {
    team_penalty_points: i32,
}

impl Default for FleetRanker {
    fn default() -> Self {
        Self::new(DEFAULT_TEAM_PENALTY_POINTS)
    }
}

impl FleetRanker {
    pub fn new(team_penalty_points: i32) -> Self {
        Self {
            team_penalty_points,
        }
    }

    /// 总排名: 各队在给定分组内的分数之和
    ///
    /// # 参数
    /// - `teams`: 参赛队伍（顺序即完全并列时的输出顺序）
    /// - `finishes`: 已计分成绩, 未计分成绩被忽略
    /// - `penalties`: 队伍罚分
    /// - `divisions`: 参与汇总的分组
    pub fn rank(
        &self,
        teams: &[Team],
        finishes: &[Finish],
        penalties: &[TeamPenalty],
        divisions: &[Division],
    ) -> Vec<RankResult> {
        let entries = teams
            .iter()
            .map(|team| self.build_entry(team, None, divisions, finishes, penalties, false))
            .collect();
        self.rank_entries(entries)
    }

    /// 单分组排名
    pub fn rank_division(
        &self,
        teams: &[Team],
        finishes: &[Finish],
        penalties: &[TeamPenalty],
        division: Division,
    ) -> Vec<RankResult> {
        let entries = teams
            .iter()
            .map(|team| {
                self.build_entry(team, Some(division), &[division], finishes, penalties, false)
            })
            .collect();
        self.rank_entries(entries)
    }

    /// 合并计分排名: 每个 (队伍, 分组) 为独立条目, 同场次号跨分组比较
    pub fn rank_combined(
        &self,
        teams: &[Team],
        finishes: &[Finish],
        penalties: &[TeamPenalty],
        divisions: &[Division],
    ) -> Vec<RankResult> {
        let mut entries = Vec::with_capacity(teams.len() * divisions.len());
        for team in teams {
            for division in divisions {
                entries.push(self.build_entry(
                    team,
                    Some(*division),
                    &[*division],
                    finishes,
                    penalties,
                    true,
                ));
            }
        }
        self.rank_entries(entries)
    }

    fn build_entry(
        &self,
        team: &Team,
        division: Option<Division>,
        divisions: &[Division],
        finishes: &[Finish],
        penalties: &[TeamPenalty],
        combined: bool,
    ) -> Entry {
        let mut scores = BTreeMap::new();
        for finish in finishes {
            if finish.team_id != team.id || !divisions.contains(&finish.race.division) {
                continue;
            }
            if let Some(score) = finish.score {
                let div_key = if combined { 0 } else { finish.race.division.index() };
                scores.insert((finish.race.number, div_key), score);
            }
        }

        let penalty_count = penalties
            .iter()
            .filter(|p| p.team_id == team.id && divisions.contains(&p.division))
            .count() as i32;

        let total = scores.values().sum::<i32>() + penalty_count * self.team_penalty_points;

        Entry {
            team_id: team.id.clone(),
            division,
            scores,
            total,
        }
    }

    fn rank_entries(&self, mut entries: Vec<Entry>) -> Vec<RankResult> {
        entries.sort_by_key(|e| e.total);

        // 按总分分组
        let mut groups: Vec<Vec<&Entry>> = Vec::new();
        for entry in &entries {
            match groups.last_mut() {
                Some(group) if group[0].total == entry.total => group.push(entry),
                _ => groups.push(vec![entry]),
            }
        }

        let mut resolved: Vec<(Vec<&Entry>, String)> = Vec::new();
        for group in groups {
            break_ties(group, 0, "", &mut resolved);
        }

        let mut results = Vec::with_capacity(entries.len());
        let mut position = 1u32;
        for (group, explanation) in resolved {
            let size = group.len() as u32;
            for entry in group {
                results.push(RankResult {
                    team_id: entry.team_id.clone(),
                    division: entry.division,
                    rank: position,
                    total: entry.total,
                    explanation: explanation.clone(),
                });
            }
            position += size;
        }

        debug!("船队排名完成: entries={}", results.len());
        results
    }
}

/// 逐级拆分并列组
///
/// 每一级规则对整组计算比较键, 拆分后的子组带上该级说明;
/// 仍并列的子组进入下一级, 规则用尽后标记为无法打破
fn break_ties<'a>(
    group: Vec<&'a Entry>,
    level: usize,
    label: &str,
    out: &mut Vec<(Vec<&'a Entry>, String)>,
) {
    if group.len() == 1 {
        out.push((group, label.to_string()));
        return;
    }
    let Some(rule) = TieBreaker::CHAIN.get(level).copied() else {
        out.push((group, EXPLANATION_UNRESOLVED.to_string()));
        return;
    };

    let common: Vec<RaceKey> = {
        let mut iter = group.iter();
        let mut shared: BTreeSet<RaceKey> = iter
            .next()
            .map(|e| e.scores.keys().copied().collect())
            .unwrap_or_default();
        for entry in iter {
            shared.retain(|k| entry.scores.contains_key(k));
        }
        shared.into_iter().collect()
    };

    let mut keyed: Vec<(Vec<i64>, &Entry)> = group
        .iter()
        .map(|e| (rule.key(e, &group, &common), *e))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut chunks: Vec<(Vec<i64>, Vec<&Entry>)> = Vec::new();
    for (key, entry) in keyed {
        match chunks.last_mut() {
            Some((k, chunk)) if *k == key => chunk.push(entry),
            _ => chunks.push((key, vec![entry])),
        }
    }

    for (_, chunk) in chunks {
        break_ties(chunk, level + 1, rule.explanation(), out);
    }
}

// ==========================================
// 脚注符号
// ==========================================

/// 第 index 个（0 起）不同说明的脚注符号
pub fn footnote_symbol(index: usize) -> String {
    FOOTNOTE_SYMBOLS
        .get(index)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// 按首次出现顺序为每个非空说明分配脚注符号
///
/// # 返回
/// (说明, 符号) 列表, 顺序即首次出现顺序
pub fn assign_symbols(results: &[RankResult]) -> Vec<(String, String)> {
    let mut assigned: Vec<(String, String)> = Vec::new();
    for result in results {
        if result.explanation.is_empty()
            || assigned.iter().any(|(e, _)| *e == result.explanation)
        {
            continue;
        }
        let symbol = footnote_symbol(assigned.len());
        assigned.push((result.explanation.clone(), symbol));
    }
    assigned
}
