// ==========================================
// 帆船赛计分引擎 - 成绩计分器
// ==========================================
// 职责: 完赛顺序 + 罚分/补偿 -> 每条成绩的分数
// 输入: 单场次全部成绩（按录入时间即完赛顺序）
// 输出: 带 score / place / explanation 的成绩
// 红线: 纯函数, 每次全量重算, 不保留增量状态
// ==========================================

use crate::config::BreakdownRounding;
use crate::domain::regatta::{Finish, FinishKey, Modifier};
use crate::domain::types::{Division, ScoringType};
use crate::domain::RaceId;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// 计分场次键: Standard 为 (场次号, 分组), 合并计分为 (场次号, None)
type ScoredRaceKey = (u32, Option<Division>);

// ==========================================
// ScoringReport - 全量计分结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringReport {
    /// 全部成绩; 被丢弃场次的成绩分数已清空
    pub finishes: Vec<Finish>,
    /// 已计分场次
    pub scored_races: Vec<RaceId>,
    /// 因成绩条数不符被丢弃的场次
    pub discarded: Vec<DiscardedRace>,
}

impl ScoringReport {
    /// 已计分的成绩
    pub fn scored_finishes(&self) -> impl Iterator<Item = &Finish> {
        self.finishes.iter().filter(|f| f.score.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedRace {
    pub number: u32,
    /// 合并计分时为 None
    pub division: Option<Division>,
    pub expected: usize,
    pub actual: usize,
}

/// 每个计分场次应有的成绩条数
///
/// # 参数
/// - `scoring`: 计分制式
/// - `team_count`: 参赛队伍数（不含轮空队）
/// - `division_count`: 分组数
pub fn expected_finish_count(scoring: ScoringType, team_count: usize, division_count: usize) -> usize {
    match scoring {
        ScoringType::Standard => team_count,
        ScoringType::Combined => team_count * division_count,
        ScoringType::TeamRacing => 2 * division_count,
    }
}

// ==========================================
// ScoreAggregator - 成绩计分器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    rounding: BreakdownRounding,
}

impl ScoreAggregator {
    pub fn new(rounding: BreakdownRounding) -> Self {
        Self { rounding }
    }

    // ==========================================
    // 单场次计分
    // ==========================================

    /// 计算单个场次的分数
    ///
    /// 规则:
    /// 1) 自然名次 = 按录入时间的 1 起序号（同时间保持输入顺序）
    /// 2) 让出名次的罚分（自动罚分或 displace）不占名次, 其后船只依次前移
    /// 3) 其余罚分与全部补偿占据原名次
    /// 4) 自动补偿暂记为基础名次, 由 `score_regatta` 以平均分回填
    ///
    /// # 参数
    /// - `finishes`: 同一计分场次的全部成绩
    ///
    /// # 返回
    /// 按完赛顺序排列、已计分的成绩
    pub fn score_race(&self, finishes: &[Finish]) -> EngineResult<Vec<Finish>> {
        let mut seen: HashSet<FinishKey> = HashSet::with_capacity(finishes.len());
        for finish in finishes {
            if !seen.insert(finish.key()) {
                return Err(EngineError::InvariantViolation(format!(
                    "重复成绩: race={}, team={}",
                    finish.race, finish.team_id
                )));
            }
        }

        let mut ordered: Vec<Finish> = finishes.to_vec();
        ordered.sort_by(|a, b| a.entered_at.cmp(&b.entered_at));

        let fleet_size = ordered.len() as i32;
        let mut next_place = 1;

        for finish in ordered.iter_mut() {
            match finish.modifier.clone() {
                None => {
                    finish.score = Some(next_place);
                    finish.place = Some(next_place);
                    finish.explanation = None;
                    next_place += 1;
                }
                Some(Modifier::Penalty(penalty)) => {
                    let score = if penalty.is_automatic() {
                        fleet_size + 1
                    } else {
                        penalty.amount
                    };
                    let basis = if penalty.is_automatic() { "fleet + 1" } else { "assigned" };

                    if penalty.vacates_place() {
                        finish.place = Some(score);
                    } else {
                        finish.place = Some(next_place);
                        next_place += 1;
                    }
                    finish.score = Some(score);
                    finish.explanation = Some(explain(
                        penalty.penalty_type.as_str(),
                        score,
                        basis,
                        penalty.comments.as_deref(),
                    ));
                }
                Some(Modifier::Breakdown(breakdown)) => {
                    let base = next_place;
                    next_place += 1;
                    finish.place = Some(base);

                    if breakdown.is_automatic() {
                        // 暂记基础名次, 平均分回填时覆盖
                        finish.score = Some(base);
                        finish.explanation = Some(explain(
                            breakdown.breakdown_type.as_str(),
                            base,
                            "natural place",
                            breakdown.comments.as_deref(),
                        ));
                    } else {
                        let score = breakdown.amount.min(base);
                        finish.score = Some(score);
                        finish.explanation = Some(explain(
                            breakdown.breakdown_type.as_str(),
                            score,
                            "assigned",
                            breakdown.comments.as_deref(),
                        ));
                    }
                }
            }
        }

        Ok(ordered)
    }

    // ==========================================
    // 全量计分
    // ==========================================

    /// 全量计算赛事所有场次的分数
    ///
    /// # 参数
    /// - `scoring`: 计分制式, 决定场次分组方式
    /// - `expected_per_race`: 每个计分场次应有的成绩条数
    /// - `finishes`: 赛事全部成绩
    ///
    /// # 返回
    /// - Ok(ScoringReport): 成绩条数不符的场次被丢弃, 其余场次全部计分
    /// - Err(InvariantViolation): 存在重复成绩
    pub fn score_regatta(
        &self,
        scoring: ScoringType,
        expected_per_race: usize,
        finishes: Vec<Finish>,
    ) -> EngineResult<ScoringReport> {
        let mut groups: BTreeMap<ScoredRaceKey, Vec<Finish>> = BTreeMap::new();
        for finish in finishes {
            let key = if scoring.merges_divisions() {
                (finish.race.number, None)
            } else {
                (finish.race.number, Some(finish.race.division))
            };
            groups.entry(key).or_default().push(finish);
        }

        let mut scored: Vec<Finish> = Vec::new();
        let mut discarded_finishes: Vec<Finish> = Vec::new();
        let mut discarded: Vec<DiscardedRace> = Vec::new();
        let mut scored_races: Vec<RaceId> = Vec::new();

        for ((number, division), group) in groups {
            if group.len() != expected_per_race {
                let err = EngineError::IncompleteScoring {
                    race: race_label(number, division),
                    expected: expected_per_race,
                    actual: group.len(),
                };
                warn!("{}，丢弃该场次成绩", err);

                discarded.push(DiscardedRace {
                    number,
                    division,
                    expected: expected_per_race,
                    actual: group.len(),
                });
                discarded_finishes.extend(group.into_iter().map(|mut f| {
                    f.clear_score();
                    f
                }));
                continue;
            }

            let mut race_ids: Vec<RaceId> = group.iter().map(|f| f.race).collect();
            race_ids.sort();
            race_ids.dedup();
            scored_races.extend(race_ids);

            scored.extend(self.score_race(&group)?);
        }

        self.resolve_average_breakdowns(scoring, &mut scored);

        debug!(
            "全量计分完成: scored_finishes={}, scored_races={}, discarded_races={}",
            scored.len(),
            scored_races.len(),
            discarded.len()
        );

        scored.extend(discarded_finishes);
        scored_races.sort();

        Ok(ScoringReport {
            finishes: scored,
            scored_races,
            discarded,
        })
    }

    /// 回填自动补偿: 同队其他场次的平均分, 且不差于基础名次
    ///
    /// Standard 取同分组其他场次; 合并计分取全赛事其他成绩
    fn resolve_average_breakdowns(&self, scoring: ScoringType, finishes: &mut [Finish]) {
        let merged = scoring.merges_divisions();
        let pool_key = |finish: &Finish| -> (String, Option<Division>) {
            if merged {
                (finish.team_id.clone(), None)
            } else {
                (finish.team_id.clone(), Some(finish.race.division))
            }
        };

        // (队伍, 分组) -> [(场次, 分数)], 不含自动补偿成绩
        let mut pool: HashMap<(String, Option<Division>), Vec<(RaceId, i32)>> = HashMap::new();
        for finish in finishes.iter() {
            if is_automatic_breakdown(finish) {
                continue;
            }
            if let Some(score) = finish.score {
                pool.entry(pool_key(finish))
                    .or_default()
                    .push((finish.race, score));
            }
        }

        let basis_average = if merged {
            "average in regatta"
        } else {
            "average in division"
        };

        for finish in finishes.iter_mut() {
            if !is_automatic_breakdown(finish) {
                continue;
            }
            let Some(Modifier::Breakdown(breakdown)) = finish.modifier.clone() else {
                continue;
            };
            let base = finish.place.unwrap_or(1);

            let others: Vec<i32> = pool
                .get(&pool_key(finish))
                .map(|scores| {
                    scores
                        .iter()
                        .filter(|(race, _)| *race != finish.race)
                        .map(|(_, score)| *score)
                        .collect()
                })
                .unwrap_or_default();

            let (score, basis) = match self.average(&others) {
                Some(avg) if avg < base => (avg, basis_average),
                Some(_) => (base, "natural place"),
                None => (base, "natural place, no other races"),
            };

            finish.score = Some(score);
            finish.explanation = Some(explain(
                breakdown.breakdown_type.as_str(),
                score,
                basis,
                breakdown.comments.as_deref(),
            ));
        }
    }

    /// 平均分, 取整方式由配置决定
    fn average(&self, scores: &[i32]) -> Option<i32> {
        if scores.is_empty() {
            return None;
        }
        let sum: i64 = scores.iter().map(|s| *s as i64).sum();
        let count = scores.len() as i64;
        let avg = match self.rounding {
            BreakdownRounding::Round => (2 * sum + count).div_euclid(2 * count),
            BreakdownRounding::Truncate => sum.div_euclid(count),
        };
        Some(avg as i32)
    }

    // ==========================================
    // 修正项校验
    // ==========================================

    /// 不含修正项时该船在本场次应得的分数
    pub fn natural_score(&self, race_finishes: &[Finish], key: &FinishKey) -> EngineResult<i32> {
        let mut stripped: Vec<Finish> = race_finishes.to_vec();
        let target = stripped
            .iter_mut()
            .find(|f| f.key() == *key)
            .ok_or_else(|| {
                EngineError::Validation(format!("成绩不存在: race={}, team={}", key.race, key.team_id))
            })?;
        target.modifier = None;

        self.score_race(&stripped)?
            .into_iter()
            .find(|f| f.key() == *key)
            .and_then(|f| f.score)
            .ok_or_else(|| EngineError::InvariantViolation(format!("计分后成绩丢失: {}", key.race)))
    }

    /// 提交前校验修正项
    ///
    /// # 规则
    /// - amount 只能为 -1（自动）或正数
    /// - 罚分不得超过船队规模 + 1
    /// - 补偿必须严格优于（小于）自然分数
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(ModifierConflict): 校验失败, 调用方不得写入
    pub fn validate_modifier(
        &self,
        race_finishes: &[Finish],
        key: &FinishKey,
        modifier: &Modifier,
    ) -> EngineResult<()> {
        let amount = modifier.amount();
        if amount == 0 || amount < -1 {
            return Err(EngineError::ModifierConflict(format!(
                "{} 分值无效: {}",
                modifier.type_code(),
                amount
            )));
        }

        let natural = self.natural_score(race_finishes, key)?;
        let fleet_size = race_finishes.len() as i32;

        match modifier {
            Modifier::Penalty(p) if !p.is_automatic() && p.amount > fleet_size + 1 => {
                Err(EngineError::ModifierConflict(format!(
                    "{} 罚分 {} 超过船队规模+1 ({})",
                    p.penalty_type,
                    p.amount,
                    fleet_size + 1
                )))
            }
            Modifier::Breakdown(b) if !b.is_automatic() && b.amount >= natural => {
                Err(EngineError::ModifierConflict(format!(
                    "{} 补偿分 {} 不优于自然分数 {}",
                    b.breakdown_type, b.amount, natural
                )))
            }
            _ => Ok(()),
        }
    }
}

fn is_automatic_breakdown(finish: &Finish) -> bool {
    matches!(&finish.modifier, Some(Modifier::Breakdown(b)) if b.is_automatic())
}

fn race_label(number: u32, division: Option<Division>) -> String {
    match division {
        Some(d) => format!("{}{}", number, d),
        None => number.to_string(),
    }
}

fn explain(code: &str, score: i32, basis: &str, comments: Option<&str>) -> String {
    match comments.filter(|c| !c.trim().is_empty()) {
        Some(c) => format!("{} ({}, {}): {}", code, score, basis, c.trim()),
        None => format!("{} ({}, {})", code, score, basis),
    }
}
