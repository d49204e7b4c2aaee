// ==========================================
// 帆船赛计分引擎 - 封榜校验器
// ==========================================
// 职责: 封榜前检查是否存在未计分的中间场次
// 输入: 全部场次 + 已计分场次
// 输出: 阻塞场次（中间空缺）与可移除场次（末尾未计分）
// ==========================================

use crate::domain::regatta::{Race, RaceId};
use crate::domain::types::{Division, ScoringType};
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 封榜检查结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationReport {
    /// 最后一个已计分场次之前的未计分场次
    pub blocking: Vec<RaceId>,
    /// 最后一个已计分场次之后的未计分场次, 封榜时删除
    pub removable: Vec<RaceId>,
}

impl FinalizationReport {
    pub fn is_finalizable(&self) -> bool {
        self.blocking.is_empty()
    }

    /// 存在阻塞场次时返回 FinalizationBlocked
    pub fn ensure_finalizable(&self) -> EngineResult<()> {
        if self.is_finalizable() {
            Ok(())
        } else {
            Err(EngineError::FinalizationBlocked {
                races: self.blocking.clone(),
            })
        }
    }
}

// ==========================================
// FinalizationGuard - 封榜校验器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FinalizationGuard;

impl FinalizationGuard {
    pub fn new() -> Self {
        Self
    }

    /// 单个分组的中间空缺
    ///
    /// # 参数
    /// - `division`: 分组
    /// - `scored`: 该分组已计分场次号（任意顺序, 可重复）
    ///
    /// # 返回
    /// 相邻已计分场次号之间（从 0 起算）缺失的场次
    pub fn blocking_races(&self, division: Division, scored: &[u32]) -> Vec<RaceId> {
        let numbers: BTreeSet<u32> = scored.iter().copied().collect();
        let mut blocking = Vec::new();
        let mut previous = 0u32;
        for number in numbers {
            for missing in previous.saturating_add(1)..number {
                blocking.push(RaceId::new(division, missing));
            }
            previous = number;
        }
        blocking
    }

    /// 赛事级检查
    ///
    /// 合并计分只检查 A 组; 其余制式检查全部分组。
    /// 可移除场次按各分组自身的最后计分场次判定, 合并计分以 A 组为准。
    ///
    /// # 参数
    /// - `scoring`: 计分制式
    /// - `races`: 赛事全部场次
    /// - `scored`: 已计分场次
    pub fn check(
        &self,
        scoring: ScoringType,
        races: &[Race],
        scored: &[RaceId],
    ) -> FinalizationReport {
        let mut scored_by_division: BTreeMap<Division, Vec<u32>> = BTreeMap::new();
        for race in scored {
            scored_by_division
                .entry(race.division)
                .or_default()
                .push(race.number);
        }

        let divisions: BTreeSet<Division> = races.iter().map(|r| r.division).collect();
        let considered: Vec<Division> = if scoring == ScoringType::Combined {
            divisions.iter().copied().filter(|d| *d == Division::A).collect()
        } else {
            divisions.iter().copied().collect()
        };

        let mut report = FinalizationReport::default();
        for division in &considered {
            let numbers = scored_by_division
                .get(division)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            report
                .blocking
                .extend(self.blocking_races(*division, numbers));
        }

        let last_scored = |division: Division| -> u32 {
            let source = if scoring == ScoringType::Combined {
                Division::A
            } else {
                division
            };
            scored_by_division
                .get(&source)
                .and_then(|n| n.iter().max().copied())
                .unwrap_or(0)
        };

        let scored_set: BTreeSet<RaceId> = scored.iter().copied().collect();
        report.removable = races
            .iter()
            .map(Race::id)
            .filter(|id| id.number > last_scored(id.division) && !scored_set.contains(id))
            .collect();
        report.removable.sort();
        report.removable.dedup();

        debug!(
            "封榜检查: blocking={}, removable={}",
            report.blocking.len(),
            report.removable.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn races(division: Division, numbers: &[u32]) -> Vec<Race> {
        numbers.iter().map(|n| Race::new(division, *n)).collect()
    }

    fn ids(division: Division, numbers: &[u32]) -> Vec<RaceId> {
        numbers.iter().map(|n| RaceId::new(division, *n)).collect()
    }

    #[test]
    fn test_middle_gap_blocks() {
        let guard = FinalizationGuard::new();
        assert_eq!(
            guard.blocking_races(Division::A, &[1, 2, 4]),
            ids(Division::A, &[3])
        );
        assert_eq!(
            guard.blocking_races(Division::A, &[4, 2]),
            ids(Division::A, &[1, 3])
        );
        assert!(guard.blocking_races(Division::A, &[]).is_empty());
    }

    #[test]
    fn test_trailing_races_removable_not_blocking() {
        let guard = FinalizationGuard::new();
        let all = races(Division::A, &[1, 2, 3, 4, 5, 6]);
        let report = guard.check(
            ScoringType::Standard,
            &all,
            &ids(Division::A, &[1, 2, 4]),
        );
        assert_eq!(report.blocking, ids(Division::A, &[3]));
        assert_eq!(report.removable, ids(Division::A, &[5, 6]));
        assert!(matches!(
            report.ensure_finalizable(),
            Err(EngineError::FinalizationBlocked { races }) if races == ids(Division::A, &[3])
        ));
    }

    #[test]
    fn test_combined_checks_division_a_only() {
        let guard = FinalizationGuard::new();
        let mut all = races(Division::A, &[1, 2, 3]);
        all.extend(races(Division::B, &[1, 2, 3]));
        let mut scored = ids(Division::A, &[1, 2]);
        scored.extend(ids(Division::B, &[2]));

        let report = guard.check(ScoringType::Combined, &all, &scored);
        assert!(report.is_finalizable());
        // B 组 3 号按 A 组最后计分场次判定为可移除
        assert_eq!(
            report.removable,
            vec![RaceId::new(Division::A, 3), RaceId::new(Division::B, 3)]
        );
    }

    #[test]
    fn test_standard_checks_every_division() {
        let guard = FinalizationGuard::new();
        let mut all = races(Division::A, &[1, 2]);
        all.extend(races(Division::B, &[1, 2]));
        let mut scored = ids(Division::A, &[1, 2]);
        scored.extend(ids(Division::B, &[2]));

        let report = guard.check(ScoringType::Standard, &all, &scored);
        assert_eq!(report.blocking, vec![RaceId::new(Division::B, 1)]);
        assert!(report.removable.is_empty());
    }
}
