// ==========================================
// 帆船赛计分引擎 - 计分服务 API
// ==========================================
// 职责: 串联仓储与引擎, 对外提供重算/轮换/封榜入口
// 约束: 同一赛事的重算串行执行; 轮换生成单独串行
// 红线: 校验失败时不写入任何数据
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::lock::RegattaLocks;
use crate::config::EngineConfig;
use crate::domain::rank::{RankResult, Ranking};
use crate::domain::regatta::{Finish, FinishKey, Modifier, RaceId, Regatta};
use crate::domain::rotation::{RotationAssignment, RotationRequest};
use crate::domain::types::{Division, ScoringType};
use crate::engine::events::{OptionalEventPublisher, ScoreEvent, ScoreEventPublisher, ScoreEventType};
use crate::engine::finalization::{FinalizationGuard, FinalizationReport};
use crate::engine::fleet_ranker::{assign_symbols, FleetRanker};
use crate::engine::race_range::make_range;
use crate::engine::ranker::{RankerKind, RankerRegistry, RankingInput};
use crate::engine::rotation::RotationGenerator;
use crate::engine::score_aggregator::{expected_finish_count, DiscardedRace, ScoreAggregator};
use crate::engine::team_record_ranker::TeamRecordRanker;
use crate::repository::RegattaRepository;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// RescoreOutcome - 全量重算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescoreOutcome {
    pub regatta_id: String,
    pub scoring: ScoringType,
    /// 按计分制式选择的总排名
    pub ranking: Ranking,
    /// Standard 计分的分组排名; 其余制式为空
    pub division_rankings: BTreeMap<Division, Vec<RankResult>>,
    /// (加赛说明, 脚注符号)
    pub footnotes: Vec<(String, String)>,
    pub scored_races: Vec<RaceId>,
    /// 每个分组已计分场次的区间串, 如 "1-4,6"
    pub scored_ranges: BTreeMap<Division, String>,
    pub discarded_races: Vec<DiscardedRace>,
}

// ==========================================
// ScoringApi - 计分服务
// ==========================================
pub struct ScoringApi {
    repo: Arc<dyn RegattaRepository>,
    config: EngineConfig,
    aggregator: ScoreAggregator,
    rankers: RankerRegistry,
    fleet_ranker: FleetRanker,
    rotation: RotationGenerator,
    guard: FinalizationGuard,
    locks: Arc<RegattaLocks>,
    event_publisher: OptionalEventPublisher,
}

impl ScoringApi {
    /// 创建计分服务
    ///
    /// # 参数
    /// - `repo`: 数据访问实现
    /// - `config`: 引擎配置
    /// - `event_publisher`: 可选的事件发布者
    pub fn new(
        repo: Arc<dyn RegattaRepository>,
        config: EngineConfig,
        event_publisher: Option<Arc<dyn ScoreEventPublisher>>,
    ) -> Self {
        Self::with_locks(repo, config, event_publisher, Arc::new(RegattaLocks::new()))
    }

    /// 创建与其他实例共享赛事锁的计分服务
    ///
    /// 同一存储上的多个实例须共享同一组锁, 重算才会跨实例串行
    pub fn with_locks(
        repo: Arc<dyn RegattaRepository>,
        config: EngineConfig,
        event_publisher: Option<Arc<dyn ScoreEventPublisher>>,
        locks: Arc<RegattaLocks>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };
        let fleet_ranker = FleetRanker::new(config.team_penalty_points);

        Self {
            repo,
            aggregator: ScoreAggregator::new(config.breakdown_rounding),
            rankers: RankerRegistry::new(fleet_ranker.clone(), TeamRecordRanker::new()),
            fleet_ranker,
            rotation: RotationGenerator::new(config.default_sail_sort, config.allow_bye),
            guard: FinalizationGuard::new(),
            locks,
            event_publisher,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locks(&self) -> Arc<RegattaLocks> {
        Arc::clone(&self.locks)
    }

    // ==========================================
    // 全量重算
    // ==========================================

    /// 全量重算赛事成绩与排名
    ///
    /// # 返回
    /// - Ok(RescoreOutcome): 成绩条数不符的场次被丢弃并列出
    /// - Err(Internal): 存在重复成绩, 未写入任何数据
    #[instrument(skip(self), fields(regatta_id = %regatta_id))]
    pub fn rescore(&self, regatta_id: &str) -> ApiResult<RescoreOutcome> {
        self.locks
            .with_scoring(regatta_id, || self.rescore_locked(regatta_id))
    }

    fn rescore_locked(&self, regatta_id: &str) -> ApiResult<RescoreOutcome> {
        let regatta = self.repo.load_regatta(regatta_id)?;
        let teams = self.repo.load_teams(regatta_id)?;
        let races = self.repo.load_races(regatta_id, None)?;
        let divisions: Vec<Division> = races
            .iter()
            .map(|r| r.division)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let expected = expected_finish_count(regatta.scoring, teams.len(), divisions.len());
        let finishes = self.repo.load_all_finishes(regatta_id)?;
        let report = self
            .aggregator
            .score_regatta(regatta.scoring, expected, finishes)?;
        self.repo.save_finishes(regatta_id, &report.finishes)?;

        let mut penalties = Vec::new();
        for division in &divisions {
            penalties.extend(self.repo.load_team_penalties(regatta_id, *division)?);
        }

        let input = RankingInput {
            teams: &teams,
            races: &races,
            finishes: &report.finishes,
            penalties: &penalties,
            divisions: &divisions,
        };
        let ranking = self
            .rankers
            .rank(RankerKind::for_scoring(regatta.scoring), &input);

        let division_rankings = if regatta.scoring == ScoringType::Standard {
            divisions
                .iter()
                .map(|d| {
                    (
                        *d,
                        self.fleet_ranker
                            .rank_division(&teams, &report.finishes, &penalties, *d),
                    )
                })
                .collect()
        } else {
            BTreeMap::new()
        };

        let footnotes = match &ranking {
            Ranking::Fleet(results) => assign_symbols(results),
            Ranking::TeamRecord(_) => Vec::new(),
        };

        let mut by_division: BTreeMap<Division, Vec<u32>> = BTreeMap::new();
        for race in &report.scored_races {
            by_division.entry(race.division).or_default().push(race.number);
        }
        let scored_ranges = by_division
            .into_iter()
            .map(|(d, numbers)| (d, make_range(&numbers)))
            .collect();

        info!(
            "重算完成: regatta_id={}, scoring={}, scored_races={}, discarded_races={}",
            regatta_id,
            regatta.scoring,
            report.scored_races.len(),
            report.discarded.len()
        );
        self.event_publisher.publish(ScoreEvent::regatta_wide(
            regatta_id,
            ScoreEventType::Rescored,
        ));

        Ok(RescoreOutcome {
            regatta_id: regatta.id,
            scoring: regatta.scoring,
            ranking,
            division_rankings,
            footnotes,
            scored_races: report.scored_races,
            scored_ranges,
            discarded_races: report.discarded,
        })
    }

    // ==========================================
    // 成绩与修正项
    // ==========================================

    /// 录入单个场次的完赛顺序并重算
    ///
    /// # 参数
    /// - `race`: 场次
    /// - `team_order`: 按完赛先后排列的队伍 ID
    /// - `started_at`: 第一条成绩的录入时间, 其后每条递增 1 秒
    ///
    /// # 说明
    /// 同队已有成绩上的修正项会被保留;
    /// 新顺序须包含该场次已有成绩的全部队伍, 否则拒绝
    #[instrument(skip(self, team_order), fields(regatta_id = %regatta_id, race = %race))]
    pub fn record_finishes(
        &self,
        regatta_id: &str,
        race: RaceId,
        team_order: &[String],
        started_at: DateTime<Utc>,
    ) -> ApiResult<RescoreOutcome> {
        let mut seen = HashSet::new();
        if let Some(dup) = team_order.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ApiError::ValidationError(format!(
                "场次 {} 队伍重复: {}",
                race, dup
            )));
        }

        self.locks.with_scoring(regatta_id, || -> ApiResult<_> {
            let existing = self.repo.load_finishes(regatta_id, race)?;
            if let Some(missing) = existing.iter().find(|f| !seen.contains(f.team_id.as_str())) {
                return Err(ApiError::ValidationError(format!(
                    "场次 {} 新顺序缺少已有成绩的队伍: {}",
                    race, missing.team_id
                )));
            }
            let finishes: Vec<Finish> = team_order
                .iter()
                .enumerate()
                .map(|(i, team_id)| {
                    let mut finish =
                        Finish::new(race, team_id, started_at + Duration::seconds(i as i64));
                    finish.modifier = existing
                        .iter()
                        .find(|f| f.team_id == *team_id)
                        .and_then(|f| f.modifier.clone());
                    finish
                })
                .collect();

            self.repo.save_finishes(regatta_id, &finishes)?;
            info!("场次 {} 录入 {} 条成绩", race, finishes.len());
            self.rescore_locked(regatta_id)
        })
    }

    /// 设置或清除修正项, 校验通过后写入并重算
    ///
    /// # 返回
    /// - Err(ModifierConflict): 校验失败, 原状态不变
    #[instrument(skip(self, modifier), fields(regatta_id = %regatta_id, race = %key.race, team = %key.team_id))]
    pub fn set_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
        modifier: Option<Modifier>,
    ) -> ApiResult<RescoreOutcome> {
        self.locks.with_scoring(regatta_id, || -> ApiResult<_> {
            if let Some(modifier) = &modifier {
                let regatta = self.repo.load_regatta(regatta_id)?;
                let fleet = self.race_fleet(&regatta, key.race)?;
                if let Err(e) = self.aggregator.validate_modifier(&fleet, key, modifier) {
                    warn!("修正项被拒绝: {}", e);
                    return Err(e.into());
                }
            }

            self.repo.save_modifier(regatta_id, key, modifier.as_ref())?;
            self.rescore_locked(regatta_id)
        })
    }

    /// 与目标场次同一计分场次的全部成绩（合并计分跨分组）
    fn race_fleet(&self, regatta: &Regatta, race: RaceId) -> ApiResult<Vec<Finish>> {
        if regatta.scoring.merges_divisions() {
            Ok(self
                .repo
                .load_all_finishes(&regatta.id)?
                .into_iter()
                .filter(|f| f.race.number == race.number)
                .collect())
        } else {
            Ok(self.repo.load_finishes(&regatta.id, race)?)
        }
    }

    // ==========================================
    // 轮换
    // ==========================================

    /// 生成并保存轮换（全有或全无）
    #[instrument(skip(self, request), fields(regatta_id = %regatta_id, style = %request.style))]
    pub fn generate_rotation(
        &self,
        regatta_id: &str,
        request: &RotationRequest,
    ) -> ApiResult<Vec<RotationAssignment>> {
        self.locks.with_rotation(regatta_id, || -> ApiResult<_> {
            self.repo.load_regatta(regatta_id)?;
            let teams = self.repo.load_teams(regatta_id)?;
            let known: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();
            if let Some(entry) = request
                .entries
                .iter()
                .find(|e| e.team.team_id().is_some_and(|id| !known.contains(id)))
            {
                return Err(ApiError::ValidationError(format!(
                    "队伍 {} 不属于赛事 {}",
                    entry.team, regatta_id
                )));
            }

            let existing = self.repo.load_rotation(regatta_id)?;
            let assignments = self.rotation.generate(request, &existing)?;
            self.repo.save_rotation_assignments(regatta_id, &assignments)?;

            let races: Vec<RaceId> = assignments
                .iter()
                .map(|a| a.race)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            self.event_publisher.publish(ScoreEvent::for_races(
                regatta_id,
                ScoreEventType::RotationAssigned,
                races,
            ));
            Ok(assignments)
        })
    }

    // ==========================================
    // 封榜
    // ==========================================

    /// 封榜检查
    #[instrument(skip(self), fields(regatta_id = %regatta_id))]
    pub fn check_finalizable(&self, regatta_id: &str) -> ApiResult<FinalizationReport> {
        self.finalization_report(regatta_id)
    }

    fn finalization_report(&self, regatta_id: &str) -> ApiResult<FinalizationReport> {
        let regatta = self.repo.load_regatta(regatta_id)?;
        let races = self.repo.load_races(regatta_id, None)?;
        let scored: Vec<RaceId> = self
            .repo
            .load_all_finishes(regatta_id)?
            .iter()
            .filter(|f| f.score.is_some())
            .map(|f| f.race)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(self.guard.check(regatta.scoring, &races, &scored))
    }

    /// 封榜: 删除末尾未计分场次并标记赛事
    ///
    /// # 返回
    /// - Err(FinalizationBlocked): 存在中间未计分场次, 未做任何修改
    /// - Err(ValidationError): 赛事没有任何已计分场次
    #[instrument(skip(self), fields(regatta_id = %regatta_id))]
    pub fn finalize(&self, regatta_id: &str) -> ApiResult<FinalizationReport> {
        self.locks.with_scoring(regatta_id, || -> ApiResult<_> {
            let report = self.finalization_report(regatta_id)?;
            report.ensure_finalizable()?;

            let total_races = self.repo.load_races(regatta_id, None)?.len();
            if report.removable.len() == total_races {
                return Err(ApiError::ValidationError(format!(
                    "赛事 {} 没有已计分场次",
                    regatta_id
                )));
            }

            if !report.removable.is_empty() {
                let deleted = self.repo.delete_races(regatta_id, &report.removable)?;
                info!("封榜删除末尾未计分场次: {}", deleted);
            }
            self.repo.mark_finalized(regatta_id, Utc::now())?;

            self.event_publisher.publish(ScoreEvent::regatta_wide(
                regatta_id,
                ScoreEventType::Finalized,
            ));
            Ok(report)
        })
    }
}
