// ==========================================
// 帆船赛计分引擎 - 赛事数据访问接口
// ==========================================
// 职责: 定义计分引擎消费的数据访问契约
// 实现者: SqliteRegattaRepository / MemoryRegattaRepository
// 红线: Repository 不含计分规则, 只做数据读写
// ==========================================

use crate::domain::regatta::{Finish, FinishKey, Modifier, Race, RaceId, Regatta, Team, TeamPenalty};
use crate::domain::rotation::RotationAssignment;
use crate::domain::types::Division;
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};

// ==========================================
// RegattaRepository Trait
// ==========================================
pub trait RegattaRepository: Send + Sync {
    // ===== 赛事与参赛数据 =====

    /// 读取赛事头信息
    ///
    /// # 返回
    /// - Err(NotFound): 赛事不存在
    fn load_regatta(&self, regatta_id: &str) -> RepositoryResult<Regatta>;

    /// 读取参赛队伍（按登记顺序）
    fn load_teams(&self, regatta_id: &str) -> RepositoryResult<Vec<Team>>;

    /// 读取场次; division 为 None 时返回全部分组
    fn load_races(&self, regatta_id: &str, division: Option<Division>)
        -> RepositoryResult<Vec<Race>>;

    /// 读取某分组的队伍罚分
    fn load_team_penalties(
        &self,
        regatta_id: &str,
        division: Division,
    ) -> RepositoryResult<Vec<TeamPenalty>>;

    // ===== 成绩与修正项 =====

    /// 读取单个场次的成绩（按录入时间）
    fn load_finishes(&self, regatta_id: &str, race: RaceId) -> RepositoryResult<Vec<Finish>>;

    /// 读取赛事全部成绩
    fn load_all_finishes(&self, regatta_id: &str) -> RepositoryResult<Vec<Finish>>;

    /// 保存成绩（按 (场次, 队伍) 覆盖, 单事务）
    fn save_finishes(&self, regatta_id: &str, finishes: &[Finish]) -> RepositoryResult<()>;

    /// 读取成绩上的修正项
    fn load_modifier(&self, regatta_id: &str, key: &FinishKey)
        -> RepositoryResult<Option<Modifier>>;

    /// 设置或清除成绩上的修正项
    ///
    /// # 返回
    /// - Err(NotFound): 成绩不存在
    fn save_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
        modifier: Option<&Modifier>,
    ) -> RepositoryResult<()>;

    // ===== 轮换 =====

    /// 读取赛事全部轮换
    fn load_rotation(&self, regatta_id: &str) -> RepositoryResult<Vec<RotationAssignment>>;

    /// 保存轮换: 涉及场次的原有分配被整体替换（单事务）
    fn save_rotation_assignments(
        &self,
        regatta_id: &str,
        assignments: &[RotationAssignment],
    ) -> RepositoryResult<()>;

    // ===== 封榜 =====

    /// 删除场次及其成绩与轮换
    ///
    /// # 返回
    /// 实际删除的场次数
    fn delete_races(&self, regatta_id: &str, races: &[RaceId]) -> RepositoryResult<usize>;

    /// 标记赛事已封榜
    fn mark_finalized(&self, regatta_id: &str, at: DateTime<Utc>) -> RepositoryResult<()>;
}
