// ==========================================
// 帆船赛计分引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 除 InvariantViolation 外均可恢复, 不得导致进程崩溃
// ==========================================

use crate::domain::regatta::RaceId;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// 轮换请求或输入格式错误
    #[error("请求校验失败: {0}")]
    Validation(String),

    /// 场次成绩条数与参赛船数不符
    #[error("场次成绩不完整: race={race}, expected={expected}, actual={actual}")]
    IncompleteScoring {
        race: String,
        expected: usize,
        actual: usize,
    },

    /// 修正分值冲突（补偿不优于自然名次 / 罚分超过船队规模+1）
    #[error("修正项冲突: {0}")]
    ModifierConflict(String),

    /// 存在未完成的中间场次
    #[error("无法封榜: {} 个中间场次未计分", .races.len())]
    FinalizationBlocked { races: Vec<RaceId> },

    /// 内部不变式被破坏（如同一场次同一队伍重复成绩）
    #[error("内部不变式被破坏: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// 是否为致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::InvariantViolation(_))
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
