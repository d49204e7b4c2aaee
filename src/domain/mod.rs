// ==========================================
// 帆船赛计分引擎 - 领域层
// ==========================================
// 职责: 实体与封闭枚举, 不含计分规则
// ==========================================

pub mod rank;
pub mod regatta;
pub mod rotation;
pub mod types;

// 重导出核心实体
pub use rank::{RankResult, Ranking, TeamRank};
pub use regatta::{
    BreakdownModifier, Finish, FinishKey, Modifier, PenaltyModifier, Race, RaceId, Regatta, Team,
    TeamPenalty, AUTOMATIC_AMOUNT,
};
pub use rotation::{
    OffsetSpec, RotationAssignment, RotationEntry, RotationRequest, RotationStyle, TeamRef,
};
