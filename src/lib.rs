// ==========================================
// 帆船赛计分引擎 - 核心库
// ==========================================
// 职责: 成绩计算、排名、轮换生成与封榜校验
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 计分规则
pub mod engine;

// 配置层 - 引擎配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BreakdownType, Division, PenaltyType, SailSortMode, ScoringType, TeamPenaltyType,
};

// 领域实体
pub use domain::{
    Finish, FinishKey, Modifier, Race, RaceId, RankResult, Ranking, Regatta, RotationAssignment,
    RotationRequest, Team, TeamPenalty,
};

// 引擎
pub use engine::{
    FinalizationGuard, FleetRanker, RankerRegistry, RotationGenerator, ScoreAggregator,
    TeamRecordRanker,
};

// API
pub use api::{ApiError, ApiResult, RescoreOutcome, ScoringApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "帆船赛计分引擎";
