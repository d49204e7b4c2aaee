// ==========================================
// 帆船赛计分引擎 - 引擎层
// ==========================================
// 职责: 计分、排名、轮换、封榜校验等纯算法
// 红线: Engine 不拼 SQL, 不持有全局状态, 每次全量重算
// ==========================================

pub mod error;
pub mod events;
pub mod finalization;
pub mod fleet_ranker;
pub mod race_range;
pub mod ranker;
pub mod rotation;
pub mod score_aggregator;
pub mod team_record_ranker;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, ScoreEvent, ScoreEventPublisher, ScoreEventType,
};
pub use finalization::{FinalizationGuard, FinalizationReport};
pub use fleet_ranker::{assign_symbols, footnote_symbol, FleetRanker, DEFAULT_TEAM_PENALTY_POINTS};
pub use race_range::{make_range, parse_range, RaceRange};
pub use ranker::{RankerKind, RankerRegistry, RankingInput};
pub use rotation::{parse_style, RotationGenerator};
pub use score_aggregator::{expected_finish_count, DiscardedRace, ScoreAggregator, ScoringReport};
pub use team_record_ranker::{compare_records, TeamRecord, TeamRecordRanker};
