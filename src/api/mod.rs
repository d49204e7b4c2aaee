// ==========================================
// 帆船赛计分引擎 - API 层
// ==========================================
// 职责: 提供重算/轮换/封榜入口, 供命令行与宿主程序调用
// ==========================================

pub mod error;
pub mod lock;
pub mod scoring_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use lock::RegattaLocks;
pub use scoring_api::{RescoreOutcome, ScoringApi};
