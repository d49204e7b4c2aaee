// ==========================================
// 帆船赛计分引擎 - 数据仓储层
// ==========================================
// 职责: 实现引擎消费的数据访问契约, 屏蔽存储细节
// 约束: 所有查询使用参数化, Repository 不含计分规则
// ==========================================

pub mod error;
pub mod memory_repo;
pub mod regatta_repo;
pub mod sqlite_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use memory_repo::MemoryRegattaRepository;
pub use regatta_repo::RegattaRepository;
pub use sqlite_repo::SqliteRegattaRepository;
