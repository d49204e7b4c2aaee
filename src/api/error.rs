// ==========================================
// 帆船赛计分引擎 - API层错误类型
// ==========================================
// 职责: 将引擎与仓储错误转换为调用方可处理的类型化错误
// 约束: 封榜阻塞以场次列表呈现; 不变式破坏单独归类
// ==========================================

use crate::domain::regatta::RaceId;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 计分规则错误（可恢复）
    // ==========================================
    #[error("请求校验失败: {0}")]
    ValidationError(String),

    #[error("修正项冲突: {0}")]
    ModifierConflict(String),

    #[error("场次成绩不完整: race={race}, expected={expected}, actual={actual}")]
    IncompleteScoring {
        race: String,
        expected: usize,
        actual: usize,
    },

    #[error("无法封榜: 阻塞场次 {}", format_races(.races))]
    FinalizationBlocked { races: Vec<RaceId> },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 致命错误
    // ==========================================
    /// 内部不变式被破坏, 调用方不应重试
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Internal(_))
    }
}

fn format_races(races: &[RaceId]) -> String {
    races
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::ValidationError(msg),
            EngineError::ModifierConflict(msg) => ApiError::ModifierConflict(msg),
            EngineError::IncompleteScoring {
                race,
                expected,
                actual,
            } => ApiError::IncompleteScoring {
                race,
                expected,
                actual,
            },
            EngineError::FinalizationBlocked { races } => ApiError::FinalizationBlocked { races },
            EngineError::InvariantViolation(msg) => ApiError::Internal(msg),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
