// ==========================================
// 帆船赛计分引擎 - 配置层
// ==========================================
// 职责: 引擎配置默认值与 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;

pub use config_manager::{config_keys, ConfigManager, ConfigResult};
pub use engine_config::{BreakdownRounding, EngineConfig};
