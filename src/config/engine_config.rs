// ==========================================
// 帆船赛计分引擎 - 引擎配置
// ==========================================
// 职责: 引擎可调参数及其默认值
// 来源: config_kv 覆写, 缺失键回落默认值
// ==========================================

use crate::domain::types::SailSortMode;
use crate::engine::fleet_ranker::DEFAULT_TEAM_PENALTY_POINTS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 自动补偿平均分的取整方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakdownRounding {
    /// 四舍五入（.5 进位）
    #[default]
    Round,
    /// 向下取整
    Truncate,
}

impl BreakdownRounding {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakdownRounding::Round => "ROUND",
            BreakdownRounding::Truncate => "TRUNCATE",
        }
    }
}

impl fmt::Display for BreakdownRounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BreakdownRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROUND" => Ok(BreakdownRounding::Round),
            "TRUNCATE" => Ok(BreakdownRounding::Truncate),
            other => Err(format!("未知取整方式: {}", other)),
        }
    }
}

// ==========================================
// EngineConfig - 引擎配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 每条队伍罚分的加分
    pub team_penalty_points: i32,
    /// 自动补偿平均分取整
    pub breakdown_rounding: BreakdownRounding,
    /// 轮换请求未指定排序时的默认排序
    pub default_sail_sort: SailSortMode,
    /// 轮换请求未指定时是否允许轮空补位
    pub allow_bye: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            team_penalty_points: DEFAULT_TEAM_PENALTY_POINTS,
            breakdown_rounding: BreakdownRounding::Round,
            default_sail_sort: SailSortMode::AsGiven,
            allow_bye: true,
        }
    }
}
