// ==========================================
// 帆船赛计分引擎 - 轮换生成器
// ==========================================
// 职责: 为 (场次, 队伍) 分配帆号
// 方式: 标准 / 交换 / 平移 / Franny (模板 + 平移)
// 红线: 全有或全无, 校验失败不产生任何分配
// ==========================================

mod generator;
mod sorting;


pub use generator::{parse_style, RotationGenerator};
pub use sorting::{compare_sails, sort_entries, sort_sails};
