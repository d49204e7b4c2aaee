// ==========================================
// 帆船赛计分引擎 - 对抗赛战绩排名器
// ==========================================
// 职责: 按两队对抗结果统计胜/负/平并排名
// 输入: A 组代表场次 (tr_team1 / tr_team2 / tr_ignore) + 已计分成绩
// 输出: TeamRank 列表
// ==========================================
// 排序键:
// 1) 胜率降序
// 2) 胜场降序
// 3) 负场升序
// 4) 显示名称字节序升序 (说明 "Alphabetical")
// ==========================================

use crate::domain::rank::TeamRank;
use crate::domain::regatta::{Finish, Race, Team};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 字母序加赛说明
pub const EXPLANATION_ALPHABETICAL: &str = "Alphabetical";

/// 单队战绩
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRecord {
    pub team_id: String,
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl TeamRecord {
    pub fn new(team: &Team) -> Self {
        Self {
            team_id: team.id.clone(),
            display_name: team.display_name(),
            wins: 0,
            losses: 0,
            ties: 0,
        }
    }

    fn total(&self) -> u64 {
        (self.wins + self.losses + self.ties) as u64
    }
}

/// 比较胜率（交叉相乘, 0 场视为 0%）
fn compare_win_percentage(a: &TeamRecord, b: &TeamRecord) -> Ordering {
    let a_total = a.total().max(1);
    let b_total = b.total().max(1);
    // 降序: b 的胜率与 a 比较
    (b.wins as u64 * a_total).cmp(&(a.wins as u64 * b_total))
}

/// 前三级排序键比较（不含字母序）
fn compare_record_keys(a: &TeamRecord, b: &TeamRecord) -> Ordering {
    compare_win_percentage(a, b)
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| a.losses.cmp(&b.losses))
}

/// 战绩比较器, 可直接用于稳定排序
///
/// # 返回
/// Ordering::Less 表示 a 排在 b 前
pub fn compare_records(a: &TeamRecord, b: &TeamRecord) -> Ordering {
    compare_record_keys(a, b).then_with(|| a.display_name.as_bytes().cmp(b.display_name.as_bytes()))
}

// ==========================================
// TeamRecordRanker - 对抗赛战绩排名器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TeamRecordRanker;

impl TeamRecordRanker {
    pub fn new() -> Self {
        Self
    }

    /// 统计各队战绩
    ///
    /// # 参数
    /// - `teams`: 全部队伍, 未参赛队伍以 0-0-0 出现
    /// - `races`: 代表场次 (通常为 A 组)
    /// - `finishes`: 所有分组的已计分成绩
    pub fn tally(&self, teams: &[Team], races: &[Race], finishes: &[Finish]) -> Vec<TeamRecord> {
        let mut records: Vec<TeamRecord> = teams.iter().map(TeamRecord::new).collect();
        let index: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.team_id.clone(), i))
            .collect();

        // (场次号, 队伍) -> 分数和
        let mut sums: HashMap<(u32, &str), i32> = HashMap::new();
        for finish in finishes {
            if let Some(score) = finish.score {
                *sums
                    .entry((finish.race.number, finish.team_id.as_str()))
                    .or_insert(0) += score;
            }
        }

        for race in races {
            if race.tr_ignore {
                debug!("场次 {} 标记为不计入战绩", race.id());
                continue;
            }
            let (Some(team1), Some(team2)) = (race.tr_team1.as_deref(), race.tr_team2.as_deref())
            else {
                warn!("场次 {} 缺少对阵队伍，跳过", race.id());
                continue;
            };
            if team1 == team2 {
                warn!("场次 {} 对阵双方相同，跳过", race.id());
                continue;
            }
            let (Some(&i1), Some(&i2)) = (index.get(team1), index.get(team2)) else {
                warn!("场次 {} 对阵队伍不在参赛名单中，跳过", race.id());
                continue;
            };
            let (Some(sum1), Some(sum2)) = (
                sums.get(&(race.number, team1)).copied(),
                sums.get(&(race.number, team2)).copied(),
            ) else {
                // 未计分场次
                continue;
            };

            match sum1.cmp(&sum2) {
                Ordering::Less => {
                    records[i1].wins += 1;
                    records[i2].losses += 1;
                }
                Ordering::Greater => {
                    records[i1].losses += 1;
                    records[i2].wins += 1;
                }
                Ordering::Equal => {
                    records[i1].ties += 1;
                    records[i2].ties += 1;
                }
            }
        }

        records
    }

    /// 统计并排名
    ///
    /// # 返回
    /// 按名次排列的 TeamRank; 完全相同的队伍保持输入顺序并共享名次
    pub fn rank(&self, teams: &[Team], races: &[Race], finishes: &[Finish]) -> Vec<TeamRank> {
        let mut records = self.tally(teams, races, finishes);
        records.sort_by(compare_records);

        let mut ranks: Vec<TeamRank> = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let rank = if i > 0 && compare_records(&records[i - 1], record) == Ordering::Equal {
                ranks[i - 1].rank
            } else {
                i as u32 + 1
            };

            let reached_alphabetical = (i > 0
                && compare_record_keys(&records[i - 1], record) == Ordering::Equal)
                || records
                    .get(i + 1)
                    .is_some_and(|next| compare_record_keys(record, next) == Ordering::Equal);

            ranks.push(TeamRank {
                team_id: record.team_id.clone(),
                rank,
                wins: record.wins,
                losses: record.losses,
                ties: record.ties,
                explanation: if reached_alphabetical {
                    EXPLANATION_ALPHABETICAL.to_string()
                } else {
                    String::new()
                },
            });
        }

        debug!("对抗赛排名完成: teams={}", ranks.len());
        ranks
    }
}
