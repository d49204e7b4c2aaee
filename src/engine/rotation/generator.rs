use crate::domain::regatta::RaceId;
use crate::domain::rotation::{
    RotationAssignment, RotationEntry, RotationRequest, RotationStyle, TeamRef,
};
use crate::domain::types::{Division, SailSortMode};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::HashSet;
use tracing::{debug, info};

use super::sorting::{sort_entries, sort_sails};

/// 解析轮换方式标签
pub fn parse_style(tag: &str) -> EngineResult<RotationStyle> {
    tag.parse::<RotationStyle>().map_err(EngineError::Validation)
}

// ==========================================
// RotationGenerator - 轮换生成器
// ==========================================
// 无状态引擎, 默认排序方式与轮空开关来自配置
#[derive(Debug, Clone)]
pub struct RotationGenerator {
    default_sort: SailSortMode,
    default_allow_bye: bool,
}

impl Default for RotationGenerator {
    fn default() -> Self {
        Self::new(SailSortMode::AsGiven, true)
    }
}

impl RotationGenerator {
    pub fn new(default_sort: SailSortMode, default_allow_bye: bool) -> Self {
        Self {
            default_sort,
            default_allow_bye,
        }
    }

    // ==========================================
    // 入口
    // ==========================================

    /// 按请求生成轮换
    ///
    /// # 参数
    /// - `request`: 轮换请求
    /// - `existing`: 赛事现有轮换（仅 Offset 使用其源分组）
    ///
    /// # 返回
    /// - Ok(Vec<RotationAssignment>): 全部分配
    /// - Err(Validation): 请求不合法, 不产生任何分配
    pub fn generate(
        &self,
        request: &RotationRequest,
        existing: &[RotationAssignment],
    ) -> EngineResult<Vec<RotationAssignment>> {
        validate_request(request)?;
        let sort = request.sort.unwrap_or(self.default_sort);
        let allow_bye = request.allow_bye.unwrap_or(self.default_allow_bye);

        let assignments = match request.style {
            RotationStyle::Standard => {
                let mut out = Vec::new();
                for division in &request.divisions {
                    let entries = division_entries(request, *division, sort)?;
                    let fleet = resolve_fleet(request, &entries, sort)?;
                    out.extend(self.standard(
                        &entries,
                        &fleet,
                        &request.races,
                        request.repeat_set_size,
                    )?);
                }
                out
            }
            RotationStyle::Swap => {
                let mut entries = Vec::new();
                for division in &request.divisions {
                    entries.extend(division_entries(request, *division, sort)?);
                }
                let fleet = resolve_fleet(request, &entries, sort)?;
                self.swap(
                    entries,
                    &fleet,
                    &request.races,
                    request.repeat_set_size,
                    allow_bye,
                )?
            }
            RotationStyle::Offset => self.offset_request(request, existing, sort)?,
            RotationStyle::FrannyStandard | RotationStyle::FrannySwap => {
                self.franny(request, sort, allow_bye)?
            }
        };

        info!(
            "轮换生成完成: style={}, divisions={}, races={}, assignments={}",
            request.style,
            request.divisions.len(),
            request.races.len(),
            assignments.len()
        );
        Ok(assignments)
    }

    // ==========================================
    // 标准轮换
    // ==========================================

    /// 标准轮换: 每组场次各队帆号在船队中前进一位（循环）
    ///
    /// # 参数
    /// - `entries`: 单个分组的起始条目（已排序）
    /// - `fleet`: 船队帆号（已排序）
    /// - `races`: 场次号
    /// - `set_size`: 每组场次数
    pub fn standard(
        &self,
        entries: &[RotationEntry],
        fleet: &[String],
        races: &[u32],
        set_size: u32,
    ) -> EngineResult<Vec<RotationAssignment>> {
        let positions = entries
            .iter()
            .map(|e| fleet_index(fleet, &e.sail))
            .collect::<EngineResult<Vec<usize>>>()?;

        let mut out = Vec::with_capacity(entries.len() * races.len());
        for (p, number) in races.iter().enumerate() {
            let set = p / set_size as usize;
            for (entry, idx) in entries.iter().zip(&positions) {
                out.push(RotationAssignment {
                    race: RaceId::new(entry.division, *number),
                    team: entry.team.clone(),
                    sail: fleet[(idx + set) % fleet.len()].clone(),
                });
            }
        }
        Ok(out)
    }

    // ==========================================
    // 交换轮换
    // ==========================================

    /// 交换轮换: 位置按 0,2,4,..., 奇数位倒序 连成环, 每组场次前进一步
    ///
    /// 偶数位伙伴帆号上移、奇数位伙伴下移, 到端点折返。
    /// 条目数为奇数时追加轮空队（需允许轮空）。
    pub fn swap(
        &self,
        mut entries: Vec<RotationEntry>,
        fleet: &[String],
        races: &[u32],
        set_size: u32,
        allow_bye: bool,
    ) -> EngineResult<Vec<RotationAssignment>> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.sail.as_str()) {
                return Err(EngineError::Validation(format!(
                    "交换轮换帆号重复: {}",
                    entry.sail
                )));
            }
        }

        if entries.len() % 2 == 1 {
            if !allow_bye {
                return Err(EngineError::Validation(format!(
                    "交换轮换需要偶数个条目 (当前 {}), 且未允许轮空",
                    entries.len()
                )));
            }
            let Some(last) = entries.last() else {
                return Err(EngineError::Validation("交换轮换缺少起始帆号".to_string()));
            };
            let bye = RotationEntry {
                team: TeamRef::Bye,
                division: last.division,
                sail: bye_sail(&entries, fleet),
            };
            debug!("交换轮换追加轮空队: sail={}", bye.sail);
            entries.push(bye);
        }

        let n = entries.len();
        let cycle: Vec<usize> = (0..n).step_by(2).chain((1..n).step_by(2).rev()).collect();
        let mut cycle_index = vec![0usize; n];
        for (c, pos) in cycle.iter().enumerate() {
            cycle_index[*pos] = c;
        }

        let mut out = Vec::with_capacity(n * races.len());
        for (p, number) in races.iter().enumerate() {
            let set = p / set_size as usize;
            for (i, entry) in entries.iter().enumerate() {
                let pos = cycle[(cycle_index[i] + set) % n];
                out.push(RotationAssignment {
                    race: RaceId::new(entry.division, *number),
                    team: entry.team.clone(),
                    sail: entries[pos].sail.clone(),
                });
            }
        }
        Ok(out)
    }

    // ==========================================
    // 平移轮换
    // ==========================================

    /// 平移: 将源轮换逐场复制到目标分组, 帆号在船队中平移 amount 位（循环）
    pub fn offset(
        &self,
        source: &[RotationAssignment],
        fleet: &[String],
        target: Division,
        amount: i32,
    ) -> EngineResult<Vec<RotationAssignment>> {
        if fleet.is_empty() {
            return Err(EngineError::Validation("平移轮换船队为空".to_string()));
        }
        let len = fleet.len() as i64;

        source
            .iter()
            .map(|a| {
                let idx = fleet_index(fleet, &a.sail)? as i64;
                let shifted = (idx + amount as i64).rem_euclid(len) as usize;
                Ok(RotationAssignment {
                    race: RaceId::new(target, a.race.number),
                    team: a.team.clone(),
                    sail: fleet[shifted].clone(),
                })
            })
            .collect()
    }

    fn offset_request(
        &self,
        request: &RotationRequest,
        existing: &[RotationAssignment],
        sort: SailSortMode,
    ) -> EngineResult<Vec<RotationAssignment>> {
        let shift = request
            .offset
            .ok_or_else(|| EngineError::Validation("平移轮换缺少 offset 参数".to_string()))?;

        let source: Vec<RotationAssignment> = existing
            .iter()
            .filter(|a| a.race.division == shift.source && request.races.contains(&a.race.number))
            .cloned()
            .collect();
        if source.is_empty() {
            return Err(EngineError::Validation(format!(
                "源分组 {} 在所选场次上没有轮换",
                shift.source
            )));
        }

        let fleet = match &request.fleet {
            Some(fleet) => prepare_fleet(fleet, sort)?,
            None => {
                // 源轮换按 (场次, 队伍) 存储, 顺序与船无关, 须按帆号本身排序
                let mut seen = HashSet::new();
                let mut sails: Vec<String> = source
                    .iter()
                    .filter(|a| seen.insert(a.sail.as_str()))
                    .map(|a| a.sail.clone())
                    .collect();
                let derived_sort = match sort {
                    SailSortMode::AsGiven => SailSortMode::Numeric,
                    other => other,
                };
                sort_sails(&mut sails, derived_sort);
                sails
            }
        };

        let targets: Vec<Division> = request
            .divisions
            .iter()
            .copied()
            .filter(|d| *d != shift.source)
            .collect();
        if targets.is_empty() {
            return Err(EngineError::Validation("平移轮换没有目标分组".to_string()));
        }

        let mut out = Vec::new();
        for division in targets {
            out.extend(self.offset(&source, &fleet, division, shift.amount)?);
        }
        Ok(out)
    }

    // ==========================================
    // Franny 轮换
    // ==========================================

    /// Franny: 首个分组生成模板, 第 i 个分组平移 (船队规模 / 分组数) * i
    fn franny(
        &self,
        request: &RotationRequest,
        sort: SailSortMode,
        allow_bye: bool,
    ) -> EngineResult<Vec<RotationAssignment>> {
        let template_division = request.divisions[0];
        let entries = division_entries(request, template_division, sort)?;
        let mut fleet = resolve_fleet(request, &entries, sort)?;

        let template = match request.style {
            RotationStyle::FrannySwap => self.swap(
                entries,
                &fleet,
                &request.races,
                request.repeat_set_size,
                allow_bye,
            )?,
            _ => self.standard(&entries, &fleet, &request.races, request.repeat_set_size)?,
        };

        // 轮空队帆号可能不在船队中, 平移前补入
        for assignment in &template {
            if !fleet.contains(&assignment.sail) {
                fleet.push(assignment.sail.clone());
            }
        }

        let step = fleet.len() / request.divisions.len();
        let mut out = template.clone();
        for (i, division) in request.divisions.iter().enumerate().skip(1) {
            let amount = i32::try_from(step * i).map_err(|_| {
                EngineError::Validation(format!("平移量溢出: {}", step * i))
            })?;
            out.extend(self.offset(&template, &fleet, *division, amount)?);
        }
        Ok(out)
    }
}

// ==========================================
// 校验与准备
// ==========================================

fn validate_request(request: &RotationRequest) -> EngineResult<()> {
    if request.repeat_set_size < 1 {
        return Err(EngineError::Validation(
            "repeat_set_size 必须不小于 1".to_string(),
        ));
    }
    if request.races.is_empty() {
        return Err(EngineError::Validation("未选择任何场次".to_string()));
    }
    if request.divisions.is_empty() {
        return Err(EngineError::Validation("未选择任何分组".to_string()));
    }

    let mut divisions = HashSet::new();
    if !request.divisions.iter().all(|d| divisions.insert(*d)) {
        return Err(EngineError::Validation("分组重复".to_string()));
    }
    let mut races = HashSet::new();
    if !request.races.iter().all(|n| races.insert(*n)) {
        return Err(EngineError::Validation("场次号重复".to_string()));
    }
    if request.races.contains(&0) {
        return Err(EngineError::Validation("场次号必须不小于 1".to_string()));
    }
    Ok(())
}

/// 取出某分组的起始条目并排序, 校验帆号与队伍不重复
fn division_entries(
    request: &RotationRequest,
    division: Division,
    sort: SailSortMode,
) -> EngineResult<Vec<RotationEntry>> {
    let mut entries: Vec<RotationEntry> = request
        .entries
        .iter()
        .filter(|e| e.division == division)
        .cloned()
        .collect();
    if entries.is_empty() {
        return Err(EngineError::Validation(format!(
            "分组 {} 没有起始帆号",
            division
        )));
    }

    let mut sails = HashSet::new();
    let mut teams = HashSet::new();
    for entry in &entries {
        if !sails.insert(entry.sail.as_str()) {
            return Err(EngineError::Validation(format!(
                "分组 {} 帆号重复: {}",
                division, entry.sail
            )));
        }
        if !teams.insert(&entry.team) {
            return Err(EngineError::Validation(format!(
                "分组 {} 队伍重复: {}",
                division, entry.team
            )));
        }
    }

    sort_entries(&mut entries, sort);
    Ok(entries)
}

/// 船队: 显式给定时排序并校验包含全部起始帆号, 否则取起始帆号
fn resolve_fleet(
    request: &RotationRequest,
    entries: &[RotationEntry],
    sort: SailSortMode,
) -> EngineResult<Vec<String>> {
    match &request.fleet {
        Some(fleet) => {
            let fleet = prepare_fleet(fleet, sort)?;
            for entry in entries {
                if !fleet.contains(&entry.sail) {
                    return Err(EngineError::Validation(format!(
                        "帆号 {} 不在船队中",
                        entry.sail
                    )));
                }
            }
            Ok(fleet)
        }
        None => Ok(entries.iter().map(|e| e.sail.clone()).collect()),
    }
}

fn prepare_fleet(fleet: &[String], sort: SailSortMode) -> EngineResult<Vec<String>> {
    if fleet.is_empty() {
        return Err(EngineError::Validation("船队为空".to_string()));
    }
    let mut seen = HashSet::new();
    if !fleet.iter().all(|s| seen.insert(s.as_str())) {
        return Err(EngineError::Validation("船队帆号重复".to_string()));
    }
    let mut sorted = fleet.to_vec();
    sort_sails(&mut sorted, sort);
    Ok(sorted)
}

fn fleet_index(fleet: &[String], sail: &str) -> EngineResult<usize> {
    fleet
        .iter()
        .position(|s| s == sail)
        .ok_or_else(|| EngineError::Validation(format!("帆号 {} 不在船队中", sail)))
}

/// 轮空队帆号: 船队中首个未使用的帆号; 否则数字帆号最大值 + 1; 否则 "BYE"
fn bye_sail(entries: &[RotationEntry], fleet: &[String]) -> String {
    let used: HashSet<&str> = entries.iter().map(|e| e.sail.as_str()).collect();
    if let Some(free) = fleet.iter().find(|s| !used.contains(s.as_str())) {
        return free.clone();
    }

    let numeric: Option<Vec<u64>> = entries.iter().map(|e| e.sail.trim().parse().ok()).collect();
    match numeric.and_then(|v| v.into_iter().max()) {
        Some(max) => (max + 1).to_string(),
        None => "BYE".to_string(),
    }
}
