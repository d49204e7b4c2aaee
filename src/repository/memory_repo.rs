// ==========================================
// 帆船赛计分引擎 - 内存赛事仓储
// ==========================================
// 职责: RegattaRepository 的内存实现（测试与嵌入式调用）
// 约束: 与 SQLite 实现保持相同的引用完整性检查
// ==========================================

use crate::domain::regatta::{Finish, FinishKey, Modifier, Race, RaceId, Regatta, Team, TeamPenalty};
use crate::domain::rotation::RotationAssignment;
use crate::domain::types::Division;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::regatta_repo::RegattaRepository;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct RegattaState {
    regatta: Regatta,
    teams: Vec<Team>,
    races: Vec<Race>,
    penalties: Vec<TeamPenalty>,
    finishes: Vec<Finish>,
    rotation: Vec<RotationAssignment>,
}

impl RegattaState {
    fn has_race(&self, race: RaceId) -> bool {
        self.races.iter().any(|r| r.id() == race)
    }

    fn has_team(&self, team_id: &str) -> bool {
        self.teams.iter().any(|t| t.id == team_id)
    }
}

// ==========================================
// MemoryRegattaRepository - 内存仓储
// ==========================================
#[derive(Debug, Default)]
pub struct MemoryRegattaRepository {
    regattas: RwLock<HashMap<String, RegattaState>>,
}

impl MemoryRegattaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<String, RegattaState>>> {
        self.regattas
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<String, RegattaState>>> {
        self.regattas
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn with_state<T>(
        &self,
        regatta_id: &str,
        f: impl FnOnce(&RegattaState) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let guard = self.read()?;
        let state = guard
            .get(regatta_id)
            .ok_or_else(|| RepositoryError::not_found("Regatta", regatta_id))?;
        f(state)
    }

    fn with_state_mut<T>(
        &self,
        regatta_id: &str,
        f: impl FnOnce(&mut RegattaState) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let mut guard = self.write()?;
        let state = guard
            .get_mut(regatta_id)
            .ok_or_else(|| RepositoryError::not_found("Regatta", regatta_id))?;
        f(state)
    }

    // ===== 登记数据（不属于计分契约）=====

    /// 登记赛事（已存在时只更新头信息）
    pub fn insert_regatta(&self, regatta: Regatta) -> RepositoryResult<()> {
        let mut guard = self.write()?;
        match guard.get_mut(&regatta.id) {
            Some(state) => state.regatta = regatta,
            None => {
                guard.insert(
                    regatta.id.clone(),
                    RegattaState {
                        regatta,
                        teams: Vec::new(),
                        races: Vec::new(),
                        penalties: Vec::new(),
                        finishes: Vec::new(),
                        rotation: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn insert_team(&self, regatta_id: &str, team: Team) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            if state.has_team(&team.id) {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "team {} 已存在",
                    team.id
                )));
            }
            state.teams.push(team);
            Ok(())
        })
    }

    pub fn insert_race(&self, regatta_id: &str, race: Race) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            if state.has_race(race.id()) {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "race {} 已存在",
                    race.id()
                )));
            }
            state.races.push(race);
            Ok(())
        })
    }

    pub fn insert_team_penalty(&self, regatta_id: &str, penalty: TeamPenalty) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            if !state.has_team(&penalty.team_id) {
                return Err(RepositoryError::ForeignKeyViolation(format!(
                    "team {} 不存在",
                    penalty.team_id
                )));
            }
            state.penalties.push(penalty);
            Ok(())
        })
    }
}

impl RegattaRepository for MemoryRegattaRepository {
    fn load_regatta(&self, regatta_id: &str) -> RepositoryResult<Regatta> {
        self.with_state(regatta_id, |state| Ok(state.regatta.clone()))
    }

    fn load_teams(&self, regatta_id: &str) -> RepositoryResult<Vec<Team>> {
        self.with_state(regatta_id, |state| Ok(state.teams.clone()))
    }

    fn load_races(
        &self,
        regatta_id: &str,
        division: Option<Division>,
    ) -> RepositoryResult<Vec<Race>> {
        self.with_state(regatta_id, |state| {
            let mut races: Vec<Race> = state
                .races
                .iter()
                .filter(|r| division.map_or(true, |d| r.division == d))
                .cloned()
                .collect();
            races.sort_by_key(|r| (r.division, r.number));
            Ok(races)
        })
    }

    fn load_team_penalties(
        &self,
        regatta_id: &str,
        division: Division,
    ) -> RepositoryResult<Vec<TeamPenalty>> {
        self.with_state(regatta_id, |state| {
            Ok(state
                .penalties
                .iter()
                .filter(|p| p.division == division)
                .cloned()
                .collect())
        })
    }

    fn load_finishes(&self, regatta_id: &str, race: RaceId) -> RepositoryResult<Vec<Finish>> {
        self.with_state(regatta_id, |state| {
            let mut finishes: Vec<Finish> = state
                .finishes
                .iter()
                .filter(|f| f.race == race)
                .cloned()
                .collect();
            finishes.sort_by_key(|f| f.entered_at);
            Ok(finishes)
        })
    }

    fn load_all_finishes(&self, regatta_id: &str) -> RepositoryResult<Vec<Finish>> {
        self.with_state(regatta_id, |state| {
            let mut finishes = state.finishes.clone();
            finishes.sort_by_key(|f| (f.race.number, f.race.division, f.entered_at));
            Ok(finishes)
        })
    }

    fn save_finishes(&self, regatta_id: &str, finishes: &[Finish]) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            // 先整体校验, 保证全有或全无
            for finish in finishes {
                if !state.has_race(finish.race) {
                    return Err(RepositoryError::ForeignKeyViolation(format!(
                        "race {} 不存在",
                        finish.race
                    )));
                }
                if !state.has_team(&finish.team_id) {
                    return Err(RepositoryError::ForeignKeyViolation(format!(
                        "team {} 不存在",
                        finish.team_id
                    )));
                }
            }

            for finish in finishes {
                match state.finishes.iter_mut().find(|f| f.key() == finish.key()) {
                    Some(existing) => *existing = finish.clone(),
                    None => state.finishes.push(finish.clone()),
                }
            }
            Ok(())
        })
    }

    fn load_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
    ) -> RepositoryResult<Option<Modifier>> {
        self.with_state(regatta_id, |state| {
            state
                .finishes
                .iter()
                .find(|f| f.key() == *key)
                .map(|f| f.modifier.clone())
                .ok_or_else(|| {
                    RepositoryError::not_found("Finish", format!("{}/{}", key.race, key.team_id))
                })
        })
    }

    fn save_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
        modifier: Option<&Modifier>,
    ) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            let finish = state
                .finishes
                .iter_mut()
                .find(|f| f.key() == *key)
                .ok_or_else(|| {
                    RepositoryError::not_found("Finish", format!("{}/{}", key.race, key.team_id))
                })?;
            finish.modifier = modifier.cloned();
            Ok(())
        })
    }

    fn load_rotation(&self, regatta_id: &str) -> RepositoryResult<Vec<RotationAssignment>> {
        self.with_state(regatta_id, |state| {
            let mut rotation = state.rotation.clone();
            rotation.sort();
            Ok(rotation)
        })
    }

    fn save_rotation_assignments(
        &self,
        regatta_id: &str,
        assignments: &[RotationAssignment],
    ) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            let touched: BTreeSet<RaceId> = assignments.iter().map(|a| a.race).collect();
            state.rotation.retain(|a| !touched.contains(&a.race));
            state.rotation.extend(assignments.iter().cloned());
            Ok(())
        })
    }

    fn delete_races(&self, regatta_id: &str, races: &[RaceId]) -> RepositoryResult<usize> {
        self.with_state_mut(regatta_id, |state| {
            let targets: BTreeSet<RaceId> = races.iter().copied().collect();
            let before = state.races.len();
            state.races.retain(|r| !targets.contains(&r.id()));
            state.finishes.retain(|f| !targets.contains(&f.race));
            state.rotation.retain(|a| !targets.contains(&a.race));
            Ok(before - state.races.len())
        })
    }

    fn mark_finalized(&self, regatta_id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.with_state_mut(regatta_id, |state| {
            state.regatta.finalized_at = Some(at);
            Ok(())
        })
    }
}
