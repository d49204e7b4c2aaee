// ==========================================
// 帆船赛计分引擎 - SQLite 赛事仓储
// ==========================================
// 职责: RegattaRepository 的 rusqlite 实现
// 红线: Repository 不含计分规则, 多行写入一律走事务
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::regatta::{Finish, FinishKey, Modifier, Race, RaceId, Regatta, Team, TeamPenalty};
use crate::domain::rotation::{RotationAssignment, TeamRef};
use crate::domain::types::Division;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::regatta_repo::RegattaRepository;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// 文本列解析为枚举
fn parse_text<T>(idx: usize, raw: String) -> SqliteResult<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn parse_modifier(idx: usize, raw: Option<String>) -> SqliteResult<Option<Modifier>> {
    raw.map(|json| {
        serde_json::from_str::<Modifier>(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

const FINISH_COLUMNS: &str =
    "division, number, team_id, entered_at, score, place, explanation, modifier_json";

fn map_finish(row: &Row<'_>) -> SqliteResult<Finish> {
    Ok(Finish {
        race: RaceId::new(parse_text(0, row.get(0)?)?, row.get(1)?),
        team_id: row.get(2)?,
        entered_at: row.get(3)?,
        score: row.get(4)?,
        place: row.get(5)?,
        explanation: row.get(6)?,
        modifier: parse_modifier(7, row.get(7)?)?,
    })
}

// ==========================================
// SqliteRegattaRepository - SQLite 仓储
// ==========================================
pub struct SqliteRegattaRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegattaRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 登记数据（不属于计分契约）=====

    /// 登记或更新赛事头信息
    pub fn upsert_regatta(&self, regatta: &Regatta) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO regatta (regatta_id, name, scoring, finalized_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(regatta_id) DO UPDATE SET
                name = excluded.name,
                scoring = excluded.scoring,
                finalized_at = excluded.finalized_at
            "#,
            params![
                regatta.id,
                regatta.name,
                regatta.scoring.to_string(),
                regatta.finalized_at
            ],
        )?;
        Ok(())
    }

    pub fn insert_team(&self, regatta_id: &str, team: &Team) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO team (regatta_id, team_id, school, name) VALUES (?1, ?2, ?3, ?4)",
            params![regatta_id, team.id, team.school, team.name],
        )?;
        Ok(())
    }

    pub fn insert_race(&self, regatta_id: &str, race: &Race) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO race (regatta_id, division, number, boat, tr_team1, tr_team2, tr_ignore)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                regatta_id,
                race.division.as_str(),
                race.number,
                race.boat,
                race.tr_team1,
                race.tr_team2,
                race.tr_ignore
            ],
        )?;
        Ok(())
    }

    pub fn insert_team_penalty(&self, regatta_id: &str, penalty: &TeamPenalty) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO team_penalty (regatta_id, team_id, division, penalty_type, comments)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                regatta_id,
                penalty.team_id,
                penalty.division.as_str(),
                penalty.penalty_type.as_str(),
                penalty.comments
            ],
        )?;
        Ok(())
    }
}

impl RegattaRepository for SqliteRegattaRepository {
    fn load_regatta(&self, regatta_id: &str) -> RepositoryResult<Regatta> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT regatta_id, name, scoring, finalized_at FROM regatta WHERE regatta_id = ?1",
            params![regatta_id],
            |row| {
                Ok(Regatta {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    scoring: parse_text(2, row.get(2)?)?,
                    finalized_at: row.get(3)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Regatta", regatta_id))
    }

    fn load_teams(&self, regatta_id: &str) -> RepositoryResult<Vec<Team>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT team_id, school, name FROM team WHERE regatta_id = ?1 ORDER BY rowid",
        )?;
        let teams = stmt
            .query_map(params![regatta_id], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    school: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<Team>>>()?;
        Ok(teams)
    }

    fn load_races(
        &self,
        regatta_id: &str,
        division: Option<Division>,
    ) -> RepositoryResult<Vec<Race>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT division, number, boat, tr_team1, tr_team2, tr_ignore
            FROM race
            WHERE regatta_id = ?1 AND (?2 IS NULL OR division = ?2)
            ORDER BY division, number
            "#,
        )?;
        let races = stmt
            .query_map(params![regatta_id, division.map(|d| d.as_str())], |row| {
                Ok(Race {
                    division: parse_text(0, row.get(0)?)?,
                    number: row.get(1)?,
                    boat: row.get(2)?,
                    tr_team1: row.get(3)?,
                    tr_team2: row.get(4)?,
                    tr_ignore: row.get(5)?,
                })
            })?
            .collect::<SqliteResult<Vec<Race>>>()?;
        Ok(races)
    }

    fn load_team_penalties(
        &self,
        regatta_id: &str,
        division: Division,
    ) -> RepositoryResult<Vec<TeamPenalty>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT team_id, division, penalty_type, comments
            FROM team_penalty
            WHERE regatta_id = ?1 AND division = ?2
            ORDER BY penalty_id
            "#,
        )?;
        let penalties = stmt
            .query_map(params![regatta_id, division.as_str()], |row| {
                Ok(TeamPenalty {
                    team_id: row.get(0)?,
                    division: parse_text(1, row.get(1)?)?,
                    penalty_type: parse_text(2, row.get(2)?)?,
                    comments: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<TeamPenalty>>>()?;
        Ok(penalties)
    }

    fn load_finishes(&self, regatta_id: &str, race: RaceId) -> RepositoryResult<Vec<Finish>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM finish WHERE regatta_id = ?1 AND division = ?2 AND number = ?3 \
             ORDER BY entered_at, rowid",
            FINISH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let finishes = stmt
            .query_map(
                params![regatta_id, race.division.as_str(), race.number],
                map_finish,
            )?
            .collect::<SqliteResult<Vec<Finish>>>()?;
        Ok(finishes)
    }

    fn load_all_finishes(&self, regatta_id: &str) -> RepositoryResult<Vec<Finish>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM finish WHERE regatta_id = ?1 \
             ORDER BY number, division, entered_at, rowid",
            FINISH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let finishes = stmt
            .query_map(params![regatta_id], map_finish)?
            .collect::<SqliteResult<Vec<Finish>>>()?;
        Ok(finishes)
    }

    fn save_finishes(&self, regatta_id: &str, finishes: &[Finish]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO finish (
                    regatta_id, division, number, team_id, entered_at,
                    score, place, explanation, modifier_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(regatta_id, division, number, team_id) DO UPDATE SET
                    entered_at = excluded.entered_at,
                    score = excluded.score,
                    place = excluded.place,
                    explanation = excluded.explanation,
                    modifier_json = excluded.modifier_json
                "#,
            )?;

            for finish in finishes {
                let modifier_json = finish
                    .modifier
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    regatta_id,
                    finish.race.division.as_str(),
                    finish.race.number,
                    finish.team_id,
                    finish.entered_at,
                    finish.score,
                    finish.place,
                    finish.explanation,
                    modifier_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
    ) -> RepositoryResult<Option<Modifier>> {
        let conn = self.get_conn()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                r#"
                SELECT modifier_json FROM finish
                WHERE regatta_id = ?1 AND division = ?2 AND number = ?3 AND team_id = ?4
                "#,
                params![
                    regatta_id,
                    key.race.division.as_str(),
                    key.race.number,
                    key.team_id
                ],
                |row| row.get(0),
            )
            .optional()?;

        let raw = raw.ok_or_else(|| {
            RepositoryError::not_found("Finish", format!("{}/{}", key.race, key.team_id))
        })?;
        Ok(raw
            .map(|json| serde_json::from_str::<Modifier>(&json))
            .transpose()?)
    }

    fn save_modifier(
        &self,
        regatta_id: &str,
        key: &FinishKey,
        modifier: Option<&Modifier>,
    ) -> RepositoryResult<()> {
        let modifier_json = modifier.map(serde_json::to_string).transpose()?;
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE finish SET modifier_json = ?5
            WHERE regatta_id = ?1 AND division = ?2 AND number = ?3 AND team_id = ?4
            "#,
            params![
                regatta_id,
                key.race.division.as_str(),
                key.race.number,
                key.team_id,
                modifier_json
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found(
                "Finish",
                format!("{}/{}", key.race, key.team_id),
            ));
        }
        Ok(())
    }

    fn load_rotation(&self, regatta_id: &str) -> RepositoryResult<Vec<RotationAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT division, number, sail, team_id, is_bye FROM rotation WHERE regatta_id = ?1",
        )?;
        let mut rotation = stmt
            .query_map(params![regatta_id], |row| {
                let is_bye: bool = row.get(4)?;
                let team = if is_bye {
                    TeamRef::Bye
                } else {
                    TeamRef::Team(row.get(3)?)
                };
                Ok(RotationAssignment {
                    race: RaceId::new(parse_text(0, row.get(0)?)?, row.get(1)?),
                    team,
                    sail: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<RotationAssignment>>>()?;
        rotation.sort();
        Ok(rotation)
    }

    fn save_rotation_assignments(
        &self,
        regatta_id: &str,
        assignments: &[RotationAssignment],
    ) -> RepositoryResult<()> {
        let touched: BTreeSet<RaceId> = assignments.iter().map(|a| a.race).collect();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut delete = tx.prepare(
                "DELETE FROM rotation WHERE regatta_id = ?1 AND division = ?2 AND number = ?3",
            )?;
            for race in &touched {
                delete.execute(params![regatta_id, race.division.as_str(), race.number])?;
            }

            let mut insert = tx.prepare(
                r#"
                INSERT INTO rotation (regatta_id, division, number, sail, team_id, is_bye)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for assignment in assignments {
                insert.execute(params![
                    regatta_id,
                    assignment.race.division.as_str(),
                    assignment.race.number,
                    assignment.sail,
                    assignment.team.team_id(),
                    assignment.team.is_bye(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_races(&self, regatta_id: &str, races: &[RaceId]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut delete_rotation = tx.prepare(
                "DELETE FROM rotation WHERE regatta_id = ?1 AND division = ?2 AND number = ?3",
            )?;
            // finish 随 race 级联删除
            let mut delete_race = tx.prepare(
                "DELETE FROM race WHERE regatta_id = ?1 AND division = ?2 AND number = ?3",
            )?;
            for race in races {
                let division = race.division.as_str();
                delete_rotation.execute(params![regatta_id, division, race.number])?;
                deleted += delete_race.execute(params![regatta_id, division, race.number])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    fn mark_finalized(&self, regatta_id: &str, at: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE regatta SET finalized_at = ?2 WHERE regatta_id = ?1",
            params![regatta_id, at],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Regatta", regatta_id));
        }
        Ok(())
    }
}
