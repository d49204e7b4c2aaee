// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use regatta_scoring::db::{init_schema, open_sqlite_connection};
use regatta_scoring::domain::{Finish, Race, RaceId, Regatta, Team};
use regatta_scoring::repository::SqliteRegattaRepository;
use regatta_scoring::ScoringType;
use regatta_scoring::Division;
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Arc<Mutex<Connection>>, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// 固定的录入基准时间
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 13, 10, 0, 0).unwrap()
}

pub fn team_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("T{}", i)).collect()
}

/// 登记赛事: 队伍 T1..Tn, 每个分组 1..=race_count 场
pub fn seed_regatta(
    repo: &SqliteRegattaRepository,
    regatta_id: &str,
    scoring: ScoringType,
    team_count: usize,
    divisions: &[Division],
    race_count: u32,
) -> Result<(), Box<dyn Error>> {
    repo.upsert_regatta(&Regatta {
        id: regatta_id.to_string(),
        name: format!("{} 邀请赛", regatta_id),
        scoring,
        finalized_at: None,
    })?;

    for id in team_ids(team_count) {
        repo.insert_team(regatta_id, &Team::new(&id, &format!("{} 大学", id), "一队"))?;
    }
    for division in divisions {
        for number in 1..=race_count {
            repo.insert_race(regatta_id, &Race::new(*division, number))?;
        }
    }
    Ok(())
}

/// 按给定顺序构造某场次的成绩, 录入时间逐条递增 1 秒
pub fn finishes_in_order(race: RaceId, order: &[&str]) -> Vec<Finish> {
    order
        .iter()
        .enumerate()
        .map(|(i, team)| Finish::new(race, team, base_time() + Duration::seconds(i as i64)))
        .collect()
}

/// 创建连接已初始化的仓储
pub fn create_test_repo() -> Result<(NamedTempFile, Arc<SqliteRegattaRepository>), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let conn = open_test_connection(&db_path)?;
    Ok((
        temp_file,
        Arc::new(SqliteRegattaRepository::from_connection(conn)),
    ))
}
