// ==========================================
// 帆船赛计分引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout, 减少并发写入时的偶发 busy 错误
// - 集中维护 schema
// ==========================================

use rusqlite::{Connection, OptionalExtension};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前 schema 版本
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明: foreign_keys 与 busy_timeout 都需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS regatta (
            regatta_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            scoring TEXT NOT NULL,
            finalized_at TEXT
        );

        CREATE TABLE IF NOT EXISTS team (
            regatta_id TEXT NOT NULL REFERENCES regatta(regatta_id) ON DELETE CASCADE,
            team_id TEXT NOT NULL,
            school TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (regatta_id, team_id)
        );

        CREATE TABLE IF NOT EXISTS race (
            regatta_id TEXT NOT NULL REFERENCES regatta(regatta_id) ON DELETE CASCADE,
            division TEXT NOT NULL,
            number INTEGER NOT NULL CHECK (number >= 1),
            boat TEXT,
            tr_team1 TEXT,
            tr_team2 TEXT,
            tr_ignore INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (regatta_id, division, number)
        );

        CREATE TABLE IF NOT EXISTS finish (
            regatta_id TEXT NOT NULL,
            division TEXT NOT NULL,
            number INTEGER NOT NULL,
            team_id TEXT NOT NULL,
            entered_at TEXT NOT NULL,
            score INTEGER,
            place INTEGER,
            explanation TEXT,
            modifier_json TEXT,
            PRIMARY KEY (regatta_id, division, number, team_id),
            FOREIGN KEY (regatta_id, division, number)
                REFERENCES race(regatta_id, division, number) ON DELETE CASCADE,
            FOREIGN KEY (regatta_id, team_id)
                REFERENCES team(regatta_id, team_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS team_penalty (
            penalty_id INTEGER PRIMARY KEY AUTOINCREMENT,
            regatta_id TEXT NOT NULL,
            team_id TEXT NOT NULL,
            division TEXT NOT NULL,
            penalty_type TEXT NOT NULL,
            comments TEXT,
            FOREIGN KEY (regatta_id, team_id)
                REFERENCES team(regatta_id, team_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS rotation (
            regatta_id TEXT NOT NULL REFERENCES regatta(regatta_id) ON DELETE CASCADE,
            division TEXT NOT NULL,
            number INTEGER NOT NULL,
            sail TEXT NOT NULL,
            team_id TEXT,
            is_bye INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (regatta_id, division, number, sail)
        );

        CREATE INDEX IF NOT EXISTS idx_finish_race ON finish(regatta_id, number, division);
        CREATE INDEX IF NOT EXISTS idx_rotation_race ON rotation(regatta_id, number, division);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}
