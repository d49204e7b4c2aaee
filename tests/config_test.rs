// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 引擎配置读取、默认值回落与快照恢复
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use regatta_scoring::api::ScoringApi;
use regatta_scoring::config::{config_keys, BreakdownRounding, ConfigManager, EngineConfig};
use regatta_scoring::domain::{Ranking, TeamPenalty};
use regatta_scoring::repository::SqliteRegattaRepository;
use regatta_scoring::{Division, RaceId, SailSortMode, ScoringType, TeamPenaltyType};
use std::sync::Arc;
use test_helpers::{base_time, create_test_db, open_test_connection, seed_regatta};

#[test]
fn test_missing_keys_fall_back_to_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = manager.load_engine_config().unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.team_penalty_points, 20);
    assert!(config.allow_bye);
}

#[test]
fn test_overrides_are_applied() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).unwrap();

    manager
        .set_global_config_value(config_keys::TEAM_PENALTY_POINTS, "10")
        .unwrap();
    manager
        .set_global_config_value(config_keys::BREAKDOWN_ROUNDING, "truncate")
        .unwrap();
    manager
        .set_global_config_value(config_keys::DEFAULT_SAIL_SORT, "NUMERIC")
        .unwrap();
    manager
        .set_global_config_value(config_keys::ALLOW_BYE, "false")
        .unwrap();

    let config = manager.load_engine_config().unwrap();
    assert_eq!(config.team_penalty_points, 10);
    assert_eq!(config.breakdown_rounding, BreakdownRounding::Truncate);
    assert_eq!(config.default_sail_sort, SailSortMode::Numeric);
    assert!(!config.allow_bye);
}

#[test]
fn test_malformed_value_uses_default() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_global_config_value(config_keys::TEAM_PENALTY_POINTS, "twenty")
        .unwrap();

    let config = manager.load_engine_config().unwrap();
    assert_eq!(config.team_penalty_points, 20);
}

#[test]
fn test_snapshot_restore_round_trip() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).unwrap();
    manager
        .set_global_config_value(config_keys::TEAM_PENALTY_POINTS, "15")
        .unwrap();
    let snapshot = manager.get_config_snapshot().unwrap();

    manager
        .set_global_config_value(config_keys::TEAM_PENALTY_POINTS, "30")
        .unwrap();
    let restored = manager.restore_config_from_snapshot(&snapshot).unwrap();

    assert_eq!(restored, 1);
    assert_eq!(
        manager
            .get_global_config_value(config_keys::TEAM_PENALTY_POINTS)
            .unwrap()
            .as_deref(),
        Some("15")
    );
}

#[test]
fn test_team_penalty_points_flow_into_ranking() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();
    let manager = ConfigManager::from_connection(conn.clone()).unwrap();
    manager
        .set_global_config_value(config_keys::TEAM_PENALTY_POINTS, "7")
        .unwrap();

    let repo = Arc::new(SqliteRegattaRepository::from_connection(conn));
    seed_regatta(&repo, "R1", ScoringType::Standard, 2, &[Division::A], 1).unwrap();
    repo.insert_team_penalty(
        "R1",
        &TeamPenalty {
            team_id: "T1".to_string(),
            division: Division::A,
            penalty_type: TeamPenaltyType::Mrp,
            comments: None,
        },
    )
    .unwrap();

    let api = ScoringApi::new(repo, manager.load_engine_config().unwrap(), None);
    let outcome = api
        .record_finishes(
            "R1",
            RaceId::new(Division::A, 1),
            &["T1".to_string(), "T2".to_string()],
            base_time(),
        )
        .unwrap();

    let Ranking::Fleet(results) = outcome.ranking else {
        panic!("应为船队排名");
    };
    let t1 = results.iter().find(|r| r.team_id == "T1").unwrap();
    assert_eq!(t1.total, 1 + 7);
    assert_eq!(results[0].team_id, "T2");
}
