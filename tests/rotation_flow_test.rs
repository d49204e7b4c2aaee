// ==========================================
// 轮换生成集成测试
// ==========================================
// 测试目标: 生成并持久化轮换; 校验失败时全有或全无
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use regatta_scoring::api::{ApiError, ScoringApi};
use regatta_scoring::config::EngineConfig;
use regatta_scoring::engine::parse_range;
use regatta_scoring::domain::{
    RaceId, RotationAssignment, RotationEntry, RotationRequest, RotationStyle, TeamRef,
};
use regatta_scoring::repository::RegattaRepository;
use regatta_scoring::{Division, ScoringType};
use test_helpers::{create_test_repo, seed_regatta};

fn standard_request(races: Vec<u32>) -> RotationRequest {
    RotationRequest {
        style: RotationStyle::Standard,
        divisions: vec![Division::A],
        races,
        entries: (1..=4)
            .map(|i| RotationEntry::new(&format!("T{}", i), Division::A, &i.to_string()))
            .collect(),
        fleet: None,
        repeat_set_size: 2,
        sort: None,
        allow_bye: None,
        offset: None,
    }
}

fn sails_for(assignments: &[RotationAssignment], number: u32) -> Vec<String> {
    let mut row: Vec<&RotationAssignment> = assignments
        .iter()
        .filter(|a| a.race == RaceId::new(Division::A, number))
        .collect();
    row.sort_by(|a, b| a.team.cmp(&b.team));
    row.iter().map(|a| a.sail.clone()).collect()
}

#[test]
fn test_standard_rotation_is_persisted() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A], 4).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    let generated = api
        .generate_rotation("R1", &standard_request(vec![1, 2, 3, 4]))
        .unwrap();
    assert_eq!(generated.len(), 16);

    let stored = repo.load_rotation("R1").unwrap();
    assert_eq!(stored.len(), 16);
    assert_eq!(sails_for(&stored, 1), vec!["1", "2", "3", "4"]);
    assert_eq!(sails_for(&stored, 2), vec!["1", "2", "3", "4"]);
    assert_eq!(sails_for(&stored, 3), vec!["2", "3", "4", "1"]);
    assert_eq!(sails_for(&stored, 4), vec!["2", "3", "4", "1"]);
}

#[test]
fn test_regenerating_replaces_only_requested_races() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A], 4).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    api.generate_rotation("R1", &standard_request(vec![1, 2, 3, 4]))
        .unwrap();

    // 场次 3、4 作为第一组重新生成
    let mut request = standard_request(vec![3, 4]);
    request.repeat_set_size = 1;
    api.generate_rotation("R1", &request).unwrap();

    let stored = repo.load_rotation("R1").unwrap();
    assert_eq!(stored.len(), 16);
    assert_eq!(sails_for(&stored, 1), vec!["1", "2", "3", "4"]);
    assert_eq!(sails_for(&stored, 3), vec!["1", "2", "3", "4"]);
    assert_eq!(sails_for(&stored, 4), vec!["2", "3", "4", "1"]);
}

#[test]
fn test_invalid_request_writes_nothing() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A], 4).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    let mut request = standard_request(vec![1, 2]);
    request.repeat_set_size = 0;
    let err = api.generate_rotation("R1", &request).unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{}", err);
    assert!(repo.load_rotation("R1").unwrap().is_empty());
}

#[test]
fn test_unparsable_race_range_is_rejected_by_validation() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A], 4).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    // 命令行 --races 的处理方式: 非法区间解析为空集
    let mut request = standard_request(vec![1, 2]);
    request.races = parse_range("1-x").into_numbers();
    assert!(request.races.is_empty());

    let err = api.generate_rotation("R1", &request).unwrap_err();
    assert!(matches!(&err, ApiError::ValidationError(msg) if msg.contains("场次")), "{}", err);
    assert!(repo.load_rotation("R1").unwrap().is_empty());
}

#[test]
fn test_unknown_team_is_rejected() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    // T4 不在参赛名单
    let err = api
        .generate_rotation("R1", &standard_request(vec![1, 2]))
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(msg) if msg.contains("T4")));
    assert!(repo.load_rotation("R1").unwrap().is_empty());
}

#[test]
fn test_odd_swap_assigns_bye() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    let request = RotationRequest {
        style: RotationStyle::Swap,
        divisions: vec![Division::A],
        races: vec![1, 2],
        entries: (1..=3)
            .map(|i| RotationEntry::new(&format!("T{}", i), Division::A, &i.to_string()))
            .collect(),
        fleet: None,
        repeat_set_size: 1,
        sort: None,
        allow_bye: Some(true),
        offset: None,
    };
    let generated = api.generate_rotation("R1", &request).unwrap();

    let byes: Vec<&RotationAssignment> = generated
        .iter()
        .filter(|a| a.team == TeamRef::Bye)
        .collect();
    assert_eq!(byes.len(), 2);
    for number in 1..=2 {
        let race = RaceId::new(Division::A, number);
        assert_eq!(byes.iter().filter(|a| a.race == race).count(), 1);

        let mut sails: Vec<&str> = generated
            .iter()
            .filter(|a| a.race == race)
            .map(|a| a.sail.as_str())
            .collect();
        sails.sort();
        assert_eq!(sails, vec!["1", "2", "3", "4"]);
    }
    // 首场轮空队持有追加帆号, 之后随交换环移动
    let first_bye = byes
        .iter()
        .find(|a| a.race == RaceId::new(Division::A, 1))
        .unwrap();
    assert_eq!(first_bye.sail, "4");
    assert_eq!(repo.load_rotation("R1").unwrap().len(), 8);
}
