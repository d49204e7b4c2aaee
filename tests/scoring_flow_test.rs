// ==========================================
// 计分流程集成测试
// ==========================================
// 测试目标: 录入成绩 -> 修正项 -> 全量重算 -> 排名, 基于 SQLite 仓储
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use chrono::Duration;
use regatta_scoring::api::{ApiError, RegattaLocks, ScoringApi};
use regatta_scoring::config::EngineConfig;
use regatta_scoring::domain::{
    FinishKey, Modifier, PenaltyModifier, Race, RaceId, Ranking, Regatta, Team,
};
use regatta_scoring::repository::RegattaRepository;
use regatta_scoring::{Division, PenaltyType, ScoringType};
use std::sync::Arc;
use test_helpers::{base_time, create_test_repo, finishes_in_order, seed_regatta, team_ids};

fn ids(order: &[&str]) -> Vec<String> {
    order.iter().map(|s| s.to_string()).collect()
}

fn fleet_order(ranking: &Ranking) -> Vec<(String, u32, i32)> {
    match ranking {
        Ranking::Fleet(results) => results
            .iter()
            .map(|r| (r.team_id.clone(), r.rank, r.total))
            .collect(),
        Ranking::TeamRecord(_) => panic!("应为船队排名"),
    }
}

#[test]
fn test_two_races_rank_by_total() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    for number in 1..=2 {
        api.record_finishes(
            "R1",
            RaceId::new(Division::A, number),
            &ids(&["T1", "T2", "T3"]),
            base_time(),
        )
        .unwrap();
    }
    let outcome = api.rescore("R1").unwrap();

    assert_eq!(
        fleet_order(&outcome.ranking),
        vec![
            ("T1".to_string(), 1, 2),
            ("T2".to_string(), 2, 4),
            ("T3".to_string(), 3, 6)
        ]
    );
    assert!(outcome.discarded_races.is_empty());
    assert_eq!(outcome.scored_ranges.get(&Division::A).map(String::as_str), Some("1-2"));
    assert_eq!(outcome.division_rankings[&Division::A].len(), 3);
    assert!(outcome.footnotes.is_empty());
}

#[test]
fn test_displacing_penalty_shifts_following_finishers() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A], 1).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);
    let race = RaceId::new(Division::A, 1);

    api.record_finishes("R1", race, &ids(&["T1", "T2", "T3", "T4"]), base_time())
        .unwrap();

    let key = FinishKey {
        race,
        team_id: "T1".to_string(),
    };
    let dsq = Modifier::Penalty(PenaltyModifier {
        penalty_type: PenaltyType::Dsq,
        amount: 5,
        comments: None,
        displace: true,
    });
    api.set_modifier("R1", &key, Some(dsq.clone())).unwrap();

    let stored = repo.load_finishes("R1", race).unwrap();
    let score_of = |team: &str| {
        stored
            .iter()
            .find(|f| f.team_id == team)
            .and_then(|f| f.score)
            .unwrap()
    };
    assert_eq!(score_of("T1"), 5);
    assert_eq!(score_of("T2"), 1);
    assert_eq!(score_of("T3"), 2);
    assert_eq!(score_of("T4"), 3);
    assert_eq!(repo.load_modifier("R1", &key).unwrap(), Some(dsq));

    // 重新录入顺序时保留修正项
    api.record_finishes("R1", race, &ids(&["T2", "T1", "T3", "T4"]), base_time())
        .unwrap();
    assert!(repo.load_modifier("R1", &key).unwrap().is_some());

    // 清除修正项后恢复自然分数
    let outcome = api.set_modifier("R1", &key, None).unwrap();
    assert_eq!(fleet_order(&outcome.ranking)[0], ("T2".to_string(), 1, 1));
}

#[test]
fn test_rejected_modifier_leaves_state_unchanged() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 1).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);
    let race = RaceId::new(Division::A, 1);
    api.record_finishes("R1", race, &ids(&["T1", "T2", "T3"]), base_time())
        .unwrap();

    let key = FinishKey {
        race,
        team_id: "T2".to_string(),
    };
    let too_large = Modifier::Penalty(PenaltyModifier {
        penalty_type: PenaltyType::Dnf,
        amount: 9,
        comments: None,
        displace: false,
    });

    let err = api.set_modifier("R1", &key, Some(too_large)).unwrap_err();
    assert!(matches!(err, ApiError::ModifierConflict(_)), "{}", err);
    assert_eq!(repo.load_modifier("R1", &key).unwrap(), None);
}

#[test]
fn test_rescore_is_idempotent() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 4, &[Division::A, Division::B], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    for division in [Division::A, Division::B] {
        for number in 1..=2 {
            api.record_finishes(
                "R1",
                RaceId::new(division, number),
                &ids(&["T4", "T2", "T1", "T3"]),
                base_time(),
            )
            .unwrap();
        }
    }

    let first = api.rescore("R1").unwrap();
    let stored_first = repo.load_all_finishes("R1").unwrap();
    let second = api.rescore("R1").unwrap();
    let stored_second = repo.load_all_finishes("R1").unwrap();

    assert_eq!(first, second);
    assert_eq!(stored_first, stored_second);
    assert_eq!(first.scored_races.len(), 4);
}

#[test]
fn test_incomplete_race_is_discarded_and_others_scored() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    api.record_finishes(
        "R1",
        RaceId::new(Division::A, 1),
        &ids(&["T3", "T1", "T2"]),
        base_time(),
    )
    .unwrap();
    let outcome = api
        .record_finishes(
            "R1",
            RaceId::new(Division::A, 2),
            &ids(&["T1", "T2"]),
            base_time(),
        )
        .unwrap();

    assert_eq!(outcome.discarded_races.len(), 1);
    assert_eq!(outcome.discarded_races[0].number, 2);
    assert_eq!(outcome.discarded_races[0].expected, 3);
    assert_eq!(outcome.discarded_races[0].actual, 2);
    assert_eq!(outcome.scored_races, vec![RaceId::new(Division::A, 1)]);
    assert_eq!(fleet_order(&outcome.ranking)[0].0, "T3");

    let race2 = repo.load_finishes("R1", RaceId::new(Division::A, 2)).unwrap();
    assert!(race2.iter().all(|f| f.score.is_none()));
}

#[test]
fn test_duplicate_team_in_order_is_rejected() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 1).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    let err = api
        .record_finishes(
            "R1",
            RaceId::new(Division::A, 1),
            &ids(&["T1", "T1", "T2"]),
            base_time(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
    assert!(repo.load_all_finishes("R1").unwrap().is_empty());
}

#[test]
fn test_reordering_must_keep_every_recorded_team() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 1).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);
    let race = RaceId::new(Division::A, 1);

    api.record_finishes("R1", race, &ids(&["T1", "T2", "T3"]), base_time())
        .unwrap();

    // T3 已有成绩, 新顺序缺少 T3
    let err = api
        .record_finishes("R1", race, &ids(&["T2", "T1"]), base_time())
        .unwrap_err();
    assert!(matches!(&err, ApiError::ValidationError(msg) if msg.contains("T3")), "{}", err);

    let stored = repo.load_finishes("R1", race).unwrap();
    assert_eq!(stored.len(), 3);
    let t1 = stored.iter().find(|f| f.team_id == "T1").unwrap();
    assert_eq!(t1.score, Some(1));

    // 完整的新顺序覆盖旧成绩
    let outcome = api
        .record_finishes("R1", race, &ids(&["T3", "T2", "T1"]), base_time())
        .unwrap();
    assert_eq!(fleet_order(&outcome.ranking)[0].0, "T3");
}

#[test]
fn test_unknown_regatta_is_not_found() {
    let (_temp, repo) = create_test_repo().unwrap();
    let api = ScoringApi::new(repo, EngineConfig::default(), None);

    let err = api.rescore("missing").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_combined_ranks_team_division_pairs() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "C1", ScoringType::Combined, 2, &[Division::A, Division::B], 1).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    // 合并船队: A-T1, B-T2, A-T2, B-T1
    let race_a = RaceId::new(Division::A, 1);
    let race_b = RaceId::new(Division::B, 1);
    let mut finishes = finishes_in_order(race_a, &["T1", "T2"]);
    finishes[1].entered_at = base_time() + Duration::seconds(2);
    let mut b = finishes_in_order(race_b, &["T2", "T1"]);
    b[0].entered_at = base_time() + Duration::seconds(1);
    b[1].entered_at = base_time() + Duration::seconds(3);
    finishes.extend(b);
    repo.save_finishes("C1", &finishes).unwrap();

    let outcome = api.rescore("C1").unwrap();
    let Ranking::Fleet(results) = &outcome.ranking else {
        panic!("应为船队排名");
    };
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].team_id, "T1");
    assert_eq!(results[0].division, Some(Division::A));
    assert_eq!(results[0].total, 1);
    assert_eq!(results[3].team_id, "T1");
    assert_eq!(results[3].division, Some(Division::B));
    assert!(outcome.division_rankings.is_empty());
}

#[test]
fn test_team_racing_ranks_by_record() {
    let (_temp, repo) = create_test_repo().unwrap();
    repo.upsert_regatta(&Regatta {
        id: "TR".to_string(),
        name: "对抗赛".to_string(),
        scoring: ScoringType::TeamRacing,
        finalized_at: None,
    })
    .unwrap();
    for id in team_ids(3) {
        repo.insert_team("TR", &Team::new(&id, &id, "一队")).unwrap();
    }
    for division in [Division::A, Division::B] {
        repo.insert_race("TR", &Race::matchup(division, 1, "T1", "T2"))
            .unwrap();
        repo.insert_race("TR", &Race::matchup(division, 2, "T1", "T3"))
            .unwrap();
    }

    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);
    let later = base_time() + Duration::seconds(10);
    api.record_finishes("TR", RaceId::new(Division::A, 1), &ids(&["T1", "T2"]), base_time())
        .unwrap();
    api.record_finishes("TR", RaceId::new(Division::B, 1), &ids(&["T1", "T2"]), later)
        .unwrap();
    api.record_finishes("TR", RaceId::new(Division::A, 2), &ids(&["T3", "T1"]), base_time())
        .unwrap();
    let outcome = api
        .record_finishes("TR", RaceId::new(Division::B, 2), &ids(&["T3", "T1"]), later)
        .unwrap();

    let Ranking::TeamRecord(records) = &outcome.ranking else {
        panic!("应为战绩排名");
    };
    let order: Vec<(&str, u32, u32)> = records
        .iter()
        .map(|r| (r.team_id.as_str(), r.wins, r.losses))
        .collect();
    assert_eq!(order, vec![("T3", 1, 0), ("T1", 1, 1), ("T2", 0, 1)]);
    assert!(outcome.footnotes.is_empty());
}

#[test]
fn test_api_is_shareable_across_threads() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 1).unwrap();
    let api = Arc::new(ScoringApi::new(repo, EngineConfig::default(), None));
    api.record_finishes(
        "R1",
        RaceId::new(Division::A, 1),
        &ids(&["T2", "T3", "T1"]),
        base_time(),
    )
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let api = Arc::clone(&api);
            std::thread::spawn(move || api.rescore("R1").unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(fleet_order(&outcomes[0].ranking)[0].0, "T2");
}

#[test]
fn test_instances_sharing_locks_serialize_rescoring() {
    use std::sync::mpsc;
    use std::time::Instant;

    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 3, &[Division::A], 1).unwrap();
    let locks = Arc::new(RegattaLocks::new());
    let first = ScoringApi::with_locks(repo.clone(), EngineConfig::default(), None, locks.clone());
    let second = ScoringApi::with_locks(repo, EngineConfig::default(), None, first.locks());
    first
        .record_finishes(
            "R1",
            RaceId::new(Division::A, 1),
            &ids(&["T1", "T2", "T3"]),
            base_time(),
        )
        .unwrap();

    let (entered_tx, entered_rx) = mpsc::channel();
    let holder = {
        let locks = Arc::clone(&locks);
        std::thread::spawn(move || {
            locks.with_scoring("R1", || {
                entered_tx.send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(50));
                Instant::now()
            })
        })
    };
    entered_rx.recv().unwrap();

    // 第二个实例须等待共享锁释放
    second.rescore("R1").unwrap();
    let finished = Instant::now();
    let released = holder.join().unwrap();

    assert!(finished >= released);
    assert!(locks.is_empty());
}

#[test]
fn test_memory_repository_gives_same_ranking() {
    use regatta_scoring::repository::MemoryRegattaRepository;

    let memory = Arc::new(MemoryRegattaRepository::new());
    memory
        .insert_regatta(Regatta {
            id: "M1".to_string(),
            name: "内存赛事".to_string(),
            scoring: ScoringType::Standard,
            finalized_at: None,
        })
        .unwrap();
    for id in team_ids(3) {
        memory.insert_team("M1", Team::new(&id, &id, "一队")).unwrap();
    }
    for number in 1..=2 {
        memory.insert_race("M1", Race::new(Division::A, number)).unwrap();
    }

    let api = ScoringApi::new(memory, EngineConfig::default(), None);
    for number in 1..=2 {
        api.record_finishes(
            "M1",
            RaceId::new(Division::A, number),
            &ids(&["T1", "T2", "T3"]),
            base_time(),
        )
        .unwrap();
    }
    let outcome = api.rescore("M1").unwrap();

    assert_eq!(
        fleet_order(&outcome.ranking),
        vec![
            ("T1".to_string(), 1, 2),
            ("T2".to_string(), 2, 4),
            ("T3".to_string(), 3, 6)
        ]
    );
}
