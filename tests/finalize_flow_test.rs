// ==========================================
// 封榜流程集成测试
// ==========================================
// 测试目标: 中间缺场阻塞封榜; 封榜删除末尾未计分场次并发布事件
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use regatta_scoring::api::{ApiError, ScoringApi};
use regatta_scoring::config::EngineConfig;
use regatta_scoring::domain::RaceId;
use regatta_scoring::engine::{ScoreEvent, ScoreEventPublisher, ScoreEventType};
use regatta_scoring::repository::RegattaRepository;
use regatta_scoring::{Division, ScoringType};
use std::error::Error;
use std::sync::{Arc, Mutex};
use test_helpers::{base_time, create_test_repo, seed_regatta};

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<ScoreEvent>>,
}

impl ScoreEventPublisher for RecordingPublisher {
    fn publish(&self, event: ScoreEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut events = self.events.lock().unwrap();
        events.push(event);
        Ok(format!("evt-{}", events.len()))
    }
}

fn order() -> Vec<String> {
    vec!["T1".to_string(), "T2".to_string()]
}

#[test]
fn test_gap_blocks_finalization_until_filled() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 2, &[Division::A], 6).unwrap();
    let publisher = Arc::new(RecordingPublisher::default());
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), Some(publisher.clone()));

    for number in [1, 2, 4] {
        api.record_finishes("R1", RaceId::new(Division::A, number), &order(), base_time())
            .unwrap();
    }

    let report = api.check_finalizable("R1").unwrap();
    assert_eq!(report.blocking, vec![RaceId::new(Division::A, 3)]);
    assert_eq!(
        report.removable,
        vec![RaceId::new(Division::A, 5), RaceId::new(Division::A, 6)]
    );
    assert!(!report.is_finalizable());

    let err = api.finalize("R1").unwrap_err();
    match err {
        ApiError::FinalizationBlocked { races } => {
            assert_eq!(races, vec![RaceId::new(Division::A, 3)])
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(repo.load_races("R1", None).unwrap().len(), 6);
    assert!(repo.load_regatta("R1").unwrap().finalized_at.is_none());

    api.record_finishes("R1", RaceId::new(Division::A, 3), &order(), base_time())
        .unwrap();
    let report = api.finalize("R1").unwrap();
    assert!(report.blocking.is_empty());

    let remaining: Vec<u32> = repo
        .load_races("R1", None)
        .unwrap()
        .iter()
        .map(|r| r.number)
        .collect();
    assert_eq!(remaining, vec![1, 2, 3, 4]);
    assert!(repo.load_regatta("R1").unwrap().finalized_at.is_some());

    let events = publisher.events.lock().unwrap();
    assert_eq!(
        events.last().map(|e| e.event_type),
        Some(ScoreEventType::Finalized)
    );
    assert!(events
        .iter()
        .any(|e| e.event_type == ScoreEventType::Rescored));
}

#[test]
fn test_missing_first_race_blocks() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 2, &[Division::A, Division::B], 2).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    api.record_finishes("R1", RaceId::new(Division::A, 1), &order(), base_time())
        .unwrap();
    api.record_finishes("R1", RaceId::new(Division::B, 2), &order(), base_time())
        .unwrap();

    let report = api.check_finalizable("R1").unwrap();
    assert_eq!(report.blocking, vec![RaceId::new(Division::B, 1)]);
    assert_eq!(report.removable, vec![RaceId::new(Division::A, 2)]);
}

#[test]
fn test_nothing_scored_is_rejected() {
    let (_temp, repo) = create_test_repo().unwrap();
    seed_regatta(&repo, "R1", ScoringType::Standard, 2, &[Division::A], 3).unwrap();
    let api = ScoringApi::new(repo.clone(), EngineConfig::default(), None);

    let err = api.finalize("R1").unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)), "{}", err);
    assert_eq!(repo.load_races("R1", None).unwrap().len(), 3);
}
