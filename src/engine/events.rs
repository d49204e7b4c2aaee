// ==========================================
// 帆船赛计分引擎 - 计分事件发布
// ==========================================
// 职责: 定义计分事件发布 trait, 由外部通知系统实现
// 约束: 发布失败只记录日志, 不影响已提交的变更
// ==========================================

use crate::domain::regatta::RaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// 计分事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreEventType {
    /// 全量重算完成
    Rescored,
    /// 轮换已生成并保存
    RotationAssigned,
    /// 赛事已封榜
    Finalized,
}

impl ScoreEventType {
    pub fn as_str(&self) -> &str {
        match self {
            ScoreEventType::Rescored => "Rescored",
            ScoreEventType::RotationAssigned => "RotationAssigned",
            ScoreEventType::Finalized => "Finalized",
        }
    }
}

/// 计分事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub regatta_id: String,
    pub event_type: ScoreEventType,
    /// 受影响的场次（空表示整个赛事）
    pub races: Vec<RaceId>,
    pub occurred_at: DateTime<Utc>,
}

impl ScoreEvent {
    /// 整个赛事范围的事件
    pub fn regatta_wide(regatta_id: &str, event_type: ScoreEventType) -> Self {
        Self {
            regatta_id: regatta_id.to_string(),
            event_type,
            races: Vec::new(),
            occurred_at: Utc::now(),
        }
    }

    /// 指定场次的事件
    pub fn for_races(regatta_id: &str, event_type: ScoreEventType, races: Vec<RaceId>) -> Self {
        Self {
            regatta_id: regatta_id.to_string(),
            event_type,
            races,
            occurred_at: Utc::now(),
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 计分事件发布者
///
/// # 实现说明
/// - 邮件/社交媒体通知、静态页面发布等由外部系统实现
/// - 返回值为外部任务 ID（不支持时为空字符串）
pub trait ScoreEventPublisher: Send + Sync {
    fn publish(&self, event: ScoreEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ScoreEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ScoreEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - regatta_id={}, event_type={}",
            event.regatta_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ScoreEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn ScoreEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件; 失败时记录警告并吞掉错误
    pub fn publish(&self, event: ScoreEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalEventPublisher: 未配置发布者, 跳过事件 - regatta_id={}, event_type={}",
                event.regatta_id,
                event.event_type.as_str()
            );
            return;
        };

        let regatta_id = event.regatta_id.clone();
        let event_type = event.event_type;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                "事件发布失败: regatta_id={}, event_type={}, error={}",
                regatta_id,
                event_type.as_str(),
                e
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Division;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<ScoreEvent>>,
    }

    impl ScoreEventPublisher for RecordingPublisher {
        fn publish(&self, event: ScoreEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok("task-1".to_string())
        }
    }

    struct FailingPublisher;

    impl ScoreEventPublisher for FailingPublisher {
        fn publish(&self, _event: ScoreEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            Err("通知服务不可用".into())
        }
    }

    #[test]
    fn test_event_constructors() {
        let wide = ScoreEvent::regatta_wide("R1", ScoreEventType::Rescored);
        assert_eq!(wide.regatta_id, "R1");
        assert!(wide.races.is_empty());

        let scoped = ScoreEvent::for_races(
            "R1",
            ScoreEventType::RotationAssigned,
            vec![RaceId::new(Division::A, 1)],
        );
        assert_eq!(scoped.races.len(), 1);
        assert_eq!(scoped.event_type.as_str(), "RotationAssigned");
    }

    #[test]
    fn test_noop_publisher() {
        let result =
            NoOpEventPublisher.publish(ScoreEvent::regatta_wide("R1", ScoreEventType::Finalized));
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let recorder = Arc::new(RecordingPublisher::default());
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        publisher.publish(ScoreEvent::regatta_wide("R1", ScoreEventType::Rescored));
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_optional_publisher_swallows_failure() {
        let publisher = OptionalEventPublisher::with_publisher(Arc::new(FailingPublisher));
        publisher.publish(ScoreEvent::regatta_wide("R1", ScoreEventType::Finalized));

        let empty = OptionalEventPublisher::none();
        assert!(!empty.is_configured());
        empty.publish(ScoreEvent::regatta_wide("R1", ScoreEventType::Finalized));
    }
}
