// ==========================================
// 帆船赛计分引擎 - 赛事级互斥锁
// ==========================================
// 约束: 同一赛事同时至多一个全量重算; 轮换生成单独串行
// 说明: 不同赛事之间互不阻塞; 无人持有的条目执行后即移除
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type LockMap = Mutex<HashMap<String, Arc<Mutex<()>>>>;

#[derive(Debug, Default)]
pub struct RegattaLocks {
    scoring: LockMap,
    rotation: LockMap,
}

impl RegattaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在赛事计分锁内执行
    pub fn with_scoring<T>(&self, regatta_id: &str, f: impl FnOnce() -> T) -> T {
        Self::run_locked(&self.scoring, regatta_id, f)
    }

    /// 在赛事轮换锁内执行
    pub fn with_rotation<T>(&self, regatta_id: &str, f: impl FnOnce() -> T) -> T {
        Self::run_locked(&self.rotation, regatta_id, f)
    }

    fn run_locked<T>(map: &LockMap, regatta_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            // 锁内只保护 ()，中毒后继续使用不会破坏状态
            let mut locks = map.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(regatta_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        Self::release(map, regatta_id);
        result
    }

    /// 移除无人持有的赛事锁
    ///
    /// 克隆只在表锁内发生, 持表锁时引用计数为 1 即无其他持有者
    fn release(map: &LockMap, regatta_id: &str) {
        let mut locks = map.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(regatta_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(regatta_id);
        }
    }

    /// 当前持有或等待计分锁的赛事数
    pub fn len(&self) -> usize {
        self.scoring
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
