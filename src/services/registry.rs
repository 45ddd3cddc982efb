use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::services::fsm::Fsm;

/// Process-local map of `chat_id` to its running game FSM. Each chat is
/// owned by exactly one worker (hash-sharded), so this map is never shared
/// across processes; the lock only arbitrates handler tasks against timer
/// callbacks within one worker.
#[derive(Clone, Default)]
pub struct FsmRegistry {
    fsms: Arc<RwLock<HashMap<i64, Arc<Fsm>>>>,
}

impl FsmRegistry {
    pub fn new() -> Self {
        FsmRegistry::default()
    }

    pub async fn get(&self, chat_id: i64) -> Option<Arc<Fsm>> {
        let fsms = self.fsms.read().await;
        fsms.get(&chat_id).cloned()
    }

    pub async fn insert(&self, chat_id: i64, fsm: Arc<Fsm>) {
        let mut fsms = self.fsms.write().await;
        fsms.insert(chat_id, fsm);
    }

    pub async fn remove(&self, chat_id: i64) {
        let mut fsms = self.fsms.write().await;
        fsms.remove(&chat_id);
    }
}
