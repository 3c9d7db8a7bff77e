//! Pending answers for interactive tool calls.
//!
//! Some tools are not executed by code at all: the client renders a panel
//! and a person supplies the result. Each in-flight call registers a waiter
//! keyed by its tool call id, and the answer endpoint delivers against the
//! same id. Keying by id keeps concurrent conversations from stealing each
//! other's answers.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::warn;

#[derive(Default)]
pub struct PendingToolAnswers {
    waiting: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl PendingToolAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for a tool call id. A second registration for the
    /// same id replaces the stale waiter, whose receiver then resolves with
    /// a channel error.
    pub fn register(&self, tool_call_id: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        let mut waiting = self.waiting.lock().unwrap();
        if waiting.insert(tool_call_id.to_string(), tx).is_some() {
            warn!(tool_call_id, "replacing stale waiter for interactive tool call");
        }
        rx
    }

    /// Deliver an answer. Returns false when no call with that id is
    /// waiting, or when the waiter has already gone away.
    pub fn resolve(&self, tool_call_id: &str, answer: Value) -> bool {
        let sender = self.waiting.lock().unwrap().remove(tool_call_id);
        match sender {
            Some(tx) => tx.send(answer).is_ok(),
            None => false,
        }
    }

    /// Drop a waiter without answering it, e.g. when the waiting request
    /// times out. Returns false when no call with that id is waiting.
    pub fn cancel(&self, tool_call_id: &str) -> bool {
        self.waiting.lock().unwrap().remove(tool_call_id).is_some()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_answer_reaches_registered_waiter() {
        let answers = PendingToolAnswers::new();
        let rx = answers.register("toolu_1");

        assert!(answers.resolve("toolu_1", json!({"approved": true})));
        assert_eq!(rx.await.unwrap(), json!({"approved": true}));
        assert_eq!(answers.waiting_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_rejected() {
        let answers = PendingToolAnswers::new();
        let _rx = answers.register("toolu_1");

        assert!(!answers.resolve("toolu_other", json!(1)));
        assert_eq!(answers.waiting_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ids_stay_independent() {
        let answers = PendingToolAnswers::new();
        let rx_a = answers.register("a");
        let rx_b = answers.register("b");

        assert!(answers.resolve("b", json!("for b")));
        assert!(answers.resolve("a", json!("for a")));
        assert_eq!(rx_a.await.unwrap(), json!("for a"));
        assert_eq!(rx_b.await.unwrap(), json!("for b"));
    }

    #[tokio::test]
    async fn test_cancel_removes_waiter_without_answering() {
        let answers = PendingToolAnswers::new();
        let rx = answers.register("toolu_1");

        assert!(answers.cancel("toolu_1"));
        assert!(!answers.cancel("toolu_1"));
        assert_eq!(answers.waiting_count(), 0);
        assert!(!answers.resolve("toolu_1", json!(1)));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_reregistration_replaces_stale_waiter() {
        let answers = PendingToolAnswers::new();
        let stale = answers.register("toolu_1");
        let fresh = answers.register("toolu_1");

        assert!(answers.resolve("toolu_1", json!("late answer")));
        assert!(stale.await.is_err());
        assert_eq!(fresh.await.unwrap(), json!("late answer"));
    }
}
