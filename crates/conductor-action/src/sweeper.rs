//! Background expiry of stale approval requests.

use conductor_core::types::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::approval::ApprovalStore;

/// Periodically marks pending approval requests past `expires_at` as expired.
pub struct ApprovalSweeper {
    store: Arc<dyn ApprovalStore>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl ApprovalSweeper {
    pub fn new(store: Arc<dyn ApprovalStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run one sweep. Returns the number of requests expired.
    pub async fn sweep(&self) -> usize {
        match self.store.expire_stale(Timestamp::now()).await {
            Ok(expired) => {
                if !expired.is_empty() {
                    tracing::info!(count = expired.len(), "Expired stale approval requests");
                }
                expired.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Approval sweep failed");
                0
            }
        }
    }

    /// Sweep every `interval` until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) {
        loop {
            self.sweep().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.notified() => {
                    tracing::debug!("Approval sweeper stopped");
                    return;
                }
            }
        }
    }

    /// Signal the sweeper loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::InMemoryApprovalStore;
    use crate::types::{Action, ApprovalRequest, ApprovalStatus, Parameters};

    fn request(id: &str, expires_at: Timestamp) -> ApprovalRequest {
        ApprovalRequest {
            id: id.to_string(),
            user_id: "u1".to_string(),
            action: Action {
                id: "a1".to_string(),
                action_type: String::new(),
                module: "drive".to_string(),
                operation: "delete_file".to_string(),
                parameters: Parameters::new(),
                requires_approval: true,
                affected_users: vec![],
                reasoning: String::new(),
            },
            reasoning: String::new(),
            affected_users: vec![],
            created_at: Timestamp(0),
            expires_at,
            status: ApprovalStatus::Pending,
            responses: vec![],
            executed_at: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_expires_only_past_deadline() {
        let store = Arc::new(InMemoryApprovalStore::new());
        store.save(request("old", Timestamp(1))).await.unwrap();
        store
            .save(request("new", Timestamp::now().plus_hours(24)))
            .await
            .unwrap();

        let sweeper = ApprovalSweeper::new(store.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep().await, 1);
        assert_eq!(
            store.get("old").await.unwrap().unwrap().status,
            ApprovalStatus::Expired
        );
        assert_eq!(
            store.get("new").await.unwrap().unwrap().status,
            ApprovalStatus::Pending
        );
        assert_eq!(sweeper.sweep().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_shutdown() {
        let store = Arc::new(InMemoryApprovalStore::new());
        let sweeper = ApprovalSweeper::new(store, Duration::from_secs(3600));

        sweeper.shutdown();

        tokio::time::timeout(Duration::from_secs(2), sweeper.run())
            .await
            .expect("Sweeper should shut down within timeout");
    }

    #[tokio::test]
    async fn test_run_sweeps_before_waiting() {
        let store = Arc::new(InMemoryApprovalStore::new());
        store.save(request("old", Timestamp(1))).await.unwrap();
        let sweeper = ApprovalSweeper::new(store.clone(), Duration::from_secs(3600));

        sweeper.shutdown();
        tokio::time::timeout(Duration::from_secs(2), sweeper.run())
            .await
            .unwrap();

        assert_eq!(
            store.get("old").await.unwrap().unwrap().status,
            ApprovalStatus::Expired
        );
    }
}
