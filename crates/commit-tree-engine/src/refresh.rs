//! Hand-off between background snapshot producers and the owning thread.
//!
//! Producers run on tokio's blocking pool and only ever send immutable
//! [`RepoSnapshot`]s. The owning thread drains the queue and applies each
//! event to the [`TreeController`], so graph mutations never interleave.

use std::fmt;
use std::sync::Arc;

use commit_tree_core::RepoSnapshot;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::controller::TreeController;

/// Result of one background production.
#[derive(Debug, Clone)]
pub enum RefreshEvent {
    /// A fresh view of the repository.
    Snapshot(Arc<RepoSnapshot>),
    /// The producer failed; models stay as they are.
    Failed { reason: String },
}

/// Cloneable sending half, for producers that are not spawned by the queue.
#[derive(Debug, Clone)]
pub struct RefreshSender {
    tx: UnboundedSender<RefreshEvent>,
}

impl RefreshSender {
    /// Queue an event. Returns `false` if the queue is gone.
    pub fn send(&self, event: RefreshEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Single-consumer queue of refresh events.
#[derive(Debug)]
pub struct RefreshQueue {
    tx: UnboundedSender<RefreshEvent>,
    rx: UnboundedReceiver<RefreshEvent>,
}

impl Default for RefreshQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> RefreshSender {
        RefreshSender {
            tx: self.tx.clone(),
        }
    }

    /// Run `producer` on the blocking pool and queue its outcome.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_snapshot<F, E>(&self, producer: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Result<RepoSnapshot, E> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match tokio::task::spawn_blocking(producer).await {
                Ok(Ok(snapshot)) => {
                    debug!(commits = snapshot.commit_count(), "snapshot_produced");
                    RefreshEvent::Snapshot(Arc::new(snapshot))
                }
                Ok(Err(e)) => RefreshEvent::Failed {
                    reason: e.to_string(),
                },
                Err(e) => RefreshEvent::Failed {
                    reason: format!("snapshot task aborted: {e}"),
                },
            };
            if tx.send(event).is_err() {
                warn!("refresh queue closed, dropping event");
            }
        })
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<RefreshEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<RefreshEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Apply every ready event without blocking. Returns how many were applied.
    pub fn drain_into(&mut self, controller: &mut TreeController) -> usize {
        let mut applied = 0;
        while let Some(event) = self.try_recv() {
            controller.apply(event);
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::TreeSource;
    use crate::render::{NullRenderer, NullSession};
    use commit_tree_core::Branch;

    fn snapshot(ids: &[&str]) -> RepoSnapshot {
        let mut builder = RepoSnapshot::builder();
        for (i, pair) in ids.windows(2).enumerate() {
            builder = builder.commit(pair[0], &[pair[1]], (ids.len() - i) as i64);
        }
        if let Some(root) = ids.last() {
            builder = builder.commit(*root, &[], 0);
        }
        if let Some(tip) = ids.first() {
            builder = builder.branch(Branch::local("main", *tip, true));
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_spawned_snapshot_reaches_controller() {
        let mut queue = RefreshQueue::new();
        let mut ctl = TreeController::new(Box::new(NullSession));
        let tree = ctl.register(TreeSource::local(), Box::new(NullRenderer));

        queue
            .spawn_snapshot(|| Ok::<_, String>(snapshot(&["c", "b", "a"])))
            .await
            .unwrap();

        assert_eq!(queue.drain_into(&mut ctl), 1);
        assert_eq!(ctl.tree(tree).unwrap().graph().cell_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_producer_leaves_models_untouched() {
        let mut queue = RefreshQueue::new();
        let mut ctl = TreeController::new(Box::new(NullSession));
        let tree = ctl.register(TreeSource::local(), Box::new(NullRenderer));
        ctl.init(tree, &snapshot(&["b", "a"])).unwrap();
        let before = ctl.tree(tree).unwrap().graph().export();

        queue
            .spawn_snapshot(|| Err::<RepoSnapshot, _>("repository locked"))
            .await
            .unwrap();

        let event = queue.recv().await.unwrap();
        match &event {
            RefreshEvent::Failed { reason } => assert_eq!(reason, "repository locked"),
            other => panic!("unexpected event: {other:?}"),
        }
        ctl.apply(event);
        assert_eq!(ctl.tree(tree).unwrap().graph().export(), before);
    }

    #[tokio::test]
    async fn test_events_apply_in_order() {
        let mut queue = RefreshQueue::new();
        let sender = queue.sender();
        let mut ctl = TreeController::new(Box::new(NullSession));
        let tree = ctl.register(TreeSource::local(), Box::new(NullRenderer));

        assert!(sender.send(RefreshEvent::Snapshot(Arc::new(snapshot(&["b", "a"])))));
        assert!(sender.send(RefreshEvent::Failed {
            reason: "network down".into()
        }));
        assert!(sender.send(RefreshEvent::Snapshot(Arc::new(snapshot(&["c", "b", "a"])))));

        assert_eq!(queue.drain_into(&mut ctl), 3);
        assert!(queue.try_recv().is_none());

        let graph = ctl.tree(tree).unwrap().graph();
        assert_eq!(graph.cell_count(), 3);
        assert_eq!(graph.cells_by_row()[0].id.as_str(), "c");
    }
}
