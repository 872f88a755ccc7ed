//! Fire-and-forget audit trail for executed mutations.
//!
//! Tools submit a [`MessageLogEntry`] after a change has been made and move
//! on. A background task appends entries to the store in submission order;
//! a failed append is logged and counted, never reported to the tool.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::store::{BusinessStore, MessageLogEntry};
use crate::tenant::TenantId;

enum AuditCommand {
    Record { tenant: TenantId, entry: MessageLogEntry },
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit worker. Cheap to clone.
#[derive(Clone)]
pub struct AuditQueue {
    tx: Option<mpsc::UnboundedSender<AuditCommand>>,
    failures: Arc<AtomicU64>,
}

impl AuditQueue {
    /// Start a worker that appends entries to `store`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn BusinessStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditCommand>();
        let failures = Arc::new(AtomicU64::new(0));
        let counter = failures.clone();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    AuditCommand::Record { tenant, entry } => {
                        let tool = entry.tool.clone();
                        let actor = entry.actor.clone();
                        let write = AssertUnwindSafe(store.append_message_log(&tenant, entry))
                            .catch_unwind()
                            .await;
                        match write {
                            Ok(Ok(())) => {
                                info!(tenant_id = %tenant, tool = %tool, actor = %actor, "AUDIT");
                            }
                            Ok(Err(e)) => {
                                counter.fetch_add(1, Ordering::Relaxed);
                                warn!(tenant_id = %tenant, tool = %tool, error = %e, "Audit write failed");
                            }
                            Err(_) => {
                                counter.fetch_add(1, Ordering::Relaxed);
                                warn!(tenant_id = %tenant, tool = %tool, "Audit write panicked");
                            }
                        }
                    }
                    AuditCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Audit worker stopped");
        });

        Self {
            tx: Some(tx),
            failures,
        }
    }

    /// A queue that drops every entry. For contexts with no store behind them.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an entry. Returns immediately.
    pub fn submit(&self, tenant: &TenantId, entry: MessageLogEntry) {
        let Some(tx) = &self.tx else {
            debug!(tenant_id = %tenant, tool = %entry.tool, "Audit disabled, entry dropped");
            return;
        };
        let command = AuditCommand::Record {
            tenant: tenant.clone(),
            entry,
        };
        if tx.send(command).is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(tenant_id = %tenant, "Audit worker is gone, entry dropped");
        }
    }

    /// Wait until every entry submitted before this call has been handled.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (done, wait) = oneshot::channel();
        if tx.send(AuditCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Number of entries that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AuditQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditQueue")
            .field("enabled", &self.tx.is_some())
            .field("failures", &self.failures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullStore;

    #[tokio::test]
    async fn failed_writes_are_counted_not_raised() {
        let queue = AuditQueue::spawn(Arc::new(NullStore::failing()));
        let tenant = TenantId::new("t1");
        queue.submit(&tenant, MessageLogEntry::new("update_price", "u1", "a"));
        queue.submit(&tenant, MessageLogEntry::new("update_price", "u1", "b"));
        queue.flush().await;
        assert_eq!(queue.failures(), 2);
    }

    #[tokio::test]
    async fn successful_writes_leave_no_failures() {
        let queue = AuditQueue::spawn(Arc::new(NullStore::default()));
        queue.submit(
            &TenantId::new("t1"),
            MessageLogEntry::new("adjust_stock", "u1", "stock 4 -> 6"),
        );
        queue.flush().await;
        assert_eq!(queue.failures(), 0);
    }

    #[tokio::test]
    async fn disabled_queue_accepts_and_drops() {
        let queue = AuditQueue::disabled();
        queue.submit(&TenantId::new("t1"), MessageLogEntry::new("x", "u", "y"));
        queue.flush().await;
        assert_eq!(queue.failures(), 0);
    }
}
