//! The table-scope Lock Manager: in-memory FIFO wait queues over an
//! exported/importable [`LockState`]. Every operation is a total function
//! on well-formed input — there is no internal failure mode.
//!
//! The manager carries no state beyond what [`LockState`] already
//! describes: callers rehydrate it with [`TableLockManager::from_state`] at
//! the start of a mutate and read it back with
//! [`TableLockManager::export_state`] at the end, so nothing survives in
//! memory across mutates.

use std::collections::BTreeSet;

use rrs_schemas::{LockState, QueuedEntry, ReasonCode, RunningEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockGrant {
    Running,
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOutcome {
    pub grant: LockGrant,
    pub reason_code: ReasonCode,
    pub queue_position: Option<u64>,
    pub blocked_tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedJob {
    pub job_id: String,
    pub reason_code: ReasonCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseOutcome {
    pub released: Vec<String>,
    pub promoted: Vec<PromotedJob>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSnapshotEntry {
    pub job_id: String,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockSnapshot {
    pub running: Vec<LockSnapshotEntry>,
    pub queued: Vec<LockSnapshotEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct TableLockManager {
    state: LockState,
}

impl TableLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: LockState) -> Self {
        Self { state }
    }

    pub fn export_state(&self) -> LockState {
        self.state.clone()
    }

    pub fn load_state(&mut self, state: LockState) {
        self.state = state;
    }

    /// Computes `blocked = tables overlapping any running or queued entry`.
    /// If empty, the job runs immediately; otherwise it queues behind every
    /// entry it overlaps, including queued-but-not-yet-running ones. This is
    /// the fairness rule: a job that could run on its own is still forced to
    /// queue if it would otherwise jump ahead of an earlier, overlapping
    /// queued entry.
    pub fn acquire(
        &mut self,
        job_id: impl Into<String>,
        tenant_id: impl Into<String>,
        instance_id: impl Into<String>,
        tables: impl IntoIterator<Item = String>,
    ) -> AcquireOutcome {
        let job_id = job_id.into();
        let tenant_id = tenant_id.into();
        let instance_id = instance_id.into();

        let mut tables: Vec<String> = tables.into_iter().collect();
        tables.sort();
        tables.dedup();

        let mut blocked: BTreeSet<String> = BTreeSet::new();
        for t in &tables {
            let hits_running = self.state.running_jobs.iter().any(|r| r.tables.contains(t));
            let hits_queued = self.state.queued_jobs.iter().any(|q| q.tables.contains(t));
            if hits_running || hits_queued {
                blocked.insert(t.clone());
            }
        }

        if blocked.is_empty() {
            self.state.running_jobs.push(RunningEntry {
                job_id,
                tables,
            });
            AcquireOutcome {
                grant: LockGrant::Running,
                reason_code: ReasonCode::None,
                queue_position: None,
                blocked_tables: Vec::new(),
            }
        } else {
            let blocked_tables: Vec<String> = blocked.into_iter().collect();
            self.state.queued_jobs.push(QueuedEntry {
                job_id,
                tables,
                tenant_id,
                instance_id,
                reason_code: ReasonCode::QueuedScopeLock,
                blocked_tables: blocked_tables.clone(),
            });
            let queue_position = self.state.queued_jobs.len() as u64;
            AcquireOutcome {
                grant: LockGrant::Queued,
                reason_code: ReasonCode::QueuedScopeLock,
                queue_position: Some(queue_position),
                blocked_tables,
            }
        }
    }

    /// Removes `job_id` from `running_jobs` (or, defensively, from
    /// `queued_jobs` if it was never promoted) and greedily promotes the
    /// FIFO-eligible prefix of the queue.
    pub fn release(&mut self, job_id: &str) -> ReleaseOutcome {
        let released = if let Some(pos) = self
            .state
            .running_jobs
            .iter()
            .position(|r| r.job_id == job_id)
        {
            self.state.running_jobs.remove(pos).tables
        } else if let Some(pos) = self
            .state
            .queued_jobs
            .iter()
            .position(|q| q.job_id == job_id)
        {
            self.state.queued_jobs.remove(pos);
            Vec::new()
        } else {
            Vec::new()
        };

        let promoted = self.promote_eligible_prefix();
        ReleaseOutcome { released, promoted }
    }

    /// Removes a queued entry without promoting anything. Used by external
    /// cancel paths on a job that never ran.
    pub fn dequeue(&mut self, job_id: &str) -> Option<QueuedEntry> {
        let pos = self
            .state
            .queued_jobs
            .iter()
            .position(|q| q.job_id == job_id)?;
        Some(self.state.queued_jobs.remove(pos))
    }

    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            running: self
                .state
                .running_jobs
                .iter()
                .map(|r| LockSnapshotEntry {
                    job_id: r.job_id.clone(),
                    tables: r.tables.clone(),
                })
                .collect(),
            queued: self
                .state
                .queued_jobs
                .iter()
                .map(|q| LockSnapshotEntry {
                    job_id: q.job_id.clone(),
                    tables: q.tables.clone(),
                })
                .collect(),
        }
    }

    /// Walks the queue from the head, promoting every entry whose tables no
    /// longer overlap any running entry. Stops at the first entry that
    /// still overlaps — because the queue is processed strictly head-first,
    /// a later entry is never considered while an earlier one remains
    /// blocked, which is what preserves FIFO order.
    fn promote_eligible_prefix(&mut self) -> Vec<PromotedJob> {
        let mut promoted = Vec::new();
        loop {
            let Some(head) = self.state.queued_jobs.first() else {
                break;
            };
            let still_blocked = head
                .tables
                .iter()
                .any(|t| self.state.running_jobs.iter().any(|r| r.tables.contains(t)));
            if still_blocked {
                break;
            }
            let entry = self.state.queued_jobs.remove(0);
            promoted.push(PromotedJob {
                job_id: entry.job_id.clone(),
                reason_code: ReasonCode::None,
            });
            self.state.running_jobs.push(RunningEntry {
                job_id: entry.job_id,
                tables: entry.tables,
            });
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_acquire_runs_immediately() {
        let mut mgr = TableLockManager::new();
        let out = mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        assert_eq!(out.grant, LockGrant::Running);
        assert_eq!(out.reason_code, ReasonCode::None);
        assert_eq!(out.queue_position, None);
        assert!(out.blocked_tables.is_empty());
    }

    #[test]
    fn overlapping_acquire_queues_with_position() {
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        let out = mgr.acquire("job-2", "acme", "dev", tables(&["incident"]));
        assert_eq!(out.grant, LockGrant::Queued);
        assert_eq!(out.reason_code, ReasonCode::QueuedScopeLock);
        assert_eq!(out.queue_position, Some(1));
        assert_eq!(out.blocked_tables, vec!["incident".to_string()]);
    }

    #[test]
    fn fairness_rule_forbids_queue_jumping() {
        // job A runs on `incident`; job B queues behind it; job C also
        // touches `incident` and must queue behind B even though nothing
        // about C's own scope would otherwise block it from running.
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-a", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-b", "acme", "dev", tables(&["incident"]));
        let out_c = mgr.acquire("job-c", "other", "dev", tables(&["incident"]));
        assert_eq!(out_c.grant, LockGrant::Queued);
        assert_eq!(out_c.queue_position, Some(2));

        let release = mgr.release("job-a");
        assert_eq!(release.promoted.len(), 1);
        assert_eq!(release.promoted[0].job_id, "job-b");

        let snap = mgr.snapshot();
        assert_eq!(snap.queued.len(), 1);
        assert_eq!(snap.queued[0].job_id, "job-c");
    }

    #[test]
    fn disjoint_tables_run_concurrently() {
        let mut mgr = TableLockManager::new();
        let a = mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        let b = mgr.acquire("job-2", "acme", "dev", tables(&["contact"]));
        assert_eq!(a.grant, LockGrant::Running);
        assert_eq!(b.grant, LockGrant::Running);
    }

    #[test]
    fn release_promotes_only_the_fifo_head() {
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-2", "acme", "dev", tables(&["incident", "contact"]));
        mgr.acquire("job-3", "acme", "dev", tables(&["contact"]));

        let release = mgr.release("job-1");
        // job-2 still overlaps nothing running now; it promotes and pulls
        // `contact` along with it, so job-3 remains blocked behind it.
        assert_eq!(release.promoted.len(), 1);
        assert_eq!(release.promoted[0].job_id, "job-2");

        let snap = mgr.snapshot();
        assert_eq!(snap.queued.len(), 1);
        assert_eq!(snap.queued[0].job_id, "job-3");
    }

    #[test]
    fn dequeue_removes_without_promotion() {
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-2", "acme", "dev", tables(&["incident"]));
        let removed = mgr.dequeue("job-2");
        assert!(removed.is_some());
        let snap = mgr.snapshot();
        assert!(snap.queued.is_empty());
        assert_eq!(snap.running.len(), 1);
    }

    #[test]
    fn export_then_load_preserves_order_with_no_spurious_promotion() {
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-2", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-3", "acme", "dev", tables(&["incident"]));

        let exported = mgr.export_state();
        let mut restored = TableLockManager::from_state(exported.clone());
        assert_eq!(restored.export_state(), exported);

        let release = restored.release("job-1");
        assert_eq!(release.promoted.len(), 1);
        assert_eq!(release.promoted[0].job_id, "job-2");
    }

    #[test]
    fn no_two_running_entries_share_a_table() {
        let mut mgr = TableLockManager::new();
        mgr.acquire("job-1", "acme", "dev", tables(&["incident"]));
        mgr.acquire("job-2", "acme", "dev", tables(&["incident"]));
        let snap = mgr.snapshot();
        for a in &snap.running {
            for b in &snap.running {
                if a.job_id != b.job_id {
                    assert!(a.tables.iter().all(|t| !b.tables.contains(t)));
                }
            }
        }
    }
}
