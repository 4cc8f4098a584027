//! Formation-deadline scheduling
//!
//! A team gets one pending deadline job at a time. Scheduling again for the
//! same team replaces the earlier job.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::domain::TeamId;

/// Runs a job once after a delay unless cancelled first
pub trait DeadlineScheduler: Send + Sync + std::fmt::Debug {
    /// Schedule `job` to run after `delay`, replacing any pending job for the team
    fn schedule(&self, team_id: TeamId, delay: Duration, job: BoxFuture<'static, ()>);

    /// Cancel the pending job for a team; returns true if one was pending
    fn cancel(&self, team_id: TeamId) -> bool;

    /// Number of jobs still waiting for their deadline
    fn pending(&self) -> usize;
}

type PendingJobs = HashMap<TeamId, (u64, AbortHandle)>;

/// Scheduler backed by `tokio::time::sleep` tasks.
///
/// A job deregisters itself before it starts running, so `cancel` only ever
/// aborts a task that is still sleeping.
#[derive(Debug, Default)]
pub struct TokioDeadlineScheduler {
    jobs: Arc<Mutex<PendingJobs>>,
    generation: Mutex<u64>,
}

impl TokioDeadlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        let mut generation = match self.generation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *generation += 1;
        *generation
    }
}

fn lock_jobs(jobs: &Mutex<PendingJobs>) -> std::sync::MutexGuard<'_, PendingJobs> {
    match jobs.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl DeadlineScheduler for TokioDeadlineScheduler {
    fn schedule(&self, team_id: TeamId, delay: Duration, job: BoxFuture<'static, ()>) {
        let generation = self.next_generation();
        let jobs = self.jobs.clone();

        // Hold the table while spawning so the task cannot look for its entry
        // before it has been inserted
        let mut pending = lock_jobs(&self.jobs);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut pending = lock_jobs(&jobs);
                match pending.get(&team_id) {
                    Some((current, _)) if *current == generation => {
                        pending.remove(&team_id);
                    }
                    _ => return,
                }
            }

            debug!(team_id = %team_id, "Formation deadline reached");
            job.await;
        });

        if let Some((_, previous)) = pending.insert(team_id, (generation, task.abort_handle())) {
            previous.abort();
        }

        debug!(team_id = %team_id, delay_secs = delay.as_secs(), "Scheduled formation deadline");
    }

    fn cancel(&self, team_id: TeamId) -> bool {
        match lock_jobs(&self.jobs).remove(&team_id) {
            Some((_, handle)) => {
                handle.abort();
                debug!(team_id = %team_id, "Cancelled formation deadline");
                true
            }
            None => false,
        }
    }

    fn pending(&self) -> usize {
        lock_jobs(&self.jobs).len()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;

    use super::*;

    fn counting_job(counter: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_after_delay() {
        let scheduler = TokioDeadlineScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TeamId::new(1), Duration::from_secs(60), counting_job(&runs));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_job_never_runs() {
        let scheduler = TokioDeadlineScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TeamId::new(1), Duration::from_secs(60), counting_job(&runs));
        assert!(scheduler.cancel(TeamId::new(1)));
        assert!(!scheduler.cancel(TeamId::new(1)));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_job() {
        let scheduler = TokioDeadlineScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TeamId::new(1), Duration::from_secs(10), counting_job(&first));
        scheduler.schedule(TeamId::new(1), Duration::from_secs(20), counting_job(&second));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
