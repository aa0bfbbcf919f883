use super::GroupReaping;
use crate::library::EmptyResult;
use async_trait::async_trait;
use jatsl::{Job, JobManager};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, trace};

/// Periodic sweep evicting bindings that have been idle for longer than the group timeout
///
/// The reaper does not keep its coordinator alive. Once the coordinator is dropped, the reaper stops.
pub struct Reaper<C> {
    target: Weak<C>,
    period: Duration,
}

impl<C: GroupReaping> Reaper<C> {
    /// Creates a new reaper sweeping the coordinator in the given interval
    pub fn new(target: &Arc<C>, period: Duration) -> Self {
        Self {
            target: Arc::downgrade(target),
            period,
        }
    }

    /// Evicts all currently idle bindings, returning how many have been evicted
    ///
    /// Candidates are collected first and each one is re-validated on eviction, bindings used
    /// in the meantime survive. Returns `None` if the coordinator no longer exists.
    pub fn sweep(&self) -> Option<usize> {
        let target = self.target.upgrade()?;
        let now = Instant::now();

        let evicted = target
            .idle_bindings(now)
            .iter()
            .filter(|binding| target.on_group_timeout(binding.group_id(), binding.route(), now))
            .count();

        if evicted > 0 {
            debug!(evicted, "Evicted idle groups");
        } else {
            trace!("No idle groups");
        }

        Some(evicted)
    }

    /// Sweeps once per period until the termination future resolves or the coordinator is gone
    pub async fn run<F>(&self, termination: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        tokio::pin!(termination);

        loop {
            tokio::select! {
                _ = &mut termination => break,
                _ = interval.tick() => {
                    if self.sweep().is_none() {
                        info!("Coordinator has been dropped, stopping reaper");
                        break;
                    }
                }
            }
        }
    }
}

/// Job running a [`Reaper`] until the scheduler terminates
pub struct ReaperJob<C> {
    reaper: Reaper<C>,
}

impl<C: GroupReaping> ReaperJob<C> {
    /// Creates a new job sweeping the coordinator in the given interval
    pub fn new(target: &Arc<C>, period: Duration) -> Self {
        Self {
            reaper: Reaper::new(target, period),
        }
    }
}

#[async_trait]
impl<C> Job for ReaperJob<C>
where
    C: GroupReaping + 'static,
{
    const NAME: &'static str = module_path!();
    const SUPPORTS_GRACEFUL_TERMINATION: bool = true;

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        manager.ready().await;

        info!(period = ?self.reaper.period, "Reaping idle groups");
        self.reaper.run(manager.termination_signal()).await;

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use crate::coordinator::{GroupingHandler, LocalCoordinator};
    use crate::domain::{GroupingHandlerConfiguration, HandlerType, ProposalOutcome};
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    fn coordinator(group_timeout: Duration, reaper_period: Duration) -> Arc<LocalCoordinator> {
        let configuration = GroupingHandlerConfiguration::with_timing(
            "authority",
            HandlerType::Local,
            None,
            Duration::from_secs(5),
            group_timeout,
            reaper_period,
        )
        .unwrap();

        Arc::new(LocalCoordinator::new(Arc::new(configuration)))
    }

    #[tokio::test]
    async fn sweep_idle_groups_only() {
        tokio::time::pause();

        let coordinator = coordinator(Duration::from_secs(5), Duration::from_secs(1));
        let reaper = Reaper::new(&coordinator, Duration::from_secs(1));

        coordinator.bind("stale", "consumerA");
        sleep(Duration::from_secs(4)).await;
        coordinator.bind("fresh", "consumerA");
        sleep(Duration::from_secs(2)).await;

        assert_eq!(reaper.sweep(), Some(1));
        assert_eq!(coordinator.lookup("stale"), None);
        assert!(coordinator.lookup("fresh").is_some());
        assert_eq!(coordinator.metrics().snapshot().reaped, 1);
    }

    #[tokio::test]
    async fn spare_groups_in_use() {
        tokio::time::pause();

        let coordinator = coordinator(Duration::from_secs(5), Duration::from_secs(1));
        let reaper = Reaper::new(&coordinator, Duration::from_secs(1));

        coordinator.bind("order-42", "consumerA");

        for _ in 0..10 {
            sleep(Duration::from_secs(1)).await;
            coordinator.bind("order-42", "consumerB");
            assert_eq!(reaper.sweep(), Some(0));
        }

        assert_eq!(
            coordinator.bind("order-42", "consumerB"),
            ProposalOutcome::Accepted("consumerA".into())
        );
    }

    #[tokio::test]
    async fn free_groups_after_inactivity() {
        tokio::time::pause();

        let coordinator = coordinator(Duration::from_secs(5), Duration::from_secs(1));
        let reaper = Reaper::new(&coordinator, Duration::from_secs(1));
        let (terminate, termination) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            reaper
                .run(async move {
                    termination.await.ok();
                })
                .await
        });

        assert_eq!(
            coordinator.propose("order-42", "consumerA").await,
            ProposalOutcome::Accepted("consumerA".into())
        );
        assert_eq!(
            coordinator.propose("order-42", "consumerB").await,
            ProposalOutcome::Accepted("consumerA".into())
        );

        sleep(Duration::from_millis(6_500)).await;

        assert_eq!(
            coordinator.propose("order-42", "consumerB").await,
            ProposalOutcome::Accepted("consumerB".into())
        );

        terminate.send(()).ok();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stop_once_coordinator_is_gone() {
        tokio::time::pause();

        let coordinator = coordinator(Duration::from_secs(5), Duration::from_secs(1));
        let reaper = Reaper::new(&coordinator, Duration::from_secs(1));

        drop(coordinator);

        assert_eq!(reaper.sweep(), None);
        reaper.run(futures::future::pending()).await;
    }
}
