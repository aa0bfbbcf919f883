use super::{DeathReason, Heart};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use jatsl::{JobScheduler, State, StatusServer};
use std::any::type_name;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

/// Executable unit of a node
#[async_trait]
pub trait Module {
    /// Executed before the module starts running, e.g. to establish connections
    async fn pre_startup(&mut self) -> EmptyResult {
        Ok(())
    }

    /// Schedules the jobs of the module
    ///
    /// Returning `Some(_)` keeps the module alive until the [`Heart`] dies. Returning `None`
    /// directly enters the shutdown sequence.
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError>;

    /// Executed after all jobs of the module have been terminated
    async fn post_shutdown(&mut self, termination_reason: ModuleTerminationReason) {
        match termination_reason {
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally => {
                info!("Module exited normally")
            }
            reason => error!(?reason, "Module terminated with an error"),
        }
    }
}

/// Reason why a module has terminated
#[derive(Error, Debug)]
pub enum ModuleTerminationReason {
    /// Startup hook returned an error
    #[error("startup routine threw an error")]
    StartupFailed(#[source] BoxedError),
    /// Run hook returned an error
    #[error("error during operation")]
    OperationalError(#[source] BoxedError),
    /// [`Heart`] returned by the module died
    #[error("heart provided by module died: {0}")]
    HeartDied(DeathReason),
    /// Run hook returned without a heart
    #[error("run loop exited cleanly")]
    ExitedNormally,
    /// Startup took too long
    #[error("timeout during startup")]
    Timeout,
}

/// Executes [`Module`] implementations on a [`JobScheduler`]
pub struct ModuleRunner {
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    termination_grace_period: Duration,
    status_server_port: Option<u16>,
}

impl ModuleRunner {
    /// Creates a new runner which additionally exposes the job status on the given port
    pub fn new_with_status_server(status_server_port: u16) -> Self {
        Self {
            status_server_port: Some(status_server_port),
            ..Default::default()
        }
    }
}

impl Default for ModuleRunner {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            termination_grace_period: Duration::from_secs(5),
            status_server_port: None,
        }
    }
}

impl ModuleRunner {
    /// Runs the module through its lifecycle hooks until it terminates
    #[instrument(skip(self, module), fields(module = type_name::<M>()))]
    pub async fn run<M: Module + Send + Sync>(&self, mut module: M) {
        let scheduler = JobScheduler::default();

        let status_state = match self.status_server_port {
            Some(port) => {
                info!(port, "Spawning status server");
                let (status_state, status_server) = StatusServer::new(&scheduler, port);
                scheduler.spawn_job(status_server).await;
                Some(status_state)
            }
            None => None,
        };

        info!("Starting module");
        let termination_reason = match timeout(self.startup_timeout, module.pre_startup()).await {
            Ok(Ok(())) => Self::execute(&mut module, &scheduler).await,
            Ok(Err(error)) => {
                error!(?error, "Module startup failed");
                ModuleTerminationReason::StartupFailed(error)
            }
            Err(_) => {
                error!("Module startup timed out");
                ModuleTerminationReason::Timeout
            }
        };

        if let Some(state) = status_state {
            *state.lock().await = State::Shutdown;
        }

        info!("Terminating remaining jobs");
        scheduler.terminate_jobs(self.termination_grace_period).await;

        info!("Shutting down module");
        if timeout(self.shutdown_timeout, module.post_shutdown(termination_reason))
            .await
            .is_err()
        {
            error!("Module shutdown timed out");
        }
    }

    async fn execute<M: Module + Send + Sync>(
        module: &mut M,
        scheduler: &JobScheduler,
    ) -> ModuleTerminationReason {
        match module.run(scheduler).await {
            Ok(None) => {
                debug!("Module finished without a heart");
                ModuleTerminationReason::ExitedNormally
            }
            Ok(Some(mut heart)) => {
                debug!("Module running until its heart dies");
                let death_reason = heart.death().await;
                info!(%death_reason, "Heart of module died");
                ModuleTerminationReason::HeartDied(death_reason)
            }
            Err(error) => {
                error!(?error, "Module failed while running");
                ModuleTerminationReason::OperationalError(error)
            }
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Events = Arc<Mutex<Vec<&'static str>>>;

    struct RecordingModule {
        events: Events,
        refuse_startup: bool,
        kill_after_run: bool,
    }

    impl RecordingModule {
        fn new(refuse_startup: bool, kill_after_run: bool) -> (Self, Events) {
            let events = Arc::new(Mutex::new(Vec::new()));
            let module = Self {
                events: events.clone(),
                refuse_startup,
                kill_after_run,
            };

            (module, events)
        }

        fn record(&self, event: &'static str) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl Module for RecordingModule {
        async fn pre_startup(&mut self) -> EmptyResult {
            self.record("startup");

            if self.refuse_startup {
                return Err("redis unreachable".into());
            }

            Ok(())
        }

        async fn run(&mut self, _scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
            self.record("run");

            if !self.kill_after_run {
                return Ok(None);
            }

            let (heart, mut stone) = Heart::new();
            tokio::spawn(async move { stone.kill("done".into()).await });

            Ok(Some(heart))
        }

        async fn post_shutdown(&mut self, termination_reason: ModuleTerminationReason) {
            self.record(match termination_reason {
                ModuleTerminationReason::ExitedNormally => "exited",
                ModuleTerminationReason::HeartDied(DeathReason::Killed(_)) => "killed",
                ModuleTerminationReason::StartupFailed(_) => "startup failed",
                _ => "unexpected",
            });
        }
    }

    #[tokio::test]
    async fn run_lifecycle_hooks_in_order() {
        let (module, events) = RecordingModule::new(false, false);

        ModuleRunner::default().run(module).await;

        assert_eq!(*events.lock().unwrap(), vec!["startup", "run", "exited"]);
    }

    #[tokio::test]
    async fn shut_down_once_heart_dies() {
        let (module, events) = RecordingModule::new(false, true);

        ModuleRunner::default().run(module).await;

        assert_eq!(*events.lock().unwrap(), vec!["startup", "run", "killed"]);
    }

    #[tokio::test]
    async fn skip_running_after_failed_startup() {
        let (module, events) = RecordingModule::new(true, false);

        ModuleRunner::default().run(module).await;

        assert_eq!(*events.lock().unwrap(), vec!["startup", "startup failed"]);
    }
}
